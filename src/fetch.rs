// src/fetch.rs
//! Page fetcher: one GET, HTML parse, visible-text extraction, whitespace folding.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use encoding_rs::{Encoding, UTF_8};
use metrics::histogram;
use once_cell::sync::OnceCell;
use regex::Regex;
use scraper::{Html, Node};

/// Elements whose text content is never rendered.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// How far into the body a `<meta>` charset declaration is looked for.
const META_SNIFF_BYTES: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("upstream request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    #[error("upstream unavailable: {0}")]
    Unavailable(#[source] reqwest::Error),

    #[error("upstream returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("could not decode upstream body: {0}")]
    Decode(#[source] reqwest::Error),
}

impl FetchError {
    /// Short machine label, used for logs and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Timeout(_) => "timeout",
            FetchError::Unavailable(_) => "unavailable",
            FetchError::Status { .. } => "status",
            FetchError::Decode(_) => "decode",
        }
    }
}

/// Anything that can turn a URL into cleaned page text.
#[async_trait]
pub trait TextFetcher: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError>;
}

/// `TextFetcher` backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("embrapa-data-api/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TextFetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let t0 = Instant::now();

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(classify_send_error)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let bytes = resp.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(e)
            } else {
                FetchError::Decode(e)
            }
        })?;
        let body = decode_body(&bytes, content_type.as_deref());
        let text = extract_visible_text(&body);

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("scrape_fetch_ms").record(ms);
        tracing::debug!(%url, bytes = bytes.len(), chars = text.len(), ms, "page fetched");

        Ok(text)
    }
}

fn classify_send_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout(e)
    } else {
        FetchError::Unavailable(e)
    }
}

/// Decode a page body to text.
///
/// The charset comes from the `Content-Type` header, then from a `<meta>`
/// declaration near the top of the document, then defaults to UTF-8. A byte
/// order mark overrides all of them. Malformed sequences become U+FFFD.
pub fn decode_body(bytes: &[u8], content_type: Option<&str>) -> String {
    let encoding = content_type
        .and_then(header_charset)
        .or_else(|| meta_charset(bytes))
        .unwrap_or(UTF_8);
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

fn header_charset(content_type: &str) -> Option<&'static Encoding> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        Encoding::for_label(value.trim().trim_matches('"').as_bytes())
    })
}

/// Covers both `<meta charset="x">` and
/// `<meta http-equiv="Content-Type" content="text/html; charset=x">`.
fn meta_charset(bytes: &[u8]) -> Option<&'static Encoding> {
    static RE_META: OnceCell<regex::bytes::Regex> = OnceCell::new();
    let re = RE_META.get_or_init(|| {
        regex::bytes::Regex::new(r#"(?i-u)<meta[^>]*?charset\s*=\s*["']?\s*([a-z0-9_.:\-]+)"#)
            .expect("meta charset regex")
    });
    let head = &bytes[..bytes.len().min(META_SNIFF_BYTES)];
    let caps = re.captures(head)?;
    Encoding::for_label(&caps[1])
}

/// Parse `html` and return its visible text with every whitespace run folded
/// to a single space and no leading/trailing whitespace.
///
/// Text nodes are concatenated in document order without separators, so
/// adjacent inline elements join (`<b>a</b><i>b</i>` → `ab`).
pub fn extract_visible_text(html: &str) -> String {
    let doc = Html::parse_document(html);

    let mut raw = String::with_capacity(html.len() / 2);
    for node in doc.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|el| HIDDEN_ELEMENTS.contains(&el.name()))
        });
        if !hidden {
            raw.push_str(text);
        }
    }

    collapse_whitespace(&raw)
}

/// Replace every run of Unicode whitespace with one space, then trim.
pub fn collapse_whitespace(s: &str) -> String {
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"));
    re_ws.replace_all(s, " ").trim().to_string()
}
