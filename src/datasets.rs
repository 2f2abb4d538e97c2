// src/datasets.rs
//! The seven Vitibrasil pages served by the API, each one fixed `opcao` value
//! on the shared base endpoint.

use std::fmt;
use std::sync::Arc;

use metrics::counter;

use crate::fetch::{FetchError, TextFetcher};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataset {
    Production,
    Apresentacao,
    Processing,
    Commercialization,
    Importation,
    Exportation,
    Publication,
}

impl Dataset {
    /// Route order of the public API.
    pub const ALL: [Dataset; 7] = [
        Dataset::Production,
        Dataset::Apresentacao,
        Dataset::Processing,
        Dataset::Commercialization,
        Dataset::Importation,
        Dataset::Exportation,
        Dataset::Publication,
    ];

    /// Path segment under `/data/`.
    pub fn slug(self) -> &'static str {
        match self {
            Dataset::Production => "production",
            Dataset::Apresentacao => "apresentacao",
            Dataset::Processing => "processing",
            Dataset::Commercialization => "commercialization",
            Dataset::Importation => "importation",
            Dataset::Exportation => "exportation",
            Dataset::Publication => "publication",
        }
    }

    /// Upstream `opcao` query value.
    pub fn option(self) -> &'static str {
        match self {
            Dataset::Apresentacao => "opt_01",
            Dataset::Production => "opt_02",
            Dataset::Processing => "opt_03",
            Dataset::Commercialization => "opt_04",
            Dataset::Importation => "opt_05",
            Dataset::Exportation => "opt_06",
            Dataset::Publication => "opt_07",
        }
    }

    pub fn from_slug(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.slug() == s)
    }

    pub fn url(self, base_url: &str) -> String {
        format!("{}?opcao={}", base_url, self.option())
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Binds a `TextFetcher` to the configured base URL.
#[derive(Clone)]
pub struct DatasetClient {
    fetcher: Arc<dyn TextFetcher>,
    base_url: String,
}

impl DatasetClient {
    pub fn new(fetcher: Arc<dyn TextFetcher>, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
        }
    }

    /// Fetch one dataset page as cleaned text. Never cached.
    pub async fn fetch(&self, dataset: Dataset) -> Result<String, FetchError> {
        let url = dataset.url(&self.base_url);
        counter!("scrape_requests_total", "dataset" => dataset.slug()).increment(1);

        match self.fetcher.fetch_text(&url).await {
            Ok(text) => Ok(text),
            Err(e) => {
                tracing::warn!(error = %e, kind = e.kind(), %dataset, %url, "dataset fetch failed");
                counter!(
                    "scrape_errors_total",
                    "dataset" => dataset.slug(),
                    "kind" => e.kind()
                )
                .increment(1);
                Err(e)
            }
        }
    }

    pub async fn production(&self) -> Result<String, FetchError> {
        self.fetch(Dataset::Production).await
    }

    pub async fn apresentacao(&self) -> Result<String, FetchError> {
        self.fetch(Dataset::Apresentacao).await
    }

    pub async fn processing(&self) -> Result<String, FetchError> {
        self.fetch(Dataset::Processing).await
    }

    pub async fn commercialization(&self) -> Result<String, FetchError> {
        self.fetch(Dataset::Commercialization).await
    }

    pub async fn importation(&self) -> Result<String, FetchError> {
        self.fetch(Dataset::Importation).await
    }

    pub async fn exportation(&self) -> Result<String, FetchError> {
        self.fetch(Dataset::Exportation).await
    }

    pub async fn publication(&self) -> Result<String, FetchError> {
        self.fetch(Dataset::Publication).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records requested URLs and echoes them back.
    #[derive(Default)]
    struct EchoFetcher {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl TextFetcher for EchoFetcher {
        async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
            self.seen.lock().unwrap().push(url.to_string());
            Ok(format!("page {url}"))
        }
    }

    #[test]
    fn options_match_upstream_menu() {
        let base = "http://vitibrasil.cnpuv.embrapa.br/index.php";
        assert_eq!(
            Dataset::Apresentacao.url(base),
            "http://vitibrasil.cnpuv.embrapa.br/index.php?opcao=opt_01"
        );
        assert_eq!(Dataset::Production.option(), "opt_02");
        assert_eq!(Dataset::Publication.option(), "opt_07");
    }

    #[test]
    fn slugs_round_trip_and_options_are_distinct() {
        let mut opts = std::collections::HashSet::new();
        for d in Dataset::ALL {
            assert_eq!(Dataset::from_slug(d.slug()), Some(d));
            assert!(opts.insert(d.option()));
        }
        assert_eq!(Dataset::from_slug("wine"), None);
    }

    #[tokio::test]
    async fn named_operations_hit_their_own_url() {
        let fetcher = Arc::new(EchoFetcher::default());
        let client = DatasetClient::new(fetcher.clone(), "http://x/index.php");

        assert_eq!(
            client.production().await.unwrap(),
            "page http://x/index.php?opcao=opt_02"
        );
        client.apresentacao().await.unwrap();
        client.processing().await.unwrap();
        client.commercialization().await.unwrap();
        client.importation().await.unwrap();
        client.exportation().await.unwrap();
        client.publication().await.unwrap();

        let seen = fetcher.seen.lock().unwrap().clone();
        let opts: Vec<&str> = seen
            .iter()
            .map(|u| u.rsplit('=').next().unwrap())
            .collect();
        assert_eq!(
            opts,
            vec!["opt_02", "opt_01", "opt_03", "opt_04", "opt_05", "opt_06", "opt_07"]
        );
    }
}
