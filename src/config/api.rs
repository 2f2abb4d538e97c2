// src/config/api.rs
use anyhow::{anyhow, bail, Context, Result};
use std::env;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://vitibrasil.cnpuv.embrapa.br/index.php";
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 15;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

pub const ENV_JWT_SECRET: &str = "API_JWT_SECRET";
pub const ENV_BASE_URL: &str = "EMBRAPA_BASE_URL";
pub const ENV_TOKEN_TTL_MINUTES: &str = "API_TOKEN_TTL_MINUTES";
pub const ENV_FETCH_TIMEOUT_SECS: &str = "FETCH_TIMEOUT_SECS";
pub const ENV_USERS: &str = "API_USERS";

/// Runtime configuration for the HTTP API, resolved once at startup.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// HS256 signing secret. Never logged.
    pub jwt_secret: String,
    /// Scraping endpoint; datasets append `?opcao=opt_NN`.
    pub base_url: String,
    pub token_ttl: chrono::Duration,
    pub fetch_timeout: Duration,
    /// `(username, password)` pairs. Empty means any username gets a token.
    pub users: Vec<(String, String)>,
}

impl ApiConfig {
    /// Config with defaults for everything except the secret.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: secret.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            token_ttl: chrono::Duration::minutes(DEFAULT_TOKEN_TTL_MINUTES),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            users: Vec::new(),
        }
    }

    /// Read config from the process environment (call `dotenvy::dotenv()` first
    /// if a `.env` file should be honoured).
    pub fn from_env() -> Result<Self> {
        let secret = env::var(ENV_JWT_SECRET)
            .map_err(|_| anyhow!("Missing {ENV_JWT_SECRET} env var"))?;
        if secret.trim().is_empty() {
            bail!("{ENV_JWT_SECRET} must not be empty");
        }
        let mut cfg = Self::with_secret(secret);

        if let Ok(url) = env::var(ENV_BASE_URL) {
            let url = url.trim();
            if !url.is_empty() {
                cfg.base_url = url.to_string();
            }
        }

        if let Some(minutes) = parse_positive_env(ENV_TOKEN_TTL_MINUTES)? {
            cfg.token_ttl = chrono::Duration::minutes(minutes as i64);
        }
        if let Some(secs) = parse_positive_env(ENV_FETCH_TIMEOUT_SECS)? {
            cfg.fetch_timeout = Duration::from_secs(secs);
        }

        if let Ok(raw) = env::var(ENV_USERS) {
            cfg.users = parse_users(&raw)?;
        }

        Ok(cfg)
    }
}

fn parse_positive_env(name: &str) -> Result<Option<u64>> {
    match env::var(name) {
        Ok(raw) => {
            let v: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{name} must be a positive integer, got '{raw}'"))?;
            if v == 0 {
                bail!("{name} must be greater than zero");
            }
            Ok(Some(v))
        }
        Err(_) => Ok(None),
    }
}

/// Parse `alice:secret,bob:hunter2`. Blank entries are skipped.
pub fn parse_users(raw: &str) -> Result<Vec<(String, String)>> {
    let mut out = Vec::new();
    for entry in raw.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let (name, password) = entry
            .split_once(':')
            .ok_or_else(|| anyhow!("{ENV_USERS} entry '{entry}' is not name:password"))?;
        let name = name.trim();
        if name.is_empty() {
            bail!("{ENV_USERS} entry has an empty username");
        }
        out.push((name.to_string(), password.to_string()));
    }
    Ok(out)
}
