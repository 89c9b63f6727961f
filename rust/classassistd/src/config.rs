//! Process configuration.
//!
//! Backend settings come from the environment at startup and can be replaced
//! at runtime through `backend.configure`. Without a complete backend config
//! the sidecar runs against the local fallback store.

use anyhow::{anyhow, bail};
use std::time::Duration;

pub const ENV_BACKEND_URL: &str = "CLASSASSIST_BACKEND_URL";
pub const ENV_ANON_KEY: &str = "CLASSASSIST_ANON_KEY";
pub const ENV_LOG: &str = "CLASSASSIST_LOG";

pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_LOG_FILTER: &str = "warn";
// HTTP internals are noisy at debug; keep them quiet unless asked explicitly.
const QUIET_DEPENDENCIES: &str = "reqwest=warn,hyper=warn,hyper_util=warn,rustls=warn";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// Project base URL without a trailing slash, e.g. `https://xyz.example.co`.
    pub url: String,
    pub anon_key: String,
}

impl BackendConfig {
    pub fn new(url: &str, anon_key: &str) -> anyhow::Result<Self> {
        let url = url.trim().trim_end_matches('/').to_string();
        let anon_key = anon_key.trim().to_string();
        if url.is_empty() {
            bail!("backend url must not be empty");
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(anyhow!("backend url must start with http:// or https://: {url}"));
        }
        if anon_key.is_empty() {
            bail!("anon key must not be empty");
        }
        Ok(Self { url, anon_key })
    }

    /// `None` when either variable is unset or blank.
    pub fn from_env() -> anyhow::Result<Option<Self>> {
        let url = std::env::var(ENV_BACKEND_URL).unwrap_or_default();
        let key = std::env::var(ENV_ANON_KEY).unwrap_or_default();
        if url.trim().is_empty() || key.trim().is_empty() {
            return Ok(None);
        }
        Self::new(&url, &key).map(Some)
    }

    pub fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.url, table)
    }

    pub fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.url, path.trim_start_matches('/'))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub filter: String,
}

impl LogConfig {
    /// `CLASSASSIST_LOG`, then `RUST_LOG`, then `warn`.
    pub fn from_env() -> Self {
        let base = [ENV_LOG, "RUST_LOG"]
            .iter()
            .filter_map(|k| std::env::var(k).ok())
            .map(|v| v.trim().to_string())
            .find(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
        Self::with_base(&base)
    }

    pub fn with_base(base: &str) -> Self {
        Self {
            filter: format!("{base},{QUIET_DEPENDENCIES}"),
        }
    }
}
