use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use url::Url;

#[derive(Clone, Debug)]
pub struct Config {
    pub api_base_url: Url,
    pub session_file: PathBuf,
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let raw_url =
            lookup("API_BASE_URL").unwrap_or_else(|| "http://localhost:8000/api".to_string());
        let api_base_url = Url::parse(&raw_url)
            .with_context(|| format!("API_BASE_URL is not a valid URL: {raw_url}"))?;
        let session_file = lookup("DCMS_SESSION_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".dcms-session.json"));
        let request_timeout_secs = lookup("REQUEST_TIMEOUT_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(30);

        Ok(Self {
            api_base_url,
            session_file,
            request_timeout: Duration::from_secs(request_timeout_secs),
        })
    }
}
