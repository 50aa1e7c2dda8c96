use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};

pub const DEFAULT_SERVER: &str = "http://127.0.0.1:8000";
pub const SERVER_ENV: &str = "ASTRAFIELD_SERVER";
pub const DOWNLOAD_DIR_ENV: &str = "ASTRAFIELD_DOWNLOAD_DIR";

/// Where the panel talks to and where it writes.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelConfig {
    pub server: String,
    pub download_dir: PathBuf,
    pub events_path: Option<PathBuf>,
}

impl PanelConfig {
    /// Flags win over environment, environment over defaults.
    pub fn resolve(
        server: Option<String>,
        download_dir: Option<PathBuf>,
        events_path: Option<PathBuf>,
    ) -> Result<Self> {
        let server = server
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .or_else(|| non_empty_env(SERVER_ENV))
            .unwrap_or_else(|| DEFAULT_SERVER.to_string());
        let download_dir = download_dir
            .or_else(|| non_empty_env(DOWNLOAD_DIR_ENV).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(Self {
            server: normalize_server(&server)?,
            download_dir,
            events_path,
        })
    }
}

fn normalize_server(raw: &str) -> Result<String> {
    let parsed =
        reqwest::Url::parse(raw).with_context(|| format!("invalid server URL '{raw}'"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!("server URL must use http or https, got '{}'", parsed.scheme());
    }
    Ok(raw.trim_end_matches('/').to_string())
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
