//! Client configuration and path resolution.
//!
//! The base API URL resolves with precedence env > explicit > default, so a
//! deployment can repoint the client without touching calling code.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::HeaderMap;

/// Default backend origin for local development.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";

/// Environment variable overriding the base API URL.
pub const BASE_URL_ENV: &str = "KBX_API_URL";

/// Timeout applied to every request. Fixed, not configurable per call site.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Runtime config for the API client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Target origin, without a trailing slash.
    pub base_url: String,
    /// Abort requests after this duration.
    pub timeout: Duration,
    /// Headers applied to every request unless overridden per call.
    pub default_headers: HeaderMap,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: REQUEST_TIMEOUT,
            default_headers: HeaderMap::new(),
        }
    }
}

impl ClientConfig {
    /// Creates a config pointing at the given origin, keeping the default
    /// timeout.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_url(base_url.into()),
            ..Self::default()
        }
    }

    /// Resolves the base URL with precedence: env > explicit > default.
    ///
    /// # Errors
    /// Returns an error if the resolved URL is not well-formed.
    pub fn resolve(explicit: Option<&str>) -> Result<Self> {
        let base_url = resolve_base_url(explicit)?;
        Ok(Self {
            base_url,
            ..Self::default()
        })
    }
}

/// Resolves the API base URL: `KBX_API_URL` env var, then the explicit
/// value, then the local development default.
fn resolve_base_url(explicit: Option<&str>) -> Result<String> {
    if let Ok(env_url) = std::env::var(BASE_URL_ENV) {
        let trimmed = env_url.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed)?;
            return Ok(normalize_url(trimmed.to_string()));
        }
    }

    if let Some(explicit_url) = explicit {
        let trimmed = explicit_url.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed)?;
            return Ok(normalize_url(trimmed.to_string()));
        }
    }

    Ok(DEFAULT_BASE_URL.to_string())
}

/// Validates that a URL is well-formed.
fn validate_url(url: &str) -> Result<()> {
    url::Url::parse(url).with_context(|| format!("Invalid API base URL: {url}"))?;
    Ok(())
}

fn normalize_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

pub mod paths {
    //! Path resolution for the client's persisted state.
    //!
    //! KBX_HOME resolution order:
    //! 1. KBX_HOME environment variable (if set)
    //! 2. ~/.config/kbx (default)

    use std::path::PathBuf;

    /// Returns the kbx home directory.
    pub fn kbx_home() -> PathBuf {
        if let Ok(home) = std::env::var("KBX_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .map(|h| h.join(".config").join("kbx"))
            .expect("Could not determine home directory")
    }

    /// Returns the path to the persisted session file.
    pub fn session_path() -> PathBuf {
        kbx_home().join("session.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test: explicit URLs are validated and trailing slashes dropped.
    #[test]
    fn test_with_base_url_normalizes() {
        let config = ClientConfig::with_base_url("http://127.0.0.1:9999/api/");
        assert_eq!(config.base_url, "http://127.0.0.1:9999/api");
        assert_eq!(config.timeout, REQUEST_TIMEOUT);
    }

    /// Test: absent env and explicit values fall back to the default.
    #[test]
    fn test_resolve_default() {
        let config = ClientConfig::resolve(None).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    /// Test: malformed explicit URLs are rejected.
    #[test]
    fn test_resolve_rejects_invalid_url() {
        let result = ClientConfig::resolve(Some("not a url"));
        assert!(result.is_err());
    }
}
