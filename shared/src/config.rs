//! Configuration management for the lawn-care backend.

use std::env;
use std::time::Duration;

use crate::{Error, Result};

/// Generation service host used when `TOOLKIT_URL` is unset.
pub const DEFAULT_TOOLKIT_URL: &str = "https://toolkit.rork.com";

/// Default per-call deadline for outbound requests, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the generation and email toolkit
    pub toolkit_url: String,
    /// Base URL of the app's own RPC backend
    pub rpc_base_url: Option<String>,
    /// Bearer token sent to the toolkit
    pub toolkit_api_key: Option<String>,
    /// Static headers added to every toolkit call
    pub extra_headers: Vec<(String, String)>,
    /// Deadline applied to outbound calls
    pub request_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let request_timeout = match non_empty("GENERATION_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.parse().map_err(|_| {
                    Error::Config(format!("GENERATION_TIMEOUT_SECS is not a number: {}", raw))
                })?;
                if secs == 0 {
                    return Err(Error::Config("GENERATION_TIMEOUT_SECS must be positive".to_string()));
                }
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        let extra_headers = match non_empty("TOOLKIT_HEADERS") {
            Some(raw) => parse_headers(&raw)?,
            None => Vec::new(),
        };

        Ok(Self {
            toolkit_url: trim_base(non_empty("TOOLKIT_URL").unwrap_or_else(|| DEFAULT_TOOLKIT_URL.to_string())),
            rpc_base_url: non_empty("RPC_BASE_URL").map(trim_base),
            toolkit_api_key: non_empty("TOOLKIT_API_KEY"),
            extra_headers,
            request_timeout,
        })
    }

    /// The RPC backend URL, which callers of the backend cannot run without.
    pub fn require_rpc_base_url(&self) -> Result<&str> {
        self.rpc_base_url
            .as_deref()
            .ok_or_else(|| Error::Config("RPC_BASE_URL is not set".to_string()))
    }
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

/// Parse `Name: value` pairs separated by commas.
fn parse_headers(raw: &str) -> Result<Vec<(String, String)>> {
    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, value) = pair
                .split_once(':')
                .ok_or_else(|| Error::Config(format!("Malformed header in TOOLKIT_HEADERS: {}", pair)))?;
            Ok((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}
