//! Client configuration and credential resolution
//!
//! Values are resolved in order: explicit builder value, environment
//! variable, compiled default. The API key has no default, so a client
//! cannot be built without one.

use std::time::Duration;

use reqwest::Url;

use crate::{AxisClient, AxisError};

/// Default Axis API URL
pub const DEFAULT_BASE_URL: &str = "https://api.axis.sh/v1";

/// Environment variable holding the API key
pub const API_KEY_ENV_VAR: &str = "AXIS_API_KEY";

/// Environment variable overriding the API URL
pub const BASE_URL_ENV_VAR: &str = "AXIS_BASE_URL";

/// Per-request timeout unless configured otherwise
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Resolved client configuration
#[derive(Clone)]
pub struct AxisConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for AxisConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AxisConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Pick the API key from `explicit`, then from the variable `var` via `lookup`.
///
/// Empty values count as missing.
pub fn resolve_api_key<F>(
    explicit: Option<&str>,
    var: &str,
    lookup: F,
) -> Result<String, AxisError>
where
    F: Fn(&str) -> Option<String>,
{
    explicit
        .filter(|key| !key.is_empty())
        .map(str::to_owned)
        .or_else(|| lookup(var).filter(|key| !key.is_empty()))
        .ok_or_else(|| AxisError::MissingApiKey {
            var: var.to_string(),
        })
}

/// Pick the API URL from `explicit`, then [`BASE_URL_ENV_VAR`], then the default.
///
/// The result is validated and has no trailing `/`.
pub fn resolve_base_url<F>(explicit: Option<&str>, lookup: F) -> Result<String, AxisError>
where
    F: Fn(&str) -> Option<String>,
{
    let url = explicit
        .filter(|url| !url.is_empty())
        .map(str::to_owned)
        .or_else(|| lookup(BASE_URL_ENV_VAR).filter(|url| !url.is_empty()))
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    let url = url.trim_end_matches('/').to_string();
    Url::parse(&url).map_err(|e| AxisError::InvalidBaseUrl {
        url: url.clone(),
        reason: e.to_string(),
    })?;
    Ok(url)
}

pub(crate) fn env_lookup(var: &str) -> Option<String> {
    std::env::var(var).ok()
}

/// Builder for [`AxisClient`]
#[derive(Debug, Clone)]
pub struct AxisClientBuilder {
    api_key: Option<String>,
    api_key_var: String,
    base_url: Option<String>,
    timeout: Duration,
}

impl Default for AxisClientBuilder {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_var: API_KEY_ENV_VAR.to_string(),
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl AxisClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Read the API key from a different environment variable
    pub fn api_key_var(mut self, var: impl Into<String>) -> Self {
        self.api_key_var = var.into();
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolve the configuration without building a client
    pub fn resolve(&self) -> Result<AxisConfig, AxisError> {
        self.resolve_with(env_lookup)
    }

    fn resolve_with<F>(&self, lookup: F) -> Result<AxisConfig, AxisError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(AxisConfig {
            api_key: resolve_api_key(self.api_key.as_deref(), &self.api_key_var, &lookup)?,
            base_url: resolve_base_url(self.base_url.as_deref(), &lookup)?,
            timeout: self.timeout,
        })
    }

    /// Resolve the configuration and build the client.
    ///
    /// Fails before any request is made when no API key is available.
    pub fn build(self) -> Result<AxisClient, AxisError> {
        AxisClient::from_config(self.resolve()?)
    }
}
