//! Axis Client - Interface to the Axis Context Protocol API
//!
//! This crate provides a typed HTTP client for two Axis endpoints:
//! - **Context mirror**: a snapshot of the files under a path, shaped into
//!   [`ContextMirror`] and rendered as a compact block for LLM prompts
//! - **Governance check**: whether an agent may perform an action on a file
//!
//! # Architecture
//!
//! ```text
//! Agent runtime  -->  AxisClient  -->  Axis API (https://api.axis.sh/v1)
//!                     (this crate)
//! ```
//!
//! The two endpoints fail differently. [`AxisClient::get_mirror`] returns
//! every failure to the caller. [`AxisClient::check_governance`] applies
//! [`FailurePolicy::FailClosed`] and answers `false` when the server cannot
//! be asked; use [`AxisClient::try_check_governance`] to see the error.
//!
//! ```no_run
//! # async fn run() -> Result<(), axis_client::AxisError> {
//! let axis = axis_client::AxisClient::new(None)?; // reads AXIS_API_KEY
//! let mirror = axis.get_mirror("src").await?;
//! println!("{}", mirror.render_prompt());
//!
//! if axis.check_governance("agent-7", "src/main.rs", "write").await {
//!     // ...
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod mirror;
mod types;

pub use config::{
    AxisClientBuilder, AxisConfig, API_KEY_ENV_VAR, BASE_URL_ENV_VAR, DEFAULT_BASE_URL,
};
pub use mirror::{ContextMirror, MirrorNode, PROMPT_HEADER};
pub use types::*;

use reqwest::header::{HeaderValue, CONTENT_TYPE};
use tracing::debug;

/// Path requested by [`AxisClient::get_default_mirror`]
pub const DEFAULT_MIRROR_PATH: &str = ".";

const USER_AGENT: &str = concat!("axis-client/", env!("CARGO_PKG_VERSION"));

/// Error types for Axis Client operations
#[derive(Debug, thiserror::Error)]
pub enum AxisError {
    #[error("Axis API key is required. Pass it to the client or set the {var} environment variable")]
    MissingApiKey { var: String },

    #[error("Invalid Axis base URL {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Axis API not reachable at {url}: {source}")]
    NotReachable {
        url: String,
        source: reqwest::Error,
    },

    #[error("Axis API returned error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to decode Axis response: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("Malformed context mirror: {0}")]
    MalformedMirror(String),
}

impl AxisError {
    /// Configuration errors are raised while building the client
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            AxisError::MissingApiKey { .. }
                | AxisError::InvalidBaseUrl { .. }
                | AxisError::ClientBuild(_)
        )
    }
}

/// Client for the Axis Context Protocol API
#[derive(Debug, Clone)]
pub struct AxisClient {
    config: AxisConfig,
    client: reqwest::Client,
}

impl AxisClient {
    /// Create a client against the default URL.
    ///
    /// `api_key` takes precedence over the `AXIS_API_KEY` environment
    /// variable. Fails with [`AxisError::MissingApiKey`] when neither is set.
    pub fn new(api_key: Option<&str>) -> Result<Self, AxisError> {
        let mut builder = AxisClientBuilder::new();
        if let Some(key) = api_key {
            builder = builder.api_key(key);
        }
        builder.build()
    }

    pub fn builder() -> AxisClientBuilder {
        AxisClientBuilder::new()
    }

    /// Create a client from an already resolved configuration.
    ///
    /// The key must be non-empty and `base_url` a valid absolute URL.
    pub fn from_config(config: AxisConfig) -> Result<Self, AxisError> {
        if config.api_key.is_empty() {
            return Err(AxisError::MissingApiKey {
                var: API_KEY_ENV_VAR.to_string(),
            });
        }
        let base_url =
            crate::config::resolve_base_url(Some(config.base_url.as_str()), |_| None)?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(AxisError::ClientBuild)?;

        Ok(Self {
            config: AxisConfig { base_url, ..config },
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .bearer_auth(&self.config.api_key)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, AxisError> {
        let resp = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| AxisError::NotReachable {
                url: self.config.base_url.clone(),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(AxisError::Api { status, body });
        }

        Ok(resp)
    }

    // ============= Context Mirror =============

    /// Retrieve the context mirror for `path`.
    ///
    /// Transport failures, non-2xx responses and malformed payloads are all
    /// returned as errors.
    pub async fn get_mirror(&self, path: &str) -> Result<ContextMirror, AxisError> {
        let resp = self
            .send(
                self.client
                    .get(self.endpoint("/context/mirror"))
                    .query(&[("path", path)]),
            )
            .await?;

        let payload: serde_json::Value = resp.json().await.map_err(AxisError::Decode)?;
        let mirror = ContextMirror::shape(payload)?;
        debug!("Got context mirror for {} ({} nodes)", path, mirror.len());
        Ok(mirror)
    }

    /// Retrieve the context mirror for the project root
    pub async fn get_default_mirror(&self) -> Result<ContextMirror, AxisError> {
        self.get_mirror(DEFAULT_MIRROR_PATH).await
    }

    // ============= Governance =============

    /// Ask whether an agent may perform an action, returning any failure
    pub async fn try_check_governance(
        &self,
        request: &GovernanceRequest,
    ) -> Result<GovernanceDecision, AxisError> {
        let resp = self
            .send(self.client.post(self.endpoint("/governance/check")).json(request))
            .await?;

        let decision: GovernanceDecision = resp.json().await.map_err(AxisError::Decode)?;
        debug!(
            "Governance decision for agent {} ({} {}): allowed={}",
            request.agent_id, request.action, request.file_path, decision.allowed
        );
        Ok(decision)
    }

    /// Ask whether an agent may perform an action, handling failures per `policy`
    pub async fn check_governance_with_policy(
        &self,
        request: &GovernanceRequest,
        policy: FailurePolicy,
    ) -> Result<bool, AxisError> {
        let outcome = self.try_check_governance(request).await;
        policy.apply(request, outcome)
    }

    /// Ask whether `agent_id` may perform `action` on `file_path`.
    ///
    /// Fails closed: if the check cannot be completed the failure is logged
    /// and the answer is `false`, so "denied" and "request failed" look the
    /// same to the caller.
    pub async fn check_governance(&self, agent_id: &str, file_path: &str, action: &str) -> bool {
        let request = GovernanceRequest::new(agent_id, file_path).with_action(action);
        self.check_governance_with_policy(&request, FailurePolicy::FailClosed)
            .await
            .unwrap_or(false)
    }
}
