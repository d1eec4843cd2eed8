//! Type definitions for the governance endpoint
//!
//! The mirror endpoint's payload is shaped separately in [`crate::mirror`].

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::AxisError;

/// Action checked when the caller does not name one
pub const DEFAULT_ACTION: &str = "read";

/// Body of `POST /governance/check`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceRequest {
    pub agent_id: String,
    pub file_path: String,
    pub action: String,
}

impl GovernanceRequest {
    /// Request a `read` decision for `agent_id` on `file_path`
    pub fn new(agent_id: impl Into<String>, file_path: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            file_path: file_path.into(),
            action: DEFAULT_ACTION.to_string(),
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = action.into();
        self
    }
}

/// Governance decision returned by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GovernanceDecision {
    /// Missing from the response means denied
    #[serde(default)]
    pub allowed: bool,
}

/// What to do when a governance check cannot be completed.
///
/// Network errors, non-2xx responses and undecodable bodies all count as
/// failures. The server's own "denied" answer is not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log the failure and deny
    #[default]
    FailClosed,
    /// Hand the error to the caller
    Propagate,
}

impl FailurePolicy {
    /// Collapse the outcome of a governance check into an allow/deny answer.
    pub fn apply(
        self,
        request: &GovernanceRequest,
        outcome: Result<GovernanceDecision, AxisError>,
    ) -> Result<bool, AxisError> {
        match (outcome, self) {
            (Ok(decision), _) => Ok(decision.allowed),
            (Err(e), FailurePolicy::FailClosed) => {
                warn!(
                    "Axis governance check failed for agent {} ({} {}), denying: {}",
                    request.agent_id, request.action, request.file_path, e
                );
                Ok(false)
            }
            (Err(e), FailurePolicy::Propagate) => Err(e),
        }
    }
}
