//! Error types for the convergence loop
//!
//! Three layers:
//! - [`AgentError`]: failures at a language-model collaborator boundary
//! - [`ToolError`]: failures at the 3D tool boundary
//! - [`LoopError`]: failures that abort a run
//!
//! Subtask execution errors never appear here: they are routed through the
//! failure analyzer and recorded as component progress instead.

use sca_ledger::LedgerError;

/// Failure reported by an external agent collaborator
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// The collaborator's output violated its contract (missing or malformed
    /// fields)
    #[error("contract violation: {0}")]
    ContractViolation(String),

    /// The underlying provider call failed
    #[error("provider call failed: {0}")]
    Provider(String),

    /// The call did not complete in time
    #[error("call timed out after {duration_secs}s")]
    Timeout {
        /// Elapsed time before giving up
        duration_secs: u64,
    },
}

/// Failure reported by the 3D tool boundary
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// The tool rejected or failed to run the submitted commands
    #[error("command execution failed: {0}")]
    CommandRejected(String),

    /// The tool connection is gone
    #[error("tool connection failed: {0}")]
    ConnectionFailed(String),

    /// The call did not complete in time
    #[error("tool call timed out after {duration_secs}s")]
    Timeout {
        /// Elapsed time before giving up
        duration_secs: u64,
    },

    /// The tool returned a payload kind the caller cannot use
    #[error("unexpected payload: expected {expected}")]
    UnexpectedPayload {
        /// The payload kind that was required
        expected: &'static str,
    },
}

impl ToolError {
    /// Stable tag recorded as the error type in failure analysis
    #[must_use]
    pub fn kind_tag(&self) -> &'static str {
        match self {
            Self::CommandRejected(_) => "command_rejected",
            Self::ConnectionFailed(_) => "connection_failed",
            Self::Timeout { .. } => "timeout",
            Self::UnexpectedPayload { .. } => "unexpected_payload",
        }
    }
}

/// Failure that aborts a convergence run
#[derive(Debug, thiserror::Error)]
pub enum LoopError {
    /// The planner failed or broke its contract
    #[error("planner failed: {0}")]
    Planner(#[source] AgentError),

    /// The evaluator failed or broke its contract
    #[error("evaluator failed: {0}")]
    Evaluator(#[source] AgentError),

    /// Scene observation failed
    #[error("scene observation failed: {0}")]
    Observation(#[from] ToolError),

    /// A collaborator's output was structurally invalid
    #[error("collaborator contract violation: {0}")]
    Contract(String),

    /// Session persistence failed
    #[error("session persistence failed: {0}")]
    Ledger(#[from] LedgerError),
}

impl LoopError {
    /// Whether this failure came from an external collaborator breaking its
    /// contract (as opposed to local persistence)
    #[inline]
    #[must_use]
    pub fn is_contract_breach(&self) -> bool {
        matches!(
            self,
            Self::Planner(_) | Self::Evaluator(_) | Self::Contract(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_error_tags() {
        assert_eq!(
            ToolError::CommandRejected("boom".to_string()).kind_tag(),
            "command_rejected"
        );
        assert_eq!(ToolError::Timeout { duration_secs: 30 }.kind_tag(), "timeout");
    }

    #[test]
    fn loop_error_contract_breach() {
        let planner = LoopError::Planner(AgentError::ContractViolation("no subtasks".to_string()));
        assert!(planner.is_contract_breach());

        let observation = LoopError::Observation(ToolError::ConnectionFailed("gone".to_string()));
        assert!(!observation.is_contract_breach());
    }

    #[test]
    fn error_display() {
        let err = LoopError::Contract("match score 1.5 outside [0, 1]".to_string());
        assert!(err.to_string().contains("1.5"));
    }
}
