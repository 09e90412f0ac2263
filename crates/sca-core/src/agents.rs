//! External collaborator boundaries
//!
//! The loop treats the planner, command generator, scene tool, and evaluator
//! as black boxes behind these traits. Instruction and command text is opaque
//! to the core: it flows from the planner through the generator to the tool
//! unmodified and uninterpreted.

use crate::error::{AgentError, ToolError};
use async_trait::async_trait;
use indexmap::IndexMap;
use sca_ledger::SubTask;
use serde::{Deserialize, Serialize};

/// A result payload from the 3D tool
///
/// Tool results arrive as either text or image data; the sum type forces
/// downstream consumers to handle both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolPayload {
    /// Textual payload (scene descriptions, command output)
    Text(String),
    /// Binary image payload (viewport screenshots)
    Image(Vec<u8>),
}

impl ToolPayload {
    /// Payload kind tag for ledger records
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Image(_) => "image",
        }
    }

    /// Text content, if textual
    #[inline]
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Image(_) => None,
        }
    }

    /// Image bytes, if an image
    #[inline]
    #[must_use]
    pub fn as_image(&self) -> Option<&[u8]> {
        match self {
            Self::Text(_) => None,
            Self::Image(bytes) => Some(bytes),
        }
    }

    /// Short human-readable summary for ledger records
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::Text(text) => {
                let mut summary: String = text.chars().take(80).collect();
                if text.chars().count() > 80 {
                    summary.push_str("...");
                }
                summary
            }
            Self::Image(bytes) => format!("{} bytes", bytes.len()),
        }
    }
}

/// Input for one planning call
#[derive(Debug, Clone, Copy)]
pub struct PlanRequest<'a> {
    /// Current scene requirement text
    pub requirement: &'a str,
    /// Latest raw scene description
    pub scene_info: &'a str,
    /// Latest viewport screenshot
    pub screenshot: &'a ToolPayload,
    /// Ledger digest of the session so far
    pub context_digest: &'a str,
}

/// Planner output: an ordered batch of subtasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanResponse {
    /// Subtasks in execution order
    pub sub_tasks: Vec<SubTask>,
    /// Raw planner response text
    pub raw_response: String,
}

/// Generator output for one instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedCommands {
    /// Sanitized command text, passed to the tool unmodified
    pub command_text: String,
    /// Raw generator response text
    pub raw_response: String,
}

/// Input for one evaluation call
#[derive(Debug, Clone, Copy)]
pub struct EvaluationRequest<'a> {
    /// The requirement being scored against
    pub requirement: &'a str,
    /// Latest raw scene description
    pub scene_info: &'a str,
    /// Latest viewport screenshot
    pub screenshot: &'a ToolPayload,
}

/// Evaluator output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Requirement match score in [0, 1]
    pub match_score: f64,
    /// Per-component score breakdown
    pub component_breakdown: IndexMap<String, f64>,
    /// Components still missing from the scene
    pub missing_components: Vec<String>,
    /// Requirement text proposed for the next cycle
    pub next_priority: String,
    /// Raw evaluator response text
    pub raw_response: String,
}

/// Decomposes a requirement into incremental subtasks
#[async_trait]
pub trait ScenePlanner: Send + Sync {
    /// Propose subtasks for the current requirement
    ///
    /// # Errors
    /// An error here is a collaborator contract breach and aborts the run.
    async fn plan(&self, request: PlanRequest<'_>) -> Result<PlanResponse, AgentError>;
}

/// Turns one instruction into executable tool commands
#[async_trait]
pub trait CommandGenerator: Send + Sync {
    /// Generate command text for an instruction
    ///
    /// # Errors
    /// An error here fails the owning subtask; the iteration continues.
    async fn generate(&self, instruction: &str) -> Result<GeneratedCommands, AgentError>;
}

/// Scores the scene against the requirement and proposes the next one
#[async_trait]
pub trait SceneEvaluator: Send + Sync {
    /// Evaluate the current scene
    ///
    /// # Errors
    /// An error here is a collaborator contract breach and aborts the run.
    async fn evaluate(&self, request: EvaluationRequest<'_>) -> Result<Evaluation, AgentError>;
}

/// The 3D tool boundary: one exclusively-owned mutable connection
///
/// The connection object is passed to the loop at construction; the loop is
/// its single caller for the duration of a run.
#[async_trait]
pub trait SceneTool: Send {
    /// Fetch the current scene description
    async fn scene_info(&mut self) -> Result<ToolPayload, ToolError>;

    /// Fetch a viewport screenshot
    async fn viewport_screenshot(&mut self) -> Result<ToolPayload, ToolError>;

    /// Execute command text against the scene
    ///
    /// # Errors
    /// Any rejection or timeout is that command's failure; the loop routes it
    /// through failure analysis rather than aborting.
    async fn execute_commands(&mut self, command_text: &str) -> Result<(), ToolError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_kind_tags() {
        assert_eq!(ToolPayload::Text(String::new()).kind(), "text");
        assert_eq!(ToolPayload::Image(vec![0]).kind(), "image");
    }

    #[test]
    fn payload_accessors_are_exclusive() {
        let text = ToolPayload::Text("scene".to_string());
        assert_eq!(text.as_text(), Some("scene"));
        assert!(text.as_image().is_none());

        let image = ToolPayload::Image(vec![1, 2, 3]);
        assert!(image.as_text().is_none());
        assert_eq!(image.as_image(), Some(&[1u8, 2, 3][..]));
    }

    #[test]
    fn payload_summary_truncates() {
        let long = "x".repeat(200);
        let summary = ToolPayload::Text(long).summary();
        assert_eq!(summary.len(), 83);
        assert!(summary.ends_with("..."));

        assert_eq!(ToolPayload::Image(vec![0; 16]).summary(), "16 bytes");
    }
}
