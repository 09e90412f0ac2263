//! Failure analysis types
//!
//! Input context for a failed command execution and the immutable analysis
//! value produced from it.

use sca_scene::SceneState;
use serde::{Deserialize, Serialize};

/// Closed taxonomy of execution failure kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// Wrong editor mode or context for the operation
    #[serde(rename = "context_error")]
    Context,
    /// Mesh/geometry operation failure
    #[serde(rename = "geometry_error")]
    Geometry,
    /// Missing material, texture, or shader problem
    #[serde(rename = "material_error")]
    Material,
    /// Missing or unselectable object
    #[serde(rename = "object_error")]
    Object,
    /// Constraint or parenting failure
    #[serde(rename = "constraint_error")]
    Constraint,
    /// Render engine or settings failure
    #[serde(rename = "render_error")]
    Render,
    /// Allocation failure
    #[serde(rename = "memory_error")]
    Memory,
    /// Malformed generated command text
    #[serde(rename = "syntax_error")]
    Syntax,
    /// Generic runtime failure
    #[serde(rename = "runtime_error")]
    Runtime,
    /// Nothing matched
    #[serde(rename = "unknown_error")]
    Unknown,
}

impl FailureKind {
    /// Stable tag used in progress records and summaries
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Context => "context_error",
            Self::Geometry => "geometry_error",
            Self::Material => "material_error",
            Self::Object => "object_error",
            Self::Constraint => "constraint_error",
            Self::Render => "render_error",
            Self::Memory => "memory_error",
            Self::Syntax => "syntax_error",
            Self::Runtime => "runtime_error",
            Self::Unknown => "unknown_error",
        }
    }

    /// Base recovery complexity for this failure kind (1-5)
    #[inline]
    #[must_use]
    pub fn base_complexity(&self) -> u8 {
        match self {
            Self::Syntax => 1,
            Self::Context | Self::Material | Self::Runtime => 2,
            Self::Object | Self::Constraint | Self::Unknown => 3,
            Self::Geometry | Self::Render => 4,
            Self::Memory => 5,
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Refined root cause within a failure kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootCause {
    IncorrectObjectMode,
    InvalidContextForOperation,
    ContextValidationFailure,
    InvalidGeometryIndex,
    MissingVertexGroup,
    GeometryValidationFailure,
    MissingMaterial,
    MaterialAssignmentFailure,
    ObjectDoesNotExist,
    ObjectAccessFailure,
    UnknownRootCause,
}

impl RootCause {
    /// Stable tag used in progress records and summaries
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IncorrectObjectMode => "incorrect_object_mode",
            Self::InvalidContextForOperation => "invalid_context_for_operation",
            Self::ContextValidationFailure => "context_validation_failure",
            Self::InvalidGeometryIndex => "invalid_geometry_index",
            Self::MissingVertexGroup => "missing_vertex_group",
            Self::GeometryValidationFailure => "geometry_validation_failure",
            Self::MissingMaterial => "missing_material",
            Self::MaterialAssignmentFailure => "material_assignment_failure",
            Self::ObjectDoesNotExist => "object_does_not_exist",
            Self::ObjectAccessFailure => "object_access_failure",
            Self::UnknownRootCause => "unknown_root_cause",
        }
    }
}

impl std::fmt::Display for RootCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Context captured for one failed command execution
///
/// Created once per failure and consumed immediately by the analyzer; only
/// the derived analysis is retained in the session record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskContext {
    /// Subtask name
    pub task_name: String,
    /// Planner instruction the commands were generated from
    pub instruction: String,
    /// Generated command text as sent to the tool
    pub command_text: String,
    /// Error message reported by the tool
    pub error_message: String,
    /// Error type tag
    pub error_type: String,
    /// Error trace, if any
    pub stack_trace: String,
    /// Snapshot taken before the execution attempt
    pub scene_before: SceneState,
    /// Snapshot taken after the failure
    pub scene_after: SceneState,
    /// 1-based attempt number for this subtask
    pub attempt_number: u32,
    /// Prior failure descriptions for this subtask
    pub previous_failures: Vec<String>,
}

impl TaskContext {
    /// Build a context for a first-attempt failure
    #[must_use]
    pub fn first_attempt(
        task_name: impl Into<String>,
        instruction: impl Into<String>,
        command_text: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        let error_message = error_message.into();
        Self {
            task_name: task_name.into(),
            instruction: instruction.into(),
            command_text: command_text.into(),
            error_type: "execution_error".to_string(),
            stack_trace: error_message.clone(),
            error_message,
            scene_before: SceneState::empty(),
            scene_after: SceneState::empty(),
            attempt_number: 1,
            previous_failures: Vec::new(),
        }
    }

    /// With before/after snapshots
    #[must_use]
    pub fn with_snapshots(mut self, before: SceneState, after: SceneState) -> Self {
        self.scene_before = before;
        self.scene_after = after;
        self
    }

    /// With attempt number
    #[must_use]
    pub fn with_attempt(mut self, attempt_number: u32) -> Self {
        self.attempt_number = attempt_number;
        self
    }
}

/// How a failure affected the scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneImpact {
    /// Subsystems touched by the failed task
    pub objects_affected: Vec<String>,
    /// intact / partial / at_risk
    pub scene_integrity: String,
    /// minimal / moderate / high
    pub user_requirement_impact: String,
    /// low / medium / high
    pub recovery_difficulty: String,
}

impl Default for SceneImpact {
    fn default() -> Self {
        Self {
            objects_affected: Vec::new(),
            scene_integrity: "intact".to_string(),
            user_requirement_impact: "minimal".to_string(),
            recovery_difficulty: "low".to_string(),
        }
    }
}

/// Immutable analysis of one task failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureAnalysis {
    /// Classified failure kind
    pub failure_kind: FailureKind,
    /// Refined root cause
    pub root_cause: RootCause,
    /// Human-readable description of the specific issue
    pub specific_issue: String,
    /// Scene impact summary
    pub scene_impact: SceneImpact,
    /// Concrete fix suggestion
    pub suggested_fix: String,
    /// Up to three alternative approaches
    pub alternative_approaches: Vec<String>,
    /// Recovery complexity, 1 (trivial) to 5 (hard)
    pub recovery_complexity: u8,
    /// Estimated recovery success probability in [0.3, 0.95]
    pub likely_success_rate: f64,
    /// Strategy to avoid the same failure next time
    pub prevention_strategy: String,
}

/// Aggregated view over a batch of failures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureSummary {
    /// Most frequent failure kind tag, "none" for an empty batch
    pub most_common_kind: String,
    /// Most frequent root cause tag, "none" for an empty batch
    pub most_common_cause: String,
    /// Number of failures in the batch
    pub failure_count: usize,
    /// Distinct failure kind tags observed
    pub patterns: Vec<String>,
    /// Batch-level recommendations
    pub recommendations: Vec<String>,
}
