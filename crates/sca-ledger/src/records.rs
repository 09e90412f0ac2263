//! Session record types
//!
//! Everything the ledger persists: planner output, command generations,
//! evaluations, tool invocations, component progress, sealed iterations, and
//! the session envelope itself. All records carry their creation timestamp and
//! round-trip losslessly through the session file.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use sca_probe::AnalysisReport;
use sca_scene::SceneState;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ulid::Ulid;

/// Unique session identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Ulid);

impl SessionId {
    /// Generate a new session ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One atomic unit of work proposed by the planner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubTask {
    /// Subtask name, used as the progress-tracking component name
    pub name: String,
    /// Instruction handed to the command generator
    pub instruction: String,
}

impl SubTask {
    /// Create a new subtask
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instruction: instruction.into(),
        }
    }
}

/// Planner output for one iteration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRecord {
    /// Proposed subtasks in execution order
    pub sub_tasks: Vec<SubTask>,
    /// Raw planner response text
    pub raw_response: String,
    /// When the plan was recorded
    pub timestamp: DateTime<Utc>,
}

/// One command-generation attempt for a subtask
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandGenRecord {
    /// Subtask name
    pub task_name: String,
    /// Instruction the commands were generated from
    pub instruction: String,
    /// Generated command text
    pub command_text: String,
    /// Raw generator response text
    pub raw_response: String,
    /// When the generation was recorded
    pub timestamp: DateTime<Utc>,
}

/// Evaluator output for one iteration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    /// Requirement match score in [0, 1]
    pub match_score: f64,
    /// Next-priority suggestion text
    pub suggestion: String,
    /// Per-component score breakdown
    pub component_breakdown: IndexMap<String, f64>,
    /// Components the evaluator reported missing
    pub missing_components: Vec<String>,
    /// Probe issues at evaluation time
    pub issues: Vec<String>,
    /// Probe recommendations at evaluation time
    pub recommendations: Vec<String>,
    /// When the evaluation was recorded
    pub timestamp: DateTime<Utc>,
}

/// One external-tool invocation and its outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Tool operation name
    pub tool_name: String,
    /// Payload kind returned ("text" or "image")
    pub payload_kind: String,
    /// Short result summary (text prefix or byte count)
    pub summary: String,
    /// Free-form metadata
    pub metadata: IndexMap<String, Value>,
    /// When the invocation was recorded
    pub timestamp: DateTime<Utc>,
}

/// Tracking status of one scene component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    /// Reported missing by the evaluator
    Missing,
    /// Partially built
    Partial,
    /// Built and verified
    Complete,
    /// Last build attempt failed
    Failed,
}

impl ComponentStatus {
    /// Stable lowercase tag
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Partial => "partial",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress update for one named scene component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentProgress {
    /// Component type (object, light, material, camera, component)
    pub component_type: String,
    /// Component name
    pub component_name: String,
    /// Latest status
    pub status: ComponentStatus,
    /// Free-form detail map (analysis output, error context, metrics)
    pub details: IndexMap<String, Value>,
    /// Iteration in which this update was recorded
    pub iteration: u32,
    /// When the update was recorded
    pub timestamp: DateTime<Utc>,
}

impl ComponentProgress {
    /// Registry key: `"{component_type}:{component_name}"`
    #[must_use]
    pub fn registry_key(&self) -> String {
        format!("{}:{}", self.component_type, self.component_name)
    }
}

/// Everything recorded during one convergence cycle
///
/// Mutated only while open; sealed into the session history at iteration end
/// and never mutated afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationContext {
    /// 1-based iteration index
    pub iteration: u32,
    /// Planner output
    pub plan: Option<PlanRecord>,
    /// One record per subtask generation attempt
    pub command_generations: Vec<CommandGenRecord>,
    /// Evaluator output
    pub evaluation: Option<EvaluationRecord>,
    /// External-tool invocations
    pub tool_invocations: Vec<ToolInvocation>,
    /// Scene snapshot taken at iteration end
    pub scene_snapshot: Option<SceneState>,
    /// Probe analysis of that snapshot
    pub scene_analysis: Option<AnalysisReport>,
    /// Component progress updates in record order
    pub component_progress: Vec<ComponentProgress>,
    /// When the iteration was opened
    pub timestamp: DateTime<Utc>,
}

impl IterationContext {
    /// Open a fresh iteration record
    #[must_use]
    pub fn open(iteration: u32) -> Self {
        Self {
            iteration,
            plan: None,
            command_generations: Vec::new(),
            evaluation: None,
            tool_invocations: Vec::new(),
            scene_snapshot: None,
            scene_analysis: None,
            component_progress: Vec::new(),
            timestamp: Utc::now(),
        }
    }
}

/// Terminal outcome of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalResult {
    /// Whether the acceptance threshold was reached
    pub success: bool,
    /// Number of iterations run
    pub iterations: u32,
    /// Final match score, if an evaluation completed
    pub final_match_score: Option<f64>,
    /// Termination reason for unsuccessful sessions
    pub reason: Option<String>,
    /// Components still missing at termination
    pub final_missing_components: Vec<String>,
    /// Final per-component score breakdown
    pub component_breakdown: IndexMap<String, f64>,
}

/// The unit of persistence: one full convergence session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Session identifier
    pub id: SessionId,
    /// The user's initial scene requirement
    pub initial_requirement: String,
    /// Sealed iteration history in order
    pub iterations: Vec<IterationContext>,
    /// Scene snapshots in observation order
    pub snapshot_history: Vec<SceneState>,
    /// Latest-known status per component, keyed `"{type}:{name}"`
    pub component_registry: IndexMap<String, ComponentProgress>,
    /// Terminal outcome, set once on loop exit
    pub final_result: Option<FinalResult>,
    /// When the session was opened
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Open a new empty session
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: SessionId::new(),
            initial_requirement: String::new(),
            iterations: Vec::new(),
            snapshot_history: Vec::new(),
            component_registry: IndexMap::new(),
            final_result: None,
            created_at: Utc::now(),
        }
    }

    /// Number of registry entries currently marked missing
    #[must_use]
    pub fn missing_count(&self) -> usize {
        self.component_registry
            .values()
            .filter(|p| p.status == ComponentStatus::Missing)
            .count()
    }

    /// Ledger-view rollback to the end of iteration `iteration`
    ///
    /// Truncates the sealed history and snapshot list and rebuilds the
    /// registry by replaying the surviving progress records. The live
    /// tool-side scene is not touched.
    #[must_use]
    pub fn rolled_back_view(&self, iteration: u32) -> Session {
        let mut view = self.clone();
        view.iterations.retain(|it| it.iteration <= iteration);
        view.snapshot_history.truncate(view.iterations.len());
        view.final_result = None;

        view.component_registry = IndexMap::new();
        for it in &view.iterations {
            for progress in &it.component_progress {
                view.component_registry
                    .insert(progress.registry_key(), progress.clone());
            }
        }
        view
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }

    #[test]
    fn registry_key_format() {
        let progress = ComponentProgress {
            component_type: "light".to_string(),
            component_name: "add_rim_light".to_string(),
            status: ComponentStatus::Complete,
            details: IndexMap::new(),
            iteration: 1,
            timestamp: Utc::now(),
        };
        assert_eq!(progress.registry_key(), "light:add_rim_light");
    }

    #[test]
    fn status_tags() {
        assert_eq!(ComponentStatus::Missing.as_str(), "missing");
        assert_eq!(ComponentStatus::Failed.to_string(), "failed");
        let json = serde_json::to_string(&ComponentStatus::Partial).unwrap();
        assert_eq!(json, "\"partial\"");
    }

    #[test]
    fn rolled_back_view_truncates_and_replays() {
        let mut session = Session::new();
        for n in 1..=3u32 {
            let mut it = IterationContext::open(n);
            let progress = ComponentProgress {
                component_type: "object".to_string(),
                component_name: format!("task_{n}"),
                status: ComponentStatus::Complete,
                details: IndexMap::new(),
                iteration: n,
                timestamp: Utc::now(),
            };
            it.component_progress.push(progress.clone());
            session.component_registry.insert(progress.registry_key(), progress);
            session.iterations.push(it);
            session.snapshot_history.push(sca_scene::SceneState::empty());
        }

        let view = session.rolled_back_view(2);
        assert_eq!(view.iterations.len(), 2);
        assert_eq!(view.snapshot_history.len(), 2);
        assert_eq!(view.component_registry.len(), 2);
        assert!(view.component_registry.contains_key("object:task_2"));
        assert!(!view.component_registry.contains_key("object:task_3"));

        // The original session is untouched.
        assert_eq!(session.iterations.len(), 3);
    }
}
