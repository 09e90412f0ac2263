//! Session ledger
//!
//! Append-mostly record of every iteration's inputs, outputs, snapshots, and
//! component progress. The orchestrator is the single writer; store
//! operations called with no open iteration are deliberate no-ops so that
//! out-of-loop calls during setup can never fail.

use crate::error::LedgerError;
use crate::records::{
    CommandGenRecord, ComponentProgress, ComponentStatus, EvaluationRecord, FinalResult,
    IterationContext, PlanRecord, Session, SubTask, ToolInvocation,
};
use chrono::Utc;
use indexmap::IndexMap;
use sca_probe::AnalysisReport;
use sca_scene::SceneState;
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// Append-mostly session ledger
///
/// Owns the [`Session`] being built plus the one open [`IterationContext`].
/// `start_iteration`/`complete_iteration` form a non-reentrant bracket; all
/// `store_*` operations target the open iteration.
#[derive(Debug)]
pub struct SessionLedger {
    session: Session,
    open: Option<IterationContext>,
    checkpoint_dir: PathBuf,
}

impl SessionLedger {
    /// Create a ledger for a fresh session
    #[must_use]
    pub fn new() -> Self {
        Self {
            session: Session::new(),
            open: None,
            checkpoint_dir: PathBuf::from("."),
        }
    }

    /// With checkpoint directory
    #[must_use]
    pub fn with_checkpoint_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.checkpoint_dir = dir.into();
        self
    }

    /// Set the user's initial requirement
    pub fn set_initial_requirement(&mut self, requirement: impl Into<String>) {
        self.session.initial_requirement = requirement.into();
    }

    /// Read access to the session under construction
    #[inline]
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Consume the ledger, returning the session
    #[inline]
    #[must_use]
    pub fn into_session(self) -> Session {
        self.session
    }

    /// Open a fresh iteration record
    pub fn start_iteration(&mut self, iteration: u32) {
        tracing::debug!(iteration, "opening iteration record");
        self.open = Some(IterationContext::open(iteration));
    }

    /// Seal the open iteration into the immutable history
    ///
    /// No-op if no iteration is open.
    pub fn complete_iteration(&mut self) {
        if let Some(context) = self.open.take() {
            tracing::debug!(iteration = context.iteration, "sealing iteration record");
            self.session.iterations.push(context);
        }
    }

    /// Record the planner's output; a second call within the same iteration
    /// overwrites the first
    pub fn store_plan(&mut self, sub_tasks: Vec<SubTask>, raw_response: impl Into<String>) {
        if let Some(open) = self.open.as_mut() {
            open.plan = Some(PlanRecord {
                sub_tasks,
                raw_response: raw_response.into(),
                timestamp: Utc::now(),
            });
        }
    }

    /// Record one command-generation attempt
    pub fn store_command_generation(
        &mut self,
        task_name: impl Into<String>,
        instruction: impl Into<String>,
        command_text: impl Into<String>,
        raw_response: impl Into<String>,
    ) {
        if let Some(open) = self.open.as_mut() {
            open.command_generations.push(CommandGenRecord {
                task_name: task_name.into(),
                instruction: instruction.into(),
                command_text: command_text.into(),
                raw_response: raw_response.into(),
                timestamp: Utc::now(),
            });
        }
    }

    /// Record the evaluator's output; a second call within the same iteration
    /// overwrites the first
    pub fn store_evaluation(&mut self, record: EvaluationRecord) {
        if let Some(open) = self.open.as_mut() {
            open.evaluation = Some(record);
        }
    }

    /// Record one external-tool invocation
    pub fn store_tool_invocation(
        &mut self,
        tool_name: impl Into<String>,
        payload_kind: impl Into<String>,
        summary: impl Into<String>,
        metadata: IndexMap<String, Value>,
    ) {
        if let Some(open) = self.open.as_mut() {
            open.tool_invocations.push(ToolInvocation {
                tool_name: tool_name.into(),
                payload_kind: payload_kind.into(),
                summary: summary.into(),
                metadata,
                timestamp: Utc::now(),
            });
        }
    }

    /// Record the end-of-iteration scene snapshot
    ///
    /// Also appends the snapshot to the session-wide history used for diffing.
    pub fn store_snapshot(&mut self, snapshot: SceneState) {
        if let Some(open) = self.open.as_mut() {
            open.scene_snapshot = Some(snapshot.clone());
            self.session.snapshot_history.push(snapshot);
        }
    }

    /// Record the probe analysis of the latest snapshot
    pub fn store_analysis(&mut self, analysis: AnalysisReport) {
        if let Some(open) = self.open.as_mut() {
            open.scene_analysis = Some(analysis);
        }
    }

    /// Update progress for one named component
    ///
    /// Appends to the open iteration's progress log AND overwrites the
    /// registry entry for `"{type}:{name}"`; the registry reflects the
    /// latest-known state, the iteration log the full history.
    pub fn update_component_progress(
        &mut self,
        component_type: impl Into<String>,
        component_name: impl Into<String>,
        status: ComponentStatus,
        details: IndexMap<String, Value>,
    ) {
        let Some(open) = self.open.as_mut() else {
            return;
        };

        let progress = ComponentProgress {
            component_type: component_type.into(),
            component_name: component_name.into(),
            status,
            details,
            iteration: open.iteration,
            timestamp: Utc::now(),
        };
        self.session
            .component_registry
            .insert(progress.registry_key(), progress.clone());
        open.component_progress.push(progress);
    }

    /// Record the terminal outcome of the session
    pub fn set_final_result(&mut self, result: FinalResult) {
        self.session.final_result = Some(result);
    }

    /// Number of registry entries currently marked missing
    #[must_use]
    pub fn missing_count(&self) -> usize {
        self.session.missing_count()
    }

    /// Deterministic textual digest for the planning step
    ///
    /// Stable given the same ledger contents: the same sequence of calls
    /// always produces byte-identical text, since the planner conditions on
    /// it and non-determinism here causes planner drift.
    #[must_use]
    pub fn context_digest(&self) -> String {
        let mut parts: Vec<String> = Vec::new();

        parts.push(format!(
            "Initial Requirement: {}",
            self.session.initial_requirement
        ));
        parts.push("\n=== CURRENT SCENE STATE ===".to_string());

        if let Some(state) = self.session.snapshot_history.last() {
            parts.push(format!("Objects: {}", state.objects.len()));
            parts.push(format!("Lights: {}", state.lights.len()));
            parts.push(format!("Cameras: {}", state.cameras.len()));
            parts.push(format!("Materials: {}", state.materials.len()));
        }

        parts.push("\n=== COMPONENT PROGRESS ===".to_string());
        for (key, progress) in &self.session.component_registry {
            parts.push(format!("{key}: {}", progress.status));
        }

        parts.push("\n=== PREVIOUS ITERATIONS ===".to_string());
        for iteration in &self.session.iterations {
            parts.push(format!("\nIteration {}:", iteration.iteration));

            if let Some(eval) = &iteration.evaluation {
                parts.push(format!("Evaluation Score: {}", eval.match_score));
                parts.push(format!("Suggestion: {}", eval.suggestion));
            }

            if !iteration.component_progress.is_empty() {
                parts.push("Components updated:".to_string());
                for comp in &iteration.component_progress {
                    parts.push(format!(
                        "  - {}: {} ({})",
                        comp.component_type, comp.component_name, comp.status
                    ));
                }
            }
        }

        parts.join("\n")
    }

    /// Persist the session to a pretty-printed JSON file
    ///
    /// # Errors
    /// Surfaces file and encoding errors to the caller; silent persistence
    /// failure would lose the audit trail.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), LedgerError> {
        let file = File::create(path.as_ref())?;
        serde_json::to_writer_pretty(BufWriter::new(file), &self.session)?;
        tracing::info!(path = %path.as_ref().display(), "session saved");
        Ok(())
    }

    /// Load a previously saved session into a fresh ledger
    ///
    /// # Errors
    /// Surfaces file and decoding errors to the caller.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let file = File::open(path.as_ref())?;
        let session: Session = serde_json::from_reader(BufReader::new(file))?;
        Ok(Self {
            session,
            open: None,
            checkpoint_dir: PathBuf::from("."),
        })
    }

    /// Persist the current session tagged by iteration number and timestamp
    ///
    /// Does not mutate the session; the open iteration (if any) is not
    /// included.
    ///
    /// # Errors
    /// Surfaces file and encoding errors to the caller.
    pub fn create_checkpoint(&self, iteration: u32) -> Result<PathBuf, LedgerError> {
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let path = self
            .checkpoint_dir
            .join(format!("checkpoint_{iteration}_{stamp}.json"));
        self.save_to_file(&path)?;
        Ok(path)
    }
}

impl Default for SessionLedger {
    fn default() -> Self {
        Self::new()
    }
}
