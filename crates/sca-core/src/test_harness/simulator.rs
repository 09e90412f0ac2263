//! Convergence loop simulator
//!
//! Runs the real orchestrator against scripted collaborators:
//! - [`ScriptedPlanner`] replays pre-chunked subtask batches
//! - [`NameCommandGenerator`] turns instructions into `add <name>` commands
//! - [`ModelSceneTool`] keeps an in-memory scene and renders it as text
//! - [`ComponentCoverageEvaluator`] scores by component coverage
//!
//! Everything is deterministic, so simulator runs are reproducible and the
//! loop's termination behavior can be certified end to end.

use crate::agents::{
    CommandGenerator, Evaluation, EvaluationRequest, GeneratedCommands, PlanRequest, PlanResponse,
    SceneEvaluator, ScenePlanner, SceneTool, ToolPayload,
};
use crate::config::LoopConfig;
use crate::convergence::ConvergenceLoop;
use crate::error::{AgentError, LoopError, ToolError};
use async_trait::async_trait;
use indexmap::IndexMap;
use sca_ledger::{Session, SubTask};
use std::sync::Mutex;

/// Simulator configuration
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Scene requirement fed to the loop
    pub requirement: String,
    /// Component names the scene must contain to fully match
    pub components: Vec<String>,
    /// Subtasks proposed per planning call
    pub subtasks_per_cycle: usize,
    /// 1-based execution index that fails once, if any
    pub fail_on_command: Option<usize>,
    /// Error message reported for the injected failure
    pub failure_message: String,
    /// Iteration budget
    pub max_iterations: u32,
    /// Acceptance threshold
    pub acceptance_threshold: f64,
    /// Session file path
    pub session_file: std::path::PathBuf,
    /// Checkpoint directory
    pub checkpoint_dir: std::path::PathBuf,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            requirement: "a cozy reading corner with warm lighting".to_string(),
            components: vec![
                "armchair".to_string(),
                "reading_lamp".to_string(),
                "bookshelf".to_string(),
            ],
            subtasks_per_cycle: 2,
            fail_on_command: None,
            failure_message: "poll() failed".to_string(),
            max_iterations: 5,
            acceptance_threshold: 0.9,
            session_file: std::path::PathBuf::from("simulated_session.json"),
            checkpoint_dir: std::path::PathBuf::from("."),
        }
    }
}

/// Report from one simulator run
#[derive(Debug)]
pub struct SimulatorReport {
    /// Configuration used
    pub config: SimulatorConfig,
    /// Fully recorded session
    pub session: Session,
}

impl SimulatorReport {
    /// Whether the run converged
    #[must_use]
    pub fn converged(&self) -> bool {
        self.session
            .final_result
            .as_ref()
            .is_some_and(|r| r.success)
    }

    /// Generate a text report
    #[must_use]
    pub fn generate_text(&self) -> String {
        let mut report = String::new();

        report.push_str("=== Convergence Simulator Report ===\n\n");
        report.push_str(&format!("Requirement: {}\n", self.config.requirement));
        report.push_str(&format!(
            "Components: {}\n",
            self.config.components.join(", ")
        ));
        report.push_str(&format!(
            "Iterations Run: {}\n",
            self.session.iterations.len()
        ));

        if let Some(result) = &self.session.final_result {
            report.push_str(&format!("Converged: {}\n", result.success));
            if let Some(score) = result.final_match_score {
                report.push_str(&format!("Final Score: {score:.2}\n"));
            }
            if !result.final_missing_components.is_empty() {
                report.push_str(&format!(
                    "Still Missing: {}\n",
                    result.final_missing_components.join(", ")
                ));
            }
            if let Some(reason) = &result.reason {
                report.push_str(&format!("Reason: {reason}\n"));
            }
        }

        report.push_str("\nComponent Registry:\n");
        for (key, progress) in &self.session.component_registry {
            report.push_str(&format!("  {key}: {}\n", progress.status));
        }

        report
    }
}

/// Planner replaying pre-chunked subtask batches
///
/// Call `n` returns chunk `min(n, chunks - 1)`, so once the script runs out
/// the last batch is repeated: retrying whatever is still missing.
#[derive(Debug)]
pub struct ScriptedPlanner {
    chunks: Vec<Vec<SubTask>>,
    calls: Mutex<usize>,
}

impl ScriptedPlanner {
    /// Chunk `components` into batches of `per_cycle` subtasks
    #[must_use]
    pub fn chunked(components: &[String], per_cycle: usize) -> Self {
        let chunks = components
            .chunks(per_cycle.max(1))
            .map(|chunk| {
                chunk
                    .iter()
                    .map(|name| SubTask::new(format!("add_{name}"), format!("add component {name}")))
                    .collect()
            })
            .collect();
        Self {
            chunks,
            calls: Mutex::new(0),
        }
    }

    /// Planner that replays explicit batches
    #[must_use]
    pub fn from_batches(chunks: Vec<Vec<SubTask>>) -> Self {
        Self {
            chunks,
            calls: Mutex::new(0),
        }
    }
}

#[async_trait]
impl ScenePlanner for ScriptedPlanner {
    async fn plan(&self, _request: PlanRequest<'_>) -> Result<PlanResponse, AgentError> {
        let mut calls = self.calls.lock().expect("planner call counter");
        let index = (*calls).min(self.chunks.len().saturating_sub(1));
        *calls += 1;

        let sub_tasks = self.chunks.get(index).cloned().unwrap_or_default();
        Ok(PlanResponse {
            raw_response: format!("scripted plan #{index}"),
            sub_tasks,
        })
    }
}

/// Generator mapping `add component <name>` instructions to `add <name>`
#[derive(Debug, Clone, Copy, Default)]
pub struct NameCommandGenerator;

#[async_trait]
impl CommandGenerator for NameCommandGenerator {
    async fn generate(&self, instruction: &str) -> Result<GeneratedCommands, AgentError> {
        let name = instruction
            .split_whitespace()
            .last()
            .ok_or_else(|| AgentError::ContractViolation("empty instruction".to_string()))?;
        Ok(GeneratedCommands {
            command_text: format!("add {name}"),
            raw_response: format!("generated command for '{instruction}'"),
        })
    }
}

/// In-memory scene standing in for the 3D tool connection
///
/// Understands a one-command dialect: `add <name>` inserts an object. The
/// scene renders as the line-oriented text shape the parser accepts.
#[derive(Debug)]
pub struct ModelSceneTool {
    objects: Vec<String>,
    executed: usize,
    fail_on_command: Option<usize>,
    failure_message: String,
}

impl ModelSceneTool {
    /// Create an empty scene
    #[must_use]
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
            executed: 0,
            fail_on_command: None,
            failure_message: "poll() failed".to_string(),
        }
    }

    /// Fail the `n`-th executed command (1-based) exactly once
    #[must_use]
    pub fn failing_once_at(mut self, n: usize, message: impl Into<String>) -> Self {
        self.fail_on_command = Some(n);
        self.failure_message = message.into();
        self
    }

    /// Names of objects currently in the scene
    #[must_use]
    pub fn objects(&self) -> &[String] {
        &self.objects
    }

    fn render(&self) -> String {
        let mut text = String::new();
        for name in &self.objects {
            text.push_str(&format!(
                "Object: {name}\nLocation: (0.0, 0.0, 0.0)\nDimensions: (1.0, 1.0, 1.0)\n"
            ));
        }
        text
    }
}

impl Default for ModelSceneTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SceneTool for ModelSceneTool {
    async fn scene_info(&mut self) -> Result<ToolPayload, ToolError> {
        Ok(ToolPayload::Text(self.render()))
    }

    async fn viewport_screenshot(&mut self) -> Result<ToolPayload, ToolError> {
        // PNG magic followed by nothing; enough to stand in for an image.
        Ok(ToolPayload::Image(vec![0x89, 0x50, 0x4E, 0x47]))
    }

    async fn execute_commands(&mut self, command_text: &str) -> Result<(), ToolError> {
        self.executed += 1;
        if self.fail_on_command == Some(self.executed) {
            return Err(ToolError::CommandRejected(self.failure_message.clone()));
        }

        for line in command_text.lines() {
            if let Some(name) = line.trim().strip_prefix("add ") {
                let name = name.trim().to_string();
                if !self.objects.contains(&name) {
                    self.objects.push(name);
                }
            }
        }
        Ok(())
    }
}

/// Evaluator scoring by component coverage of the scene text
#[derive(Debug, Clone)]
pub struct ComponentCoverageEvaluator {
    components: Vec<String>,
}

impl ComponentCoverageEvaluator {
    /// Evaluate coverage of the given component names
    #[must_use]
    pub fn new(components: Vec<String>) -> Self {
        Self { components }
    }
}

#[async_trait]
impl SceneEvaluator for ComponentCoverageEvaluator {
    async fn evaluate(&self, request: EvaluationRequest<'_>) -> Result<Evaluation, AgentError> {
        let present: Vec<&String> = self
            .components
            .iter()
            .filter(|name| request.scene_info.contains(&format!("Object: {name}")))
            .collect();
        let missing: Vec<String> = self
            .components
            .iter()
            .filter(|name| !present.contains(name))
            .cloned()
            .collect();

        let match_score = if self.components.is_empty() {
            1.0
        } else {
            present.len() as f64 / self.components.len() as f64
        };

        let mut component_breakdown = IndexMap::new();
        for name in &self.components {
            let score = if missing.contains(name) { 0.0 } else { 1.0 };
            component_breakdown.insert(name.clone(), score);
        }

        let next_priority = if missing.is_empty() {
            "Maintain the completed scene".to_string()
        } else {
            format!("Add the missing components: {}", missing.join(", "))
        };

        Ok(Evaluation {
            match_score,
            component_breakdown,
            missing_components: missing,
            next_priority,
            raw_response: format!("coverage {present}/{total}", present = present.len(), total = self.components.len()),
        })
    }
}

/// Run one simulated convergence session
///
/// # Errors
/// Propagates loop failures (persistence errors, contract breaches).
pub async fn run_simulator(config: SimulatorConfig) -> Result<SimulatorReport, LoopError> {
    let planner = ScriptedPlanner::chunked(&config.components, config.subtasks_per_cycle);
    let mut tool = ModelSceneTool::new();
    if let Some(n) = config.fail_on_command {
        tool = tool.failing_once_at(n, config.failure_message.clone());
    }

    let loop_config = LoopConfig::new()
        .with_max_iterations(config.max_iterations)
        .with_acceptance_threshold(config.acceptance_threshold)
        .with_session_file(config.session_file.clone())
        .with_checkpoint_dir(config.checkpoint_dir.clone());

    let mut convergence = ConvergenceLoop::new(
        loop_config,
        Box::new(planner),
        Box::new(NameCommandGenerator),
        Box::new(ComponentCoverageEvaluator::new(config.components.clone())),
        Box::new(tool),
    );

    let session = convergence.run(&config.requirement).await?;
    Ok(SimulatorReport { config, session })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config(dir: &std::path::Path) -> SimulatorConfig {
        SimulatorConfig {
            session_file: dir.join("session.json"),
            checkpoint_dir: dir.to_path_buf(),
            ..SimulatorConfig::default()
        }
    }

    #[tokio::test]
    async fn simulator_converges_on_clean_run() {
        let dir = tempfile::tempdir().unwrap();
        let report = run_simulator(temp_config(dir.path())).await.unwrap();

        assert!(report.converged());
        // 3 components at 2 per cycle: complete after 2 cycles.
        assert_eq!(report.session.iterations.len(), 2);
        let result = report.session.final_result.as_ref().unwrap();
        assert_eq!(result.final_match_score, Some(1.0));
        assert!(result.final_missing_components.is_empty());
    }

    #[tokio::test]
    async fn simulator_recovers_from_injected_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = temp_config(dir.path());
        // Last scripted command fails once; the repeated final batch retries it.
        config.fail_on_command = Some(3);

        let report = run_simulator(config).await.unwrap();
        assert!(report.converged());
        assert_eq!(report.session.iterations.len(), 3);

        // The failure was recorded before the component finally completed.
        let statuses: Vec<_> = report
            .session
            .iterations
            .iter()
            .flat_map(|it| it.component_progress.iter())
            .filter(|p| p.component_name == "add_bookshelf")
            .map(|p| p.status)
            .collect();
        assert!(statuses.contains(&sca_ledger::ComponentStatus::Failed));
        assert_eq!(
            report.session.component_registry["object:add_bookshelf"].status,
            sca_ledger::ComponentStatus::Complete
        );
    }

    #[tokio::test]
    async fn scripted_planner_repeats_last_batch() {
        let planner = ScriptedPlanner::chunked(
            &["a".to_string(), "b".to_string(), "c".to_string()],
            2,
        );
        let screenshot = ToolPayload::Image(Vec::new());
        let request = PlanRequest {
            requirement: "r",
            scene_info: "",
            screenshot: &screenshot,
            context_digest: "",
        };

        let first = planner.plan(request).await.unwrap();
        let second = planner.plan(request).await.unwrap();
        let third = planner.plan(request).await.unwrap();

        assert_eq!(first.sub_tasks.len(), 2);
        assert_eq!(second.sub_tasks.len(), 1);
        assert_eq!(second.sub_tasks, third.sub_tasks);
    }

    #[tokio::test]
    async fn model_scene_renders_parseable_text() {
        let mut tool = ModelSceneTool::new();
        tool.execute_commands("add armchair").await.unwrap();
        tool.execute_commands("add armchair").await.unwrap();

        let payload = tool.scene_info().await.unwrap();
        let state = sca_scene::SceneParser::new().parse(payload.as_text().unwrap());
        assert_eq!(state.objects.len(), 1);
        assert_eq!(state.objects[0].name, "armchair");
    }

    #[tokio::test]
    async fn coverage_evaluator_scores_fractionally() {
        let evaluator = ComponentCoverageEvaluator::new(vec![
            "armchair".to_string(),
            "bookshelf".to_string(),
        ]);
        let screenshot = ToolPayload::Image(Vec::new());
        let evaluation = evaluator
            .evaluate(EvaluationRequest {
                requirement: "r",
                scene_info: "Object: armchair\n",
                screenshot: &screenshot,
            })
            .await
            .unwrap();

        assert_eq!(evaluation.match_score, 0.5);
        assert_eq!(evaluation.missing_components, vec!["bookshelf".to_string()]);
        assert_eq!(evaluation.component_breakdown["armchair"], 1.0);
        assert_eq!(evaluation.component_breakdown["bookshelf"], 0.0);
    }

    #[test]
    fn report_text_includes_outcome() {
        let config = SimulatorConfig::default();
        let mut session = Session::new();
        session.final_result = Some(sca_ledger::FinalResult {
            success: true,
            iterations: 2,
            final_match_score: Some(1.0),
            reason: None,
            final_missing_components: Vec::new(),
            component_breakdown: IndexMap::new(),
        });

        let report = SimulatorReport { config, session };
        let text = report.generate_text();
        assert!(text.contains("Converged: true"));
        assert!(text.contains("Final Score: 1.00"));
    }
}
