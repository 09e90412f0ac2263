//! Testing utilities for the SCA workspace
//!
//! Shared stub collaborators and fixtures for exercising the convergence
//! loop without a language model or a live 3D tool.

#![allow(missing_docs)]

use async_trait::async_trait;
use indexmap::IndexMap;
use sca_core::{
    AgentError, CommandGenerator, Evaluation, EvaluationRequest, GeneratedCommands, PlanRequest,
    PlanResponse, SceneEvaluator, ScenePlanner, SceneTool, SubTask, ToolError, ToolPayload,
};
use std::sync::{Arc, Mutex};

/// Planner returning the same subtask batch on every call
#[derive(Debug, Clone)]
pub struct FixedPlanner {
    sub_tasks: Vec<SubTask>,
}

impl FixedPlanner {
    pub fn new(sub_tasks: Vec<SubTask>) -> Self {
        Self { sub_tasks }
    }
}

#[async_trait]
impl ScenePlanner for FixedPlanner {
    async fn plan(&self, _request: PlanRequest<'_>) -> Result<PlanResponse, AgentError> {
        Ok(PlanResponse {
            sub_tasks: self.sub_tasks.clone(),
            raw_response: "fixed plan".to_string(),
        })
    }
}

/// Planner recording the requirement text of every call
///
/// Keeps the log behind an [`Arc`] so tests can read it after the loop has
/// taken ownership of the planner.
#[derive(Debug)]
pub struct RecordingPlanner {
    sub_tasks: Vec<SubTask>,
    log: Arc<Mutex<Vec<String>>>,
}

impl RecordingPlanner {
    pub fn new(sub_tasks: Vec<SubTask>) -> Self {
        Self {
            sub_tasks,
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Handle to the requirement log
    pub fn log_handle(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.log)
    }
}

#[async_trait]
impl ScenePlanner for RecordingPlanner {
    async fn plan(&self, request: PlanRequest<'_>) -> Result<PlanResponse, AgentError> {
        self.log
            .lock()
            .expect("requirement log")
            .push(request.requirement.to_string());
        Ok(PlanResponse {
            sub_tasks: self.sub_tasks.clone(),
            raw_response: "recorded plan".to_string(),
        })
    }
}

/// Planner that always breaks its contract
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingPlanner;

#[async_trait]
impl ScenePlanner for FailingPlanner {
    async fn plan(&self, _request: PlanRequest<'_>) -> Result<PlanResponse, AgentError> {
        Err(AgentError::ContractViolation(
            "response carried no subtask list".to_string(),
        ))
    }
}

/// Generator echoing the instruction as the command text
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoGenerator;

#[async_trait]
impl CommandGenerator for EchoGenerator {
    async fn generate(&self, instruction: &str) -> Result<GeneratedCommands, AgentError> {
        Ok(GeneratedCommands {
            command_text: instruction.to_string(),
            raw_response: format!("echo: {instruction}"),
        })
    }
}

/// Generator that always fails
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingGenerator;

#[async_trait]
impl CommandGenerator for FailingGenerator {
    async fn generate(&self, _instruction: &str) -> Result<GeneratedCommands, AgentError> {
        Err(AgentError::Provider("generation backend offline".to_string()))
    }
}

/// Evaluator returning the same result on every call
#[derive(Debug, Clone)]
pub struct ConstantEvaluator {
    score: f64,
    missing: Vec<String>,
    next_priority: String,
}

impl ConstantEvaluator {
    pub fn new(score: f64) -> Self {
        Self {
            score,
            missing: Vec::new(),
            next_priority: "keep going".to_string(),
        }
    }

    #[must_use]
    pub fn with_missing(mut self, missing: Vec<String>) -> Self {
        self.missing = missing;
        self
    }

    #[must_use]
    pub fn with_next_priority(mut self, next_priority: impl Into<String>) -> Self {
        self.next_priority = next_priority.into();
        self
    }
}

#[async_trait]
impl SceneEvaluator for ConstantEvaluator {
    async fn evaluate(&self, _request: EvaluationRequest<'_>) -> Result<Evaluation, AgentError> {
        let mut component_breakdown = IndexMap::new();
        for name in &self.missing {
            component_breakdown.insert(name.clone(), 0.0);
        }
        Ok(Evaluation {
            match_score: self.score,
            component_breakdown,
            missing_components: self.missing.clone(),
            next_priority: self.next_priority.clone(),
            raw_response: "constant evaluation".to_string(),
        })
    }
}

/// Tool serving a fixed scene description, with optional injected failures
#[derive(Debug)]
pub struct StaticSceneTool {
    scene_text: String,
    executed: usize,
    fail_on_calls: Vec<usize>,
    failure_message: String,
}

impl StaticSceneTool {
    pub fn new(scene_text: impl Into<String>) -> Self {
        Self {
            scene_text: scene_text.into(),
            executed: 0,
            fail_on_calls: Vec::new(),
            failure_message: "poll() failed".to_string(),
        }
    }

    /// Fail execution calls with these 1-based indexes
    #[must_use]
    pub fn failing_on_calls(mut self, calls: Vec<usize>) -> Self {
        self.fail_on_calls = calls;
        self
    }

    /// With a specific failure message
    #[must_use]
    pub fn with_failure_message(mut self, message: impl Into<String>) -> Self {
        self.failure_message = message.into();
        self
    }
}

#[async_trait]
impl SceneTool for StaticSceneTool {
    async fn scene_info(&mut self) -> Result<ToolPayload, ToolError> {
        Ok(ToolPayload::Text(self.scene_text.clone()))
    }

    async fn viewport_screenshot(&mut self) -> Result<ToolPayload, ToolError> {
        Ok(ToolPayload::Image(vec![0x89, 0x50, 0x4E, 0x47]))
    }

    async fn execute_commands(&mut self, _command_text: &str) -> Result<(), ToolError> {
        self.executed += 1;
        if self.fail_on_calls.contains(&self.executed) {
            return Err(ToolError::CommandRejected(self.failure_message.clone()));
        }
        Ok(())
    }
}

/// A small parseable scene description used across tests
#[must_use]
pub fn sample_scene_text() -> String {
    "Object: armchair\nLocation: (1.0, 0.0, 0.0)\nDimensions: (1.0, 1.0, 1.0)\n\
     Light: Sun\nType: SUN\n"
        .to_string()
}

/// Three subtasks named after typical scene components
#[must_use]
pub fn sample_sub_tasks() -> Vec<SubTask> {
    vec![
        SubTask::new("add_table", "add a wooden table"),
        SubTask::new("add_rim_light", "add a rim light"),
        SubTask::new("apply_wood_material", "apply a wood material to the table"),
    ]
}
