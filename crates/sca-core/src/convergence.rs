//! Convergence loop
//!
//! Drives the iteration: plan -> execute subtasks -> observe -> evaluate,
//! up to the iteration budget. The loop owns the collaborators and the scene
//! tool connection; the session ledger records every step. A single subtask
//! failure is analyzed and recorded but never aborts the iteration or the
//! session.

use crate::agents::{
    CommandGenerator, Evaluation, EvaluationRequest, PlanRequest, SceneEvaluator, ScenePlanner,
    SceneTool, ToolPayload,
};
use crate::config::LoopConfig;
use crate::error::LoopError;
use chrono::Utc;
use indexmap::IndexMap;
use sca_failure::{FailureAnalyzer, TaskContext};
use sca_ledger::{
    ComponentStatus, EvaluationRecord, FinalResult, Session, SessionLedger, SubTask,
};
use sca_probe::{AnalysisReport, EnvironmentProbe};
use sca_scene::{SceneParser, SceneState};
use serde_json::{json, Value};

/// The iterative convergence loop
///
/// Owns the external collaborators and the exclusive tool connection, both
/// passed in at construction. Strictly sequential: one planner call, subtasks
/// in list order, one evaluator call per cycle.
pub struct ConvergenceLoop {
    config: LoopConfig,
    planner: Box<dyn ScenePlanner>,
    generator: Box<dyn CommandGenerator>,
    evaluator: Box<dyn SceneEvaluator>,
    tool: Box<dyn SceneTool>,
    parser: SceneParser,
    probe: EnvironmentProbe,
    analyzer: FailureAnalyzer,
}

impl ConvergenceLoop {
    /// Assemble a loop from its collaborators
    #[must_use]
    pub fn new(
        config: LoopConfig,
        planner: Box<dyn ScenePlanner>,
        generator: Box<dyn CommandGenerator>,
        evaluator: Box<dyn SceneEvaluator>,
        tool: Box<dyn SceneTool>,
    ) -> Self {
        Self {
            config,
            planner,
            generator,
            evaluator,
            tool,
            parser: SceneParser::new(),
            probe: EnvironmentProbe::new(),
            analyzer: FailureAnalyzer::new(),
        }
    }

    /// Get the configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    /// Run the loop to convergence or budget exhaustion
    ///
    /// Returns the fully recorded session. Both termination paths write a
    /// final checkpoint and persist the session file.
    ///
    /// # Errors
    /// Planner/evaluator contract breaches, scene observation failures, and
    /// persistence failures abort the run. Subtask execution failures do not.
    pub async fn run(&mut self, requirement: &str) -> Result<Session, LoopError> {
        tracing::info!(requirement, "starting convergence run");

        let mut ledger =
            SessionLedger::new().with_checkpoint_dir(self.config.checkpoint_dir.clone());
        ledger.set_initial_requirement(requirement);

        // Initial observation. The parsed snapshot stays local until the
        // first iteration opens; the ledger tolerates nothing being open.
        let mut scene_info = self.observe_scene_text().await?;
        let mut screenshot = self.tool.viewport_screenshot().await?;
        let mut snapshot = self.parser.parse(&scene_info);
        let mut analysis = self.probe.analyze_state(&snapshot);

        let mut scene_requirement = requirement.to_string();
        let mut last_evaluation: Option<Evaluation> = None;
        let mut converged = false;

        for iteration in 1..=self.config.max_iterations {
            ledger.start_iteration(iteration);
            let digest = ledger.context_digest();

            let plan = self
                .planner
                .plan(PlanRequest {
                    requirement: &scene_requirement,
                    scene_info: &scene_info,
                    screenshot: &screenshot,
                    context_digest: &digest,
                })
                .await
                .map_err(LoopError::Planner)?;
            tracing::info!(iteration, subtasks = plan.sub_tasks.len(), "plan received");
            ledger.store_plan(plan.sub_tasks.clone(), plan.raw_response);

            let mut tasks_completed = 0usize;
            for task in &plan.sub_tasks {
                let completed = self
                    .run_subtask(&mut ledger, task, &mut scene_info, &mut snapshot, &mut analysis)
                    .await?;
                if completed {
                    tasks_completed += 1;
                }
            }

            // Re-observe after the batch and record the iteration's snapshot.
            scene_info = self.observe_scene_text().await?;
            screenshot = self.tool.viewport_screenshot().await?;
            snapshot = self.parser.parse(&scene_info);
            analysis = self.probe.analyze_state(&snapshot);

            ledger.store_tool_invocation(
                "get_scene_info",
                "text",
                ToolPayload::Text(scene_info.clone()).summary(),
                iteration_metadata(iteration),
            );
            ledger.store_tool_invocation(
                "get_viewport_screenshot",
                screenshot.kind(),
                screenshot.summary(),
                iteration_metadata(iteration),
            );
            ledger.store_snapshot(snapshot.clone());
            ledger.store_analysis(analysis.clone());

            let evaluation = self
                .evaluator
                .evaluate(EvaluationRequest {
                    requirement: &scene_requirement,
                    scene_info: &scene_info,
                    screenshot: &screenshot,
                })
                .await
                .map_err(LoopError::Evaluator)?;
            validate_score(evaluation.match_score)?;
            tracing::info!(
                iteration,
                score = evaluation.match_score,
                missing = evaluation.missing_components.len(),
                "evaluation received"
            );

            for missing in &evaluation.missing_components {
                ledger.update_component_progress(
                    component_type_for(missing),
                    missing,
                    ComponentStatus::Missing,
                    missing_details(&analysis),
                );
            }

            ledger.store_evaluation(EvaluationRecord {
                match_score: evaluation.match_score,
                suggestion: evaluation.next_priority.clone(),
                component_breakdown: evaluation.component_breakdown.clone(),
                missing_components: evaluation.missing_components.clone(),
                issues: analysis.issues.clone(),
                recommendations: analysis.recommendations.clone(),
                timestamp: Utc::now(),
            });

            ledger.complete_iteration();

            if evaluation.match_score >= self.config.acceptance_threshold {
                tracing::info!(
                    score = evaluation.match_score,
                    "scene matches requirement, stopping"
                );
                ledger.set_final_result(FinalResult {
                    success: true,
                    iterations: iteration,
                    final_match_score: Some(evaluation.match_score),
                    reason: None,
                    final_missing_components: evaluation.missing_components.clone(),
                    component_breakdown: evaluation.component_breakdown.clone(),
                });
                last_evaluation = Some(evaluation);
                converged = true;
                break;
            }

            // Only adopt the evaluator's next priority if this cycle made
            // measurable progress; otherwise synthesize a requirement naming
            // the still-missing components to avoid repeating an unproductive
            // request verbatim.
            let registry_missing = ledger.missing_count();
            if tasks_completed > 0 || evaluation.missing_components.len() < registry_missing {
                scene_requirement = evaluation.next_priority.clone();
            } else {
                let listed: Vec<String> = evaluation
                    .missing_components
                    .iter()
                    .take(3)
                    .cloned()
                    .collect();
                scene_requirement = format!(
                    "Add missing elements to complete the scene: {}",
                    listed.join(", ")
                );
                tracing::warn!(iteration, requirement = %scene_requirement, "no progress, broadening request");
            }
            last_evaluation = Some(evaluation);
        }

        if !converged {
            let (score, missing, breakdown) = match &last_evaluation {
                Some(eval) => (
                    Some(eval.match_score),
                    eval.missing_components.clone(),
                    eval.component_breakdown.clone(),
                ),
                None => (None, Vec::new(), IndexMap::new()),
            };
            tracing::warn!(
                iterations = self.config.max_iterations,
                "iteration budget exhausted without convergence"
            );
            ledger.set_final_result(FinalResult {
                success: false,
                iterations: self.config.max_iterations,
                final_match_score: score,
                reason: Some("Maximum iterations reached".to_string()),
                final_missing_components: missing,
                component_breakdown: breakdown,
            });
        }

        // Both exit paths leave a checkpoint and the persisted session.
        let sealed = ledger.session().iterations.len() as u32;
        ledger.create_checkpoint(sealed)?;
        ledger.save_to_file(&self.config.session_file)?;

        Ok(ledger.into_session())
    }

    /// Generate and execute one subtask, recording the outcome
    ///
    /// Returns whether the subtask completed. Generation and execution
    /// failures are analyzed and recorded as failed component progress; only
    /// scene observation failures propagate.
    async fn run_subtask(
        &mut self,
        ledger: &mut SessionLedger,
        task: &SubTask,
        scene_info: &mut String,
        snapshot: &mut SceneState,
        analysis: &mut AnalysisReport,
    ) -> Result<bool, LoopError> {
        tracing::info!(task = %task.name, instruction = %task.instruction, "executing subtask");

        let generated = match self.generator.generate(&task.instruction).await {
            Ok(generated) => generated,
            Err(err) => {
                tracing::error!(task = %task.name, error = %err, "command generation failed");
                ledger.store_command_generation(&task.name, &task.instruction, "", "");
                let ctx = TaskContext {
                    task_name: task.name.clone(),
                    instruction: task.instruction.clone(),
                    command_text: String::new(),
                    error_message: err.to_string(),
                    error_type: "generation_error".to_string(),
                    stack_trace: err.to_string(),
                    scene_before: snapshot.clone(),
                    scene_after: snapshot.clone(),
                    attempt_number: 1,
                    previous_failures: Vec::new(),
                };
                let current = &*analysis;
                self.record_failure(ledger, task, &ctx, current, current);
                return Ok(false);
            }
        };

        ledger.store_command_generation(
            &task.name,
            &task.instruction,
            &generated.command_text,
            &generated.raw_response,
        );

        let scene_before = snapshot.clone();
        let analysis_before = analysis.clone();

        match self.tool.execute_commands(&generated.command_text).await {
            Ok(()) => {
                // Refresh state so the next subtask sees this one's effect.
                *scene_info = self.observe_scene_text().await?;
                *snapshot = self.parser.parse(scene_info);
                *analysis = self.probe.analyze_state(snapshot);

                let issues_resolved =
                    analysis_before.issues.len() as i64 - analysis.issues.len() as i64;
                let mut details = IndexMap::new();
                details.insert("instruction".to_string(), json!(task.instruction));
                details.insert(
                    "quality_metrics".to_string(),
                    serde_json::to_value(&analysis.summary).unwrap_or(Value::Null),
                );
                details.insert("issues_resolved".to_string(), json!(issues_resolved));
                details.insert(
                    "improvement_score".to_string(),
                    json!(analysis.summary.overall_score),
                );
                ledger.update_component_progress(
                    component_type_for(&task.name),
                    &task.name,
                    ComponentStatus::Complete,
                    details,
                );
                Ok(true)
            }
            Err(err) => {
                tracing::error!(task = %task.name, error = %err, "task execution failed");

                // Observe the aftermath so the analysis sees both sides.
                *scene_info = self.observe_scene_text().await?;
                let scene_after = self.parser.parse(scene_info);
                let analysis_after = self.probe.analyze_state(&scene_after);

                let ctx = TaskContext {
                    task_name: task.name.clone(),
                    instruction: task.instruction.clone(),
                    command_text: generated.command_text.clone(),
                    error_message: err.to_string(),
                    error_type: err.kind_tag().to_string(),
                    stack_trace: err.to_string(),
                    scene_before,
                    scene_after: scene_after.clone(),
                    attempt_number: 1,
                    previous_failures: Vec::new(),
                };
                self.record_failure(ledger, task, &ctx, &analysis_before, &analysis_after);

                *snapshot = scene_after;
                *analysis = analysis_after;
                Ok(false)
            }
        }
    }

    /// Run the failure analyzer and record the failed component
    fn record_failure(
        &self,
        ledger: &mut SessionLedger,
        task: &SubTask,
        ctx: &TaskContext,
        analysis_before: &AnalysisReport,
        analysis_after: &AnalysisReport,
    ) {
        let failure = self.analyzer.analyze(ctx);
        tracing::info!(
            task = %task.name,
            kind = %failure.failure_kind,
            issue = %failure.specific_issue,
            complexity = failure.recovery_complexity,
            "failure analyzed"
        );
        tracing::debug!(task = %task.name, fix = %failure.suggested_fix, "suggested fix");

        let quality_regression = (analysis_before.summary.overall_score
            - analysis_after.summary.overall_score)
            .max(0.0);

        let mut details = IndexMap::new();
        details.insert("error".to_string(), json!(ctx.error_message));
        details.insert("instruction".to_string(), json!(task.instruction));
        details.insert(
            "failure_type".to_string(),
            json!(failure.failure_kind.as_str()),
        );
        details.insert("root_cause".to_string(), json!(failure.root_cause.as_str()));
        details.insert("specific_issue".to_string(), json!(failure.specific_issue));
        details.insert("suggested_fix".to_string(), json!(failure.suggested_fix));
        details.insert(
            "recovery_complexity".to_string(),
            json!(failure.recovery_complexity),
        );
        details.insert(
            "likely_success_rate".to_string(),
            json!(failure.likely_success_rate),
        );
        details.insert(
            "alternative_approaches".to_string(),
            json!(failure.alternative_approaches),
        );
        details.insert(
            "environment_impact".to_string(),
            json!({
                "issues_before": analysis_before.issues,
                "issues_after": analysis_after.issues,
                "quality_regression": quality_regression,
            }),
        );

        ledger.update_component_progress(
            component_type_for(&task.name),
            &task.name,
            ComponentStatus::Failed,
            details,
        );
    }

    /// Fetch the scene description, requiring a textual payload
    async fn observe_scene_text(&mut self) -> Result<String, LoopError> {
        match self.tool.scene_info().await? {
            ToolPayload::Text(text) => Ok(text),
            ToolPayload::Image(_) => Err(LoopError::Observation(
                crate::error::ToolError::UnexpectedPayload { expected: "text" },
            )),
        }
    }
}

/// Classify a component name into a progress-tracking type
#[must_use]
pub fn component_type_for(name: &str) -> &'static str {
    let lowered = name.to_lowercase();
    if ["light", "lighting", "illumination"]
        .iter()
        .any(|kw| lowered.contains(kw))
    {
        "light"
    } else if ["camera", "view", "shot"].iter().any(|kw| lowered.contains(kw)) {
        "camera"
    } else if ["material", "texture", "shader"]
        .iter()
        .any(|kw| lowered.contains(kw))
    {
        "material"
    } else if ["object", "model", "create", "add"]
        .iter()
        .any(|kw| lowered.contains(kw))
    {
        "object"
    } else {
        "component"
    }
}

fn validate_score(score: f64) -> Result<(), LoopError> {
    if score.is_finite() && (0.0..=1.0).contains(&score) {
        Ok(())
    } else {
        Err(LoopError::Contract(format!(
            "match score {score} outside [0, 1]"
        )))
    }
}

fn iteration_metadata(iteration: u32) -> IndexMap<String, Value> {
    let mut metadata = IndexMap::new();
    metadata.insert("iteration".to_string(), json!(iteration));
    metadata
}

fn missing_details(analysis: &AnalysisReport) -> IndexMap<String, Value> {
    let mut details = IndexMap::new();
    details.insert("priority".to_string(), json!("high"));
    details.insert(
        "environment_context".to_string(),
        serde_json::to_value(&analysis.summary).unwrap_or(Value::Null),
    );
    details.insert("issues_remaining".to_string(), json!(analysis.issues));
    details
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_type_classification() {
        assert_eq!(component_type_for("add_rim_light"), "light");
        assert_eq!(component_type_for("camera_angle"), "camera");
        assert_eq!(component_type_for("wood_texture"), "material");
        assert_eq!(component_type_for("create_table"), "object");
        assert_eq!(component_type_for("ambiance"), "component");
    }

    #[test]
    fn classification_order_light_before_object() {
        // "add" alone maps to object, but lighting keywords are checked first.
        assert_eq!(component_type_for("add_ceiling_light"), "light");
    }

    #[test]
    fn score_validation() {
        assert!(validate_score(0.0).is_ok());
        assert!(validate_score(0.9).is_ok());
        assert!(validate_score(1.0).is_ok());
        assert!(validate_score(1.5).is_err());
        assert!(validate_score(-0.1).is_err());
        assert!(validate_score(f64::NAN).is_err());
    }
}
