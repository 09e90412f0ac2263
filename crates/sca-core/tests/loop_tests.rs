use sca_core::{ConvergenceLoop, LoopConfig, LoopError};
use sca_ledger::{ComponentStatus, SubTask};
use sca_test_utils::{
    sample_scene_text, sample_sub_tasks, ConstantEvaluator, EchoGenerator, FailingGenerator,
    FailingPlanner, FixedPlanner, RecordingPlanner, StaticSceneTool,
};

fn config_in(dir: &std::path::Path) -> LoopConfig {
    LoopConfig::new()
        .with_session_file(dir.join("session.json"))
        .with_checkpoint_dir(dir)
}

#[tokio::test]
async fn accepts_after_single_cycle_at_high_score() {
    let dir = tempfile::tempdir().unwrap();
    let mut convergence = ConvergenceLoop::new(
        config_in(dir.path()),
        Box::new(FixedPlanner::new(vec![SubTask::new("add_table", "add a table")])),
        Box::new(EchoGenerator),
        Box::new(ConstantEvaluator::new(0.95)),
        Box::new(StaticSceneTool::new(sample_scene_text())),
    );

    let session = convergence.run("a dining corner").await.unwrap();

    let result = session.final_result.unwrap();
    assert!(result.success);
    assert_eq!(result.iterations, 1);
    assert_eq!(result.final_match_score, Some(0.95));
    assert!(result.reason.is_none());
    assert_eq!(session.iterations.len(), 1);
}

#[tokio::test]
async fn exhausts_budget_at_low_score() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path()).with_max_iterations(3);
    let mut convergence = ConvergenceLoop::new(
        config,
        Box::new(FixedPlanner::new(vec![SubTask::new("add_table", "add a table")])),
        Box::new(EchoGenerator),
        Box::new(ConstantEvaluator::new(0.1).with_missing(vec!["sofa".to_string()])),
        Box::new(StaticSceneTool::new(sample_scene_text())),
    );

    let session = convergence.run("a living room").await.unwrap();

    let result = session.final_result.unwrap();
    assert!(!result.success);
    assert_eq!(result.iterations, 3);
    assert_eq!(result.reason.as_deref(), Some("Maximum iterations reached"));
    assert_eq!(result.final_missing_components, vec!["sofa".to_string()]);
    assert_eq!(session.iterations.len(), 3);
}

#[tokio::test]
async fn subtask_failure_does_not_abort_the_iteration() {
    let dir = tempfile::tempdir().unwrap();
    let mut convergence = ConvergenceLoop::new(
        config_in(dir.path()),
        Box::new(FixedPlanner::new(sample_sub_tasks())),
        Box::new(EchoGenerator),
        Box::new(ConstantEvaluator::new(0.95)),
        Box::new(StaticSceneTool::new(sample_scene_text()).failing_on_calls(vec![2])),
    );

    let session = convergence.run("a styled table").await.unwrap();

    // Subtasks 1 and 3 still executed, and the iteration sealed with all
    // three generation records.
    assert_eq!(session.iterations.len(), 1);
    let iteration = &session.iterations[0];
    assert_eq!(iteration.command_generations.len(), 3);

    assert_eq!(
        session.component_registry["object:add_table"].status,
        ComponentStatus::Complete
    );
    assert_eq!(
        session.component_registry["light:add_rim_light"].status,
        ComponentStatus::Failed
    );
    assert_eq!(
        session.component_registry["material:apply_wood_material"].status,
        ComponentStatus::Complete
    );

    // The failed component carries the analysis, not just the raw error.
    let details = &session.component_registry["light:add_rim_light"].details;
    assert_eq!(details["failure_type"], "context_error");
    assert!(details.contains_key("suggested_fix"));
    assert!(details.contains_key("likely_success_rate"));
}

#[tokio::test]
async fn generation_failure_fails_only_its_subtask() {
    let dir = tempfile::tempdir().unwrap();
    let mut convergence = ConvergenceLoop::new(
        config_in(dir.path()),
        Box::new(FixedPlanner::new(vec![
            SubTask::new("add_table", "add a table"),
            SubTask::new("add_chair", "add a chair"),
        ])),
        Box::new(FailingGenerator),
        Box::new(ConstantEvaluator::new(0.95)),
        Box::new(StaticSceneTool::new(sample_scene_text())),
    );

    let session = convergence.run("a dining corner").await.unwrap();

    let iteration = &session.iterations[0];
    assert_eq!(iteration.command_generations.len(), 2);
    assert!(iteration
        .command_generations
        .iter()
        .all(|gen| gen.command_text.is_empty()));
    assert_eq!(
        session.component_registry["object:add_table"].status,
        ComponentStatus::Failed
    );
    assert_eq!(
        session.component_registry["object:add_chair"].status,
        ComponentStatus::Failed
    );
}

#[tokio::test]
async fn planner_contract_breach_aborts_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut convergence = ConvergenceLoop::new(
        config_in(dir.path()),
        Box::new(FailingPlanner),
        Box::new(EchoGenerator),
        Box::new(ConstantEvaluator::new(0.95)),
        Box::new(StaticSceneTool::new(sample_scene_text())),
    );

    let err = convergence.run("anything").await.unwrap_err();
    assert!(matches!(err, LoopError::Planner(_)));
    assert!(err.is_contract_breach());
}

#[tokio::test]
async fn out_of_range_score_is_a_contract_violation() {
    let dir = tempfile::tempdir().unwrap();
    let mut convergence = ConvergenceLoop::new(
        config_in(dir.path()),
        Box::new(FixedPlanner::new(Vec::new())),
        Box::new(EchoGenerator),
        Box::new(ConstantEvaluator::new(1.5)),
        Box::new(StaticSceneTool::new(sample_scene_text())),
    );

    let err = convergence.run("anything").await.unwrap_err();
    assert!(matches!(err, LoopError::Contract(_)));
}

#[tokio::test]
async fn stalled_cycles_broaden_the_requirement() {
    let dir = tempfile::tempdir().unwrap();
    let planner = RecordingPlanner::new(Vec::new());
    let requirements = planner.log_handle();

    let missing: Vec<String> = ["sofa", "rug", "lamp", "plant"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let config = config_in(dir.path()).with_max_iterations(2);
    let mut convergence = ConvergenceLoop::new(
        config,
        Box::new(planner),
        Box::new(EchoGenerator),
        Box::new(
            ConstantEvaluator::new(0.1)
                .with_missing(missing)
                .with_next_priority("add a sofa"),
        ),
        Box::new(StaticSceneTool::new(sample_scene_text())),
    );

    convergence.run("a living room").await.unwrap();

    // No subtasks ran and the missing count never dropped, so the second
    // cycle gets a synthesized requirement naming the first three missing
    // components instead of the evaluator's suggestion.
    let log = requirements.lock().unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0], "a living room");
    assert_eq!(
        log[1],
        "Add missing elements to complete the scene: sofa, rug, lamp"
    );
}

#[tokio::test]
async fn progress_adopts_the_evaluator_priority() {
    let dir = tempfile::tempdir().unwrap();
    let planner = RecordingPlanner::new(vec![SubTask::new("add_table", "add a table")]);
    let requirements = planner.log_handle();

    let config = config_in(dir.path()).with_max_iterations(2);
    let mut convergence = ConvergenceLoop::new(
        config,
        Box::new(planner),
        Box::new(EchoGenerator),
        Box::new(ConstantEvaluator::new(0.1).with_next_priority("now add chairs")),
        Box::new(StaticSceneTool::new(sample_scene_text())),
    );

    convergence.run("a dining corner").await.unwrap();

    let log = requirements.lock().unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[1], "now add chairs");
}
