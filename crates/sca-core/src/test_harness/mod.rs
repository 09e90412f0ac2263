//! Scripted end-to-end harness
//!
//! Deterministic collaborators that drive the full convergence loop without
//! a language model or a live 3D tool, plus the [`simulator`] that wires them
//! together for the CLI and for certification-style testing.

pub mod simulator;

pub use simulator::{
    run_simulator, ComponentCoverageEvaluator, ModelSceneTool, NameCommandGenerator,
    ScriptedPlanner, SimulatorConfig, SimulatorReport,
};
