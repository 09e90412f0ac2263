//! SCA Core - Convergence loop orchestrator
//!
//! The central loop that drives a 3D scene toward a natural-language
//! requirement:
//! - Asks the external planner for incremental subtasks
//! - Generates and executes commands for each subtask in order
//! - Re-observes and analyzes the scene after every change
//! - Asks the external evaluator for a score and the next priority
//! - Stops on acceptance or when the iteration budget is exhausted
//!
//! Subtask failures are analyzed and recorded, never fatal; the fully
//! recorded session is persisted on both exit paths.
//!
//! # Example
//!
//! ```rust,ignore
//! use sca_core::{ConvergenceLoop, LoopConfig};
//!
//! # async fn example(planner: Box<dyn sca_core::ScenePlanner>,
//! #                  generator: Box<dyn sca_core::CommandGenerator>,
//! #                  evaluator: Box<dyn sca_core::SceneEvaluator>,
//! #                  tool: Box<dyn sca_core::SceneTool>)
//! #     -> Result<(), Box<dyn std::error::Error>> {
//! let config = LoopConfig::new().with_max_iterations(5);
//! let mut convergence = ConvergenceLoop::new(config, planner, generator, evaluator, tool);
//!
//! let session = convergence.run("a cozy reading corner with warm lighting").await?;
//! println!("converged: {:?}", session.final_result);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod agents;
pub mod config;
pub mod convergence;
pub mod error;
pub mod test_harness;

// Re-exports for convenience
pub use agents::{
    CommandGenerator, Evaluation, EvaluationRequest, GeneratedCommands, PlanRequest, PlanResponse,
    SceneEvaluator, ScenePlanner, SceneTool, ToolPayload,
};
pub use config::LoopConfig;
pub use convergence::{component_type_for, ConvergenceLoop};
pub use error::{AgentError, LoopError, ToolError};
pub use sca_ledger::{Session, SubTask};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the convergence loop
    pub use crate::{
        CommandGenerator, ConvergenceLoop, Evaluation, LoopConfig, PlanResponse, SceneEvaluator,
        ScenePlanner, SceneTool, Session, SubTask, ToolPayload,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
