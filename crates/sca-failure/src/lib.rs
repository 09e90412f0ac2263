//! Failure analysis
//!
//! Classifies task-execution errors against a static pattern library, infers
//! root causes, proposes fixes and alternatives, and scores recovery
//! likelihood and complexity.
//!
//! # Example
//!
//! ```rust
//! use sca_failure::{FailureAnalyzer, FailureKind, TaskContext};
//!
//! let analyzer = FailureAnalyzer::new();
//! let ctx = TaskContext::first_attempt("add_table", "add a table", "spawn table", "poll() failed");
//! let analysis = analyzer.analyze(&ctx);
//! assert_eq!(analysis.failure_kind, FailureKind::Context);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod analyzer;
mod patterns;
pub mod types;

pub use analyzer::FailureAnalyzer;
pub use types::{
    FailureAnalysis, FailureKind, FailureSummary, RootCause, SceneImpact, TaskContext,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
