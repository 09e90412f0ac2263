//! Session ledger
//!
//! Append-only record of a convergence session:
//! - Per-iteration planner output, command generations, evaluations, tool
//!   invocations, snapshots, and component progress
//! - A latest-state component registry alongside the full history
//! - A deterministic textual digest fed back into the planning step
//! - JSON persistence with checkpoints for inspection and rollback
//!
//! # Example
//!
//! ```rust
//! use sca_ledger::{ComponentStatus, SessionLedger};
//!
//! let mut ledger = SessionLedger::new();
//! ledger.set_initial_requirement("a cozy reading corner");
//! ledger.start_iteration(1);
//! ledger.update_component_progress(
//!     "light",
//!     "add_reading_lamp",
//!     ComponentStatus::Complete,
//!     Default::default(),
//! );
//! ledger.complete_iteration();
//! assert_eq!(ledger.session().iterations.len(), 1);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod ledger;
pub mod records;

pub use error::LedgerError;
pub use ledger::SessionLedger;
pub use records::{
    CommandGenRecord, ComponentProgress, ComponentStatus, EvaluationRecord, FinalResult,
    IterationContext, PlanRecord, Session, SessionId, SubTask, ToolInvocation,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
