//! Environment probe
//!
//! Derives higher-level metrics from a scene snapshot (spatial layout,
//! lighting adequacy, aesthetic heuristics) and emits issues and
//! recommendations for the planning step.
//!
//! # Example
//!
//! ```rust
//! use sca_probe::EnvironmentProbe;
//!
//! let probe = EnvironmentProbe::new();
//! let report = probe.analyze("Light: Sun\nType: SUN\n");
//! assert_eq!(report.lighting.total_lumens, 100_000.0);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod metrics;
pub mod probe;

pub use error::ProbeError;
pub use metrics::{
    AestheticMetrics, AnalysisReport, LightingMetrics, ObjectMetrics, SceneSummary, SpatialMetrics,
};
pub use probe::EnvironmentProbe;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
