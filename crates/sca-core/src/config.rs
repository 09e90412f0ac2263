//! Loop configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for one convergence run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopConfig {
    /// Iteration budget
    pub max_iterations: u32,
    /// Match score at which the scene is accepted
    pub acceptance_threshold: f64,
    /// Where the full session record is persisted on loop exit
    pub session_file: PathBuf,
    /// Directory for per-iteration checkpoint files
    pub checkpoint_dir: PathBuf,
}

impl LoopConfig {
    /// Create the default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With iteration budget
    #[inline]
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// With acceptance threshold
    #[inline]
    #[must_use]
    pub fn with_acceptance_threshold(mut self, threshold: f64) -> Self {
        self.acceptance_threshold = threshold;
        self
    }

    /// With session file path
    #[inline]
    #[must_use]
    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_file = path.into();
        self
    }

    /// With checkpoint directory
    #[inline]
    #[must_use]
    pub fn with_checkpoint_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.checkpoint_dir = dir.into();
        self
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            acceptance_threshold: 0.9,
            session_file: PathBuf::from("session.json"),
            checkpoint_dir: PathBuf::from("."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_budget_and_threshold() {
        let config = LoopConfig::new();
        assert_eq!(config.max_iterations, 5);
        assert_eq!(config.acceptance_threshold, 0.9);
    }

    #[test]
    fn builder_overrides() {
        let config = LoopConfig::new()
            .with_max_iterations(3)
            .with_acceptance_threshold(0.8)
            .with_session_file("/tmp/s.json");
        assert_eq!(config.max_iterations, 3);
        assert_eq!(config.acceptance_threshold, 0.8);
        assert_eq!(config.session_file, PathBuf::from("/tmp/s.json"));
    }
}
