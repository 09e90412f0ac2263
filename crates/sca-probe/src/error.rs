//! Probe error types

/// Internal analysis failure
///
/// Never escapes [`crate::EnvironmentProbe::analyze`]; callers always receive
/// a degraded report instead.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// A derived metric evaluated to NaN or infinity
    #[error("non-finite metric: {0}")]
    NonFiniteMetric(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_error_display() {
        let err = ProbeError::NonFiniteMetric("object_density");
        assert!(err.to_string().contains("object_density"));
    }
}
