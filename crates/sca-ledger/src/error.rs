//! Ledger error types

/// Persistence failure while saving or loading a session
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// File read/write failed
    #[error("session file io: {0}")]
    Io(#[from] std::io::Error),

    /// Session encoding/decoding failed
    #[error("session encoding: {0}")]
    Encoding(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_error_display() {
        let err = LedgerError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(err.to_string().contains("session file io"));
    }
}
