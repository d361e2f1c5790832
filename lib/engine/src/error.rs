//! Engine error types.
//!
//! Upstream completion failures and tool failures are handled inside
//! the turn (retries, contained error outcomes, persisted apologies);
//! only state persistence failures are fatal to a turn, because losing
//! the checkpoint would silently fork the session.

use garnet_porter_conversation::StoreError;
use std::fmt;

/// Errors that fail an entire turn.
#[derive(Debug)]
pub enum TurnError {
    /// Loading or checkpointing session state failed.
    Persistence(StoreError),
}

impl fmt::Display for TurnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Persistence(err) => write!(f, "session state persistence failed: {err}"),
        }
    }
}

impl std::error::Error for TurnError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Persistence(err) => Some(err),
        }
    }
}

impl From<StoreError> for TurnError {
    fn from(err: StoreError) -> Self {
        Self::Persistence(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_error_display_includes_cause() {
        let err = TurnError::from(StoreError::Backend {
            reason: "connection reset".to_string(),
        });
        assert!(err.to_string().contains("persistence"));
        assert!(err.to_string().contains("connection reset"));
    }
}
