//! Error types for sgaclsyncd

use thiserror::Error;

/// Policy sync daemon errors
///
/// Every variant is event-scoped: a failure aborts the current
/// notification's pipeline, never the listening process.
#[derive(Error, Debug)]
pub enum SgaclSyncError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP/transport failure talking to the ERS API
    #[error("ERS transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response body did not carry the expected resource envelope
    #[error("Malformed {resource} response: {detail}")]
    Envelope {
        resource: &'static str,
        detail: String,
    },

    /// Bulk operation never reached SUCCESS within the configured bound
    #[error("Bulk operation not successful after {attempts} attempts")]
    PollExhausted { attempts: u32 },

    /// Extravars document could not be read, parsed, or replaced
    #[error("Extravars error: {0}")]
    Persistence(String),

    /// ansible-runner could not be invoked or produced unreadable output
    #[error("Playbook invocation error: {0}")]
    Playbook(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for sgaclsyncd operations
pub type Result<T> = std::result::Result<T, SgaclSyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SgaclSyncError::Config("missing credentials".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing credentials");
    }

    #[test]
    fn test_envelope_display() {
        let err = SgaclSyncError::Envelope {
            resource: "EgressMatrixCell",
            detail: "missing envelope key".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Malformed EgressMatrixCell response: missing envelope key"
        );
    }

    #[test]
    fn test_poll_exhausted_display() {
        let err = SgaclSyncError::PollExhausted { attempts: 30 };
        assert_eq!(
            err.to_string(),
            "Bulk operation not successful after 30 attempts"
        );
    }
}
