//! Unified error type for reelfeed.
//!
//! Feed fetches, backend writes and config parsing all funnel into
//! [`Error`]. Playback failures are not errors in this sense: they are
//! recovered inside the playback crate and only surface as a status.

/// Failure talking to the backend or reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input or configuration failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The backend answered with a non-success status.
    #[error("Backend error [{status}]: {message}")]
    Backend { status: u16, message: String },

    /// The request never produced a response (connect, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(String),

    /// A response body could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl Error {
    pub fn backend(status: u16, message: impl Into<String>) -> Self {
        Error::Backend {
            status,
            message: message.into(),
        }
    }

    /// Whether a manual retry of the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Http(_) => true,
            Error::Backend { status, .. } => *status >= 500 || *status == 429,
            Error::Validation(_) | Error::Decode(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_message_carries_status() {
        let err = Error::backend(503, "upstream unavailable");
        assert_eq!(err.to_string(), "Backend error [503]: upstream unavailable");
        assert!(err.is_transient());
    }

    #[test]
    fn only_server_side_failures_are_transient() {
        assert!(!Error::backend(404, "missing").is_transient());
        assert!(!Error::Validation("bad".into()).is_transient());
        assert!(!Error::Decode("expected array".into()).is_transient());
        assert!(Error::backend(429, "slow down").is_transient());
        assert!(Error::Http("connection reset".into()).is_transient());
    }
}
