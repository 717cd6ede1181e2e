use std::path::PathBuf;

use thiserror::Error;

pub type AdapterResult<T> = Result<T, AdapterError>;

/// Failure of a single adapter call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    #[error("host context unavailable: {0}")]
    HostUnavailable(String),
    #[error("no signed-in account in the token cache")]
    NoSession,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("graph returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("request cancelled")]
    Cancelled,
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Coarse classification callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    HostUnavailable,
    NoSession,
    Network,
    Malformed,
    Cancelled,
    Validation,
}

impl AdapterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AdapterError::HostUnavailable(_) => ErrorKind::HostUnavailable,
            AdapterError::NoSession => ErrorKind::NoSession,
            AdapterError::Transport(_) | AdapterError::Status { .. } => ErrorKind::Network,
            AdapterError::Malformed(_) => ErrorKind::Malformed,
            AdapterError::Cancelled => ErrorKind::Cancelled,
            AdapterError::InvalidInput(_) => ErrorKind::Validation,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config ({}): {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("config validation failed: {0}")]
    Invalid(String),
    #[error("config required: {0} not found")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_and_transport_are_network_failures() {
        let status = AdapterError::Status {
            status: 503,
            message: "busy".into(),
        };
        assert_eq!(status.kind(), ErrorKind::Network);
        assert_eq!(
            AdapterError::Transport("reset".into()).kind(),
            ErrorKind::Network
        );
    }

    #[test]
    fn no_session_is_distinct_from_network() {
        assert_eq!(AdapterError::NoSession.kind(), ErrorKind::NoSession);
        assert_ne!(AdapterError::NoSession.kind(), ErrorKind::Network);
    }

    #[test]
    fn status_message_includes_code() {
        let err = AdapterError::Status {
            status: 404,
            message: "not found".into(),
        };
        assert_eq!(err.to_string(), "graph returned status 404: not found");
    }

    #[test]
    fn config_io_error_names_the_file() {
        let err = ConfigError::Io(
            PathBuf::from("/etc/dashboard.json"),
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(
            err.to_string(),
            "failed to read config (/etc/dashboard.json): gone"
        );
    }
}
