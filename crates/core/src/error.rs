//! Error types for cosn-core
//!
//! Every failure leaving the store is one of these variants. Store-call failures carry the
//! operation name and key so callers can log and decide without re-deriving context.

use thiserror::Error;

use crate::operation::OperationKind;

/// Result type alias for cosn-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for store operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{operation} {key}: not found")]
    NotFound { operation: OperationKind, key: String },

    #[error("{operation} {key}: client fault (status {status}): {message}")]
    Client {
        operation: OperationKind,
        key: String,
        status: u16,
        message: String,
    },

    #[error("{operation} {key}: failed after {attempts} attempts: {message}")]
    RetriesExhausted {
        operation: OperationKind,
        key: String,
        attempts: u32,
        message: String,
    },

    #[error("{operation} {key}: transport error: {message}")]
    Transport {
        operation: OperationKind,
        key: String,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0} not supported")]
    Unsupported(&'static str),

    /// The copy step of a rename succeeded but the delete did not; both keys now exist.
    #[error("rename {src} -> {dst}: copied but source delete failed, both keys present: {source}")]
    PartialRename {
        src: String,
        dst: String,
        #[source]
        source: Box<Error>,
    },

    #[error("{0}")]
    General(String),
}

impl Error {
    /// True for a not-found client fault.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Number of attempts made before giving up, for errors produced by the retry loop.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Error::RetriesExhausted { attempts, .. } => Some(*attempts),
            Error::NotFound { .. } | Error::Client { .. } | Error::Transport { .. } => Some(1),
            Error::PartialRename { source, .. } => source.attempts(),
            _ => None,
        }
    }

    /// Get the exit code for this error type
    pub const fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidArgument(_) | Error::Config(_) => 2,
            Error::RetriesExhausted { .. } | Error::Transport { .. } => 3,
            Error::Client { status: 401 | 403, .. } => 4,
            Error::NotFound { .. } => 5,
            Error::PartialRename { .. } => 6,
            Error::Unsupported(_) => 7,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_message() {
        assert_eq!(Error::Unsupported("purge").to_string(), "purge not supported");
        assert_eq!(Error::Unsupported("dump").to_string(), "dump not supported");
    }

    #[test]
    fn test_retries_exhausted_carries_context() {
        let err = Error::RetriesExhausted {
            operation: OperationKind::GetObject,
            key: "/a/b".to_string(),
            attempts: 5,
            message: "503 SlowDown".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("getObject"));
        assert!(msg.contains("/a/b"));
        assert!(msg.contains("5 attempts"));
        assert!(msg.contains("SlowDown"));
        assert_eq!(err.attempts(), Some(5));
    }

    #[test]
    fn test_partial_rename_is_distinct() {
        let err = Error::PartialRename {
            src: "/a".to_string(),
            dst: "/b".to_string(),
            source: Box::new(Error::Client {
                operation: OperationKind::DeleteObject,
                key: "/a".to_string(),
                status: 403,
                message: "AccessDenied".to_string(),
            }),
        };
        assert!(!err.is_not_found());
        assert_eq!(err.exit_code(), 6);
        assert!(err.to_string().contains("both keys present"));
    }
}
