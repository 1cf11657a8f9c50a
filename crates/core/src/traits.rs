//! Store backend trait
//!
//! The backend is the only thing that talks to the network. It executes exactly one store call per
//! method invocation and reports failures as [`StoreError`], keeping server faults (5xx)
//! distinguishable from client faults and transport errors. Retry, directory emulation and listing
//! normalization all live above this seam, so a backend stays a thin SDK adapter.

use std::path::Path;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use jiff::Timestamp;
use thiserror::Error;
use tokio::io::AsyncRead;

use crate::error::Error;
use crate::key::ByteRange;
use crate::operation::OperationKind;

/// Streaming object content. The caller owns it and drops it to close the connection.
pub type ObjectReader = Pin<Box<dyn AsyncRead + Send>>;

/// Failure reported by a single backend call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store answered with an error status
    #[error("status {status} ({}): {message}", .code.as_deref().unwrap_or("-"))]
    Service {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// No usable response: timeout, dispatch failure, local I/O
    #[error("{0}")]
    Transport(String),
}

impl StoreError {
    pub fn service(status: u16, message: impl Into<String>) -> Self {
        StoreError::Service {
            status,
            code: None,
            message: message.into(),
        }
    }

    /// Transient service-side failure (HTTP 5xx)
    pub fn is_server_fault(&self) -> bool {
        matches!(self, StoreError::Service { status, .. } if status / 100 == 5)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::Service { status: 404, .. })
    }

    /// Lift into the crate error, attaching operation and key.
    ///
    /// Server faults only reach this point after the retry budget is spent, so callers use
    /// [`Error::RetriesExhausted`] for them instead.
    pub fn into_error(self, operation: OperationKind, key: &str) -> Error {
        let key = key.to_string();
        match self {
            StoreError::Service { status: 404, .. } => Error::NotFound { operation, key },
            StoreError::Service {
                status,
                code,
                message,
            } => Error::Client {
                operation,
                key,
                status,
                message: match code {
                    Some(code) => format!("{code}: {message}"),
                    None => message,
                },
            },
            StoreError::Transport(message) => Error::Transport {
                operation,
                key,
                message,
            },
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Transport(e.to_string())
    }
}

/// Metadata returned by a head request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectHead {
    pub content_length: u64,
    pub last_modified: Option<Timestamp>,
    pub etag: Option<String>,
}

/// One entry of a raw listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    /// Key as held by the store (no leading delimiter)
    pub key: String,
    pub size: u64,
    pub last_modified: Option<Timestamp>,
}

/// Parameters of one paginated listing call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListRequest {
    pub prefix: String,
    pub delimiter: Option<String>,
    pub marker: Option<String>,
    pub max_keys: u32,
}

/// One raw listing page as the store returns it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectListing {
    pub contents: Vec<ObjectSummary>,
    pub common_prefixes: Vec<String>,
    pub is_truncated: bool,
    pub next_marker: Option<String>,
}

/// Object content returned by a get request
pub struct ObjectBody {
    pub content_length: Option<u64>,
    pub reader: ObjectReader,
}

impl std::fmt::Debug for ObjectBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectBody")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Result of a put or managed upload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutOutput {
    pub etag: Option<String>,
}

/// A flat object store reachable over the network.
///
/// Implementations must be safe to call concurrently from many tasks without external locking.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Human-readable location of `key`, used in log lines (e.g. `cosn://bucket/key`).
    fn describe(&self, key: &str) -> String;

    async fn put_object(&self, key: &str, body: Bytes) -> Result<PutOutput, StoreError>;

    async fn head_object(&self, key: &str) -> Result<ObjectHead, StoreError>;

    /// Deleting an absent key succeeds.
    async fn delete_object(&self, key: &str) -> Result<(), StoreError>;

    /// Server-side copy within the bucket.
    async fn copy_object(&self, src: &str, dst: &str) -> Result<(), StoreError>;

    async fn get_object(
        &self,
        key: &str,
        range: Option<ByteRange>,
    ) -> Result<ObjectBody, StoreError>;

    async fn list_objects(&self, request: &ListRequest) -> Result<ObjectListing, StoreError>;

    /// Upload a local file through the managed transfer path, recording `content_md5`
    /// (raw 16-byte digest) so the store can verify integrity.
    async fn upload_file(
        &self,
        key: &str,
        path: &Path,
        content_md5: &[u8],
    ) -> Result<PutOutput, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_classification() {
        assert!(StoreError::service(500, "internal").is_server_fault());
        assert!(StoreError::service(503, "slow down").is_server_fault());
        assert!(!StoreError::service(404, "missing").is_server_fault());
        assert!(StoreError::service(404, "missing").is_not_found());
        assert!(!StoreError::Transport("reset".into()).is_server_fault());
    }

    #[test]
    fn test_into_error() {
        let err = StoreError::service(404, "NoSuchKey").into_error(OperationKind::HeadObject, "/a");
        assert!(err.is_not_found());

        let err = StoreError::Service {
            status: 403,
            code: Some("AccessDenied".into()),
            message: "denied".into(),
        }
        .into_error(OperationKind::PutObject, "/a");
        match err {
            Error::Client {
                status, message, ..
            } => {
                assert_eq!(status, 403);
                assert_eq!(message, "AccessDenied: denied");
            }
            other => panic!("unexpected: {other:?}"),
        }

        let err = StoreError::Transport("timeout".into()).into_error(OperationKind::ListObjects, "/");
        assert!(matches!(err, Error::Transport { .. }));
    }
}
