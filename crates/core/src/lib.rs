//! cosn-core: Filesystem semantics over a flat object store
//!
//! This crate provides:
//! - Directory emulation with zero-length marker objects
//! - Paginated prefix listing with common-prefix (directory) extraction
//! - Full, suffix and block reads
//! - Uploads, copy and copy-then-delete rename
//! - Bounded, jittered retry of server faults
//! - Configuration management
//!
//! The crate is independent of any object-store SDK. Network access goes through the
//! [`StoreBackend`] trait; `cosn-s3` provides the COS/S3 implementation.

pub mod checksum;
pub mod config;
pub mod error;
pub mod key;
pub mod operation;
pub mod retry;
pub mod store;
pub mod traits;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{ConfigManager, StoreConfig};
pub use error::{Error, Result};
pub use key::{ByteRange, DELIMITER};
pub use operation::{OperationKind, StoreRequest, StoreResponse};
pub use retry::{
    MAX_RETRY, RetryBuilder, RetryConfig, RetryExecutor, RetryState, is_retryable_error,
    retry_with_backoff,
};
pub use store::NativeStore;
pub use traits::{
    ListRequest, ObjectBody, ObjectHead, ObjectListing, ObjectReader, ObjectSummary, PutOutput,
    StoreBackend, StoreError,
};
pub use types::{FileMetadata, ListMode, PartialListing};
