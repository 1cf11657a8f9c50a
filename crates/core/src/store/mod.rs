//! Filesystem semantics over a flat object store
//!
//! [`NativeStore`] answers the questions a filesystem layer asks (is this a file, a directory or
//! nothing; what is under this prefix; give me these bytes; move this) using only the calls a flat
//! store offers. Directory presence is emulated with zero-length marker objects whose keys end in
//! the delimiter. Every network call goes through the [`RetryExecutor`].
//!
//! The operations are split by concern:
//! - `metadata`: file/directory resolution and content length
//! - `listing`: paginated prefix listing
//! - `content`: full, suffix and block reads
//! - `mutation`: uploads, directory markers, delete, copy and rename

mod content;
mod listing;
mod metadata;
mod mutation;

use std::sync::Arc;

use crate::retry::{RetryConfig, RetryExecutor};
use crate::traits::StoreBackend;

/// Filesystem-facing store over any [`StoreBackend`]
///
/// Cheap to clone; clones share the backend.
#[derive(Clone)]
pub struct NativeStore {
    executor: RetryExecutor,
}

impl NativeStore {
    pub fn new(backend: Arc<dyn StoreBackend>, retry: RetryConfig) -> Self {
        Self {
            executor: RetryExecutor::new(backend, retry),
        }
    }

    pub fn executor(&self) -> &RetryExecutor {
        &self.executor
    }

    /// Location of `key` for log and error lines
    fn describe(&self, key: &str) -> String {
        self.executor.backend().describe(key)
    }
}
