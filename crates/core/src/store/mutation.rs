use std::path::Path;

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::key;
use crate::operation::StoreRequest;

use super::NativeStore;

impl NativeStore {
    /// Upload a local file, recording `content_md5` for integrity checking.
    ///
    /// The whole upload is resubmitted on a server fault; a multipart transfer cannot be
    /// resumed halfway.
    pub async fn store_file(&self, key: &str, local: &Path, content_md5: &[u8]) -> Result<()> {
        let length = tokio::fs::metadata(local).await?.len();
        tracing::debug!(key, local = %local.display(), length, "Store file");

        let request = StoreRequest::Upload {
            key: key.to_string(),
            path: local.to_path_buf(),
            content_md5: content_md5.to_vec(),
        };
        let output = self
            .executor
            .execute(&request)
            .await
            .and_then(|response| response.into_put())
            .inspect_err(|e| {
                tracing::error!(
                    path = %self.describe(key),
                    local = %local.display(),
                    error = %e,
                    "Store file failed"
                );
            })?;

        tracing::debug!(
            key,
            local = %local.display(),
            etag = output.etag.as_deref().unwrap_or(""),
            "Stored file"
        );
        Ok(())
    }

    /// Create a directory by writing a zero-length marker at `key/`.
    pub async fn store_empty_file(&self, key: &str) -> Result<()> {
        let marker = key::with_trailing_delimiter(key);
        let request = StoreRequest::Put {
            key: marker.clone(),
            body: Bytes::new(),
        };
        let output = self
            .executor
            .execute(&request)
            .await
            .and_then(|response| response.into_put())
            .inspect_err(|e| {
                tracing::error!(path = %self.describe(&marker), error = %e, "Store empty file failed");
            })?;

        tracing::debug!(key = %marker, etag = output.etag.as_deref().unwrap_or(""), "Stored empty file");
        Ok(())
    }

    /// Delete `key`. Deleting an absent key succeeds.
    pub async fn delete(&self, key: &str) -> Result<()> {
        tracing::debug!(path = %self.describe(key), "Delete");
        let request = StoreRequest::Delete {
            key: key.to_string(),
        };
        self.executor.execute(&request).await.map(drop).inspect_err(|e| {
            tracing::error!(path = %self.describe(key), error = %e, "Delete failed");
        })
    }

    /// Server-side copy within the bucket.
    pub async fn copy(&self, src: &str, dst: &str) -> Result<()> {
        tracing::debug!(src, dst, "Copy");
        let request = StoreRequest::Copy {
            src: src.to_string(),
            dst: dst.to_string(),
        };
        self.executor.execute(&request).await.map(drop).inspect_err(|e| {
            tracing::error!(src = %self.describe(src), dst, error = %e, "Copy failed");
        })
    }

    /// Copy `src` to `dst`, then delete `src`. Not atomic.
    ///
    /// If the delete fails after the copy succeeded, both keys exist and
    /// [`Error::PartialRename`] is returned. No rollback is attempted.
    pub async fn rename(&self, src: &str, dst: &str) -> Result<()> {
        tracing::debug!(src, dst, "Rename");
        self.copy(src, dst).await?;

        if let Err(e) = self.delete(src).await {
            tracing::error!(src, dst, error = %e, "Rename left both keys present");
            return Err(Error::PartialRename {
                src: src.to_string(),
                dst: dst.to_string(),
                source: Box::new(e),
            });
        }
        Ok(())
    }

    pub async fn purge(&self, _prefix: &str) -> Result<()> {
        Err(Error::Unsupported("purge"))
    }

    pub async fn dump(&self) -> Result<()> {
        Err(Error::Unsupported("dump"))
    }
}
