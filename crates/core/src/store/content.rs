use std::path::Path;

use tokio::io::AsyncWriteExt;

use crate::error::{Error, Result};
use crate::key::ByteRange;
use crate::operation::StoreRequest;
use crate::traits::{ObjectBody, ObjectReader};

use super::NativeStore;

impl NativeStore {
    async fn get_object(&self, key: &str, range: Option<ByteRange>) -> Result<ObjectBody> {
        let request = StoreRequest::Get {
            key: key.to_string(),
            range,
        };
        self.executor
            .execute(&request)
            .await
            .and_then(|response| response.into_object())
    }

    /// Stream the whole object. Drop the reader to close it.
    pub async fn retrieve(&self, key: &str) -> Result<ObjectReader> {
        tracing::debug!(key, "Retrieve");
        let body = self.get_object(key, None).await.inspect_err(|e| {
            tracing::error!(path = %self.describe(key), error = %e, "Retrieve failed");
        })?;
        Ok(body.reader)
    }

    /// Stream the object from `start` to its end.
    ///
    /// A start at or past the end is not special-cased: the whole object is requested and
    /// the store's own semantics apply.
    pub async fn retrieve_from(&self, key: &str, start: u64) -> Result<ObjectReader> {
        tracing::debug!(key, start, "Retrieve from offset");
        let result = async {
            let length = self.file_length(key).await?;
            let range = (length > 0 && start <= length - 1).then(|| ByteRange::new(start, length - 1));
            self.get_object(key, range).await
        }
        .await;

        let body = result.inspect_err(|e| {
            tracing::error!(path = %self.describe(key), start, error = %e, "Retrieve from offset failed");
        })?;
        Ok(body.reader)
    }

    /// Download `[start, start + block_size)` of `key` into `local_path`, clamped to the object's
    /// end. An empty object is fetched whole. The content is streamed straight to disk.
    pub async fn retrieve_block(
        &self,
        key: &str,
        start: u64,
        block_size: u64,
        local_path: &Path,
    ) -> Result<bool> {
        if block_size == 0 {
            return Err(Error::InvalidArgument("block size must be positive".into()));
        }

        let length = self.file_length(key).await?;
        let range = (length > 0).then(|| {
            let end = (length - 1).min(start.saturating_add(block_size - 1));
            ByteRange::new(start, end)
        });

        let result = async {
            let mut body = self.get_object(key, range).await?;
            let mut file = tokio::fs::File::create(local_path).await?;
            let written = tokio::io::copy(&mut body.reader, &mut file).await?;
            file.flush().await?;
            Ok::<_, Error>(written)
        }
        .await;

        match result {
            Ok(written) => {
                tracing::debug!(
                    key,
                    range = %range.map(|r| r.to_string()).unwrap_or_default(),
                    written,
                    local = %local_path.display(),
                    "Retrieved block"
                );
                Ok(true)
            }
            Err(e) => {
                tracing::error!(
                    path = %self.describe(key),
                    range = %range.map(|r| r.to_string()).unwrap_or_default(),
                    error = %e,
                    "Retrieve block failed"
                );
                // A failed block leaves no partial file behind
                if let Err(remove_err) = tokio::fs::remove_file(local_path).await
                    && remove_err.kind() != std::io::ErrorKind::NotFound
                {
                    tracing::warn!(
                        local = %local_path.display(),
                        error = %remove_err,
                        "Removing partial block failed"
                    );
                }
                Err(e)
            }
        }
    }
}
