use crate::error::Result;
use crate::key::{self, DELIMITER};
use crate::operation::StoreRequest;
use crate::traits::ObjectHead;
use crate::types::FileMetadata;

use super::NativeStore;

impl NativeStore {
    /// Head `key`, treating not-found as `None`.
    async fn query_object_metadata(&self, key: &str) -> Result<Option<ObjectHead>> {
        let request = StoreRequest::Head {
            key: key.to_string(),
        };
        match self.executor.execute(&request).await {
            Ok(response) => {
                let head = response.into_head()?;
                tracing::debug!(
                    key,
                    etag = head.etag.as_deref().unwrap_or(""),
                    length = head.content_length,
                    "Retrieved object metadata"
                );
                Ok(Some(head))
            }
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => {
                tracing::error!(path = %self.describe(key), error = %e, "Retrieve metadata failed");
                Err(e)
            }
        }
    }

    /// Resolve `key` to a file, a directory, or nothing.
    ///
    /// The key itself (without a trailing delimiter) is looked up first; on a miss the directory
    /// marker form `key/` is tried. A key given with a trailing delimiter resolves as a
    /// directory.
    ///
    /// The root (`""` or `"/"`) is the one exception to the two-step lookup: it always exists and
    /// resolves to a synthesized directory without any store call, since a bucket holds no marker
    /// for its own root.
    pub async fn retrieve_metadata(&self, key: &str) -> Result<Option<FileMetadata>> {
        let as_dir = key::is_dir_marker(key);
        let stripped = key::strip_trailing_delimiter(key);

        if stripped.is_empty() {
            return Ok(Some(FileMetadata::directory(DELIMITER, None)));
        }

        if let Some(head) = self.query_object_metadata(stripped).await? {
            return Ok(Some(if as_dir {
                FileMetadata::directory(key::with_trailing_delimiter(stripped), head.last_modified)
            } else {
                FileMetadata::file(stripped, head.content_length, head.last_modified)
            }));
        }

        let marker = key::with_trailing_delimiter(stripped);
        Ok(self
            .query_object_metadata(&marker)
            .await?
            .map(|head| FileMetadata::directory(marker, head.last_modified)))
    }

    /// Content length of `key`. Unlike [`NativeStore::retrieve_metadata`], a missing key
    /// is an error.
    pub async fn file_length(&self, key: &str) -> Result<u64> {
        tracing::debug!(key, "Get file length");
        let request = StoreRequest::Head {
            key: key.to_string(),
        };
        let head = self
            .executor
            .execute(&request)
            .await
            .and_then(|response| response.into_head())
            .inspect_err(|e| {
                tracing::error!(path = %self.describe(key), error = %e, "Get file length failed");
            })?;
        Ok(head.content_length)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::Error;
    use crate::operation::OperationKind;
    use crate::store::test_support::memory_store;
    use crate::traits::StoreError;

    #[tokio::test]
    async fn test_file_resolves_as_file() {
        let (store, backend) = memory_store();
        backend.insert("/data/a.txt", "hello");

        let meta = store.retrieve_metadata("/data/a.txt").await.unwrap().unwrap();
        assert!(meta.is_file);
        assert_eq!(meta.size, 5);
        assert_eq!(meta.key, "/data/a.txt");
        assert_eq!(backend.calls(OperationKind::HeadObject), 1);
    }

    #[tokio::test]
    async fn test_marker_resolves_as_directory() {
        let (store, backend) = memory_store();
        store.store_empty_file("/data/dir").await.unwrap();

        for key in ["/data/dir", "/data/dir/"] {
            let meta = store.retrieve_metadata(key).await.unwrap().unwrap();
            assert!(!meta.is_file, "{key}");
            assert_eq!(meta.size, 0);
            assert_eq!(meta.key, "/data/dir/");
        }
        // Each lookup misses the plain key first
        assert_eq!(backend.calls(OperationKind::HeadObject), 4);
    }

    #[tokio::test]
    async fn test_trailing_delimiter_forces_directory() {
        let (store, backend) = memory_store();
        backend.insert("/data/a", "content");

        let meta = store.retrieve_metadata("/data/a/").await.unwrap().unwrap();
        assert!(!meta.is_file);
        assert_eq!(meta.size, 0);
    }

    #[tokio::test]
    async fn test_absent_key() {
        let (store, backend) = memory_store();
        assert!(store.retrieve_metadata("/nothing").await.unwrap().is_none());
        assert_eq!(backend.calls(OperationKind::HeadObject), 2);
    }

    #[tokio::test]
    async fn test_root_always_exists() {
        let (store, backend) = memory_store();
        for root in ["", "/"] {
            let meta = store.retrieve_metadata(root).await.unwrap().unwrap();
            assert!(meta.is_dir());
            assert_eq!(meta.key, "/");
        }
        assert_eq!(backend.calls(OperationKind::HeadObject), 0);
    }

    #[tokio::test]
    async fn test_non_404_fault_propagates() {
        let (store, backend) = memory_store();
        backend.insert("/data/a", "x");
        backend.fail_next(
            OperationKind::HeadObject,
            StoreError::service(403, "AccessDenied"),
            1,
        );

        let err = store.retrieve_metadata("/data/a").await.unwrap_err();
        assert!(matches!(err, Error::Client { status: 403, .. }));
    }

    #[tokio::test]
    async fn test_server_faults_are_retried_transparently() {
        let (store, backend) = memory_store();
        backend.insert("/data/a", "abc");
        backend.fail_next(
            OperationKind::HeadObject,
            StoreError::service(503, "SlowDown"),
            4,
        );

        let meta = store.retrieve_metadata("/data/a").await.unwrap().unwrap();
        assert_eq!(meta.size, 3);
        assert_eq!(backend.calls(OperationKind::HeadObject), 5);
    }

    #[tokio::test]
    async fn test_file_length() {
        let (store, backend) = memory_store();
        backend.insert("/f", vec![0u8; 1234]);

        assert_eq!(store.file_length("/f").await.unwrap(), 1234);
        assert!(store.file_length("/missing").await.unwrap_err().is_not_found());
    }
}
