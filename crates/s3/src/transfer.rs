//! Managed file uploads
//!
//! Small files go up in one put. Larger files are split into parts that upload concurrently,
//! bounded by a worker pool shared by every upload in the process. The caller sees one future
//! that completes when the whole object is in place or any part has failed; a failed multipart
//! upload is aborted so no orphaned parts remain.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_smithy_types::byte_stream::Length;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use cosn_core::{PutOutput, StoreError};

use crate::client::classify;

/// User metadata key recording the content MD5 of multipart objects, whose ETag is not an MD5
pub const CHECKSUM_METADATA_KEY: &str = "content-md5";

const MAX_PARTS: u64 = 10_000;

/// One part of a multipart upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PartSpec {
    pub number: i32,
    pub offset: u64,
    pub length: u64,
}

/// Split `length` bytes into parts of `part_size`, growing the part size if the store's part
/// count limit would otherwise be exceeded.
pub(crate) fn plan_parts(length: u64, part_size: u64) -> Vec<PartSpec> {
    let part_size = part_size.max(length.div_ceil(MAX_PARTS)).max(1);
    (0..length)
        .step_by(part_size as usize)
        .enumerate()
        .map(|(index, offset)| PartSpec {
            number: index as i32 + 1,
            offset,
            length: part_size.min(length - offset),
        })
        .collect()
}

/// Multipart transfer path with a bounded worker pool
pub struct TransferManager {
    client: aws_sdk_s3::Client,
    bucket: String,
    workers: Arc<Semaphore>,
    multipart_threshold: u64,
    part_size: u64,
}

impl TransferManager {
    pub fn new(
        client: aws_sdk_s3::Client,
        bucket: String,
        workers: usize,
        multipart_threshold: u64,
        part_size: u64,
    ) -> Self {
        Self {
            client,
            bucket,
            workers: Arc::new(Semaphore::new(workers.max(1))),
            multipart_threshold,
            part_size,
        }
    }

    /// Upload the file at `path` to `key`, attaching `content_md5`.
    pub async fn upload(
        &self,
        key: &str,
        path: &Path,
        content_md5: &[u8],
    ) -> Result<PutOutput, StoreError> {
        let length = tokio::fs::metadata(path).await?.len();
        let checksum = BASE64.encode(content_md5);

        if length < self.multipart_threshold {
            self.put_single(key, path, length, checksum).await
        } else {
            self.put_multipart(key, path, length, checksum).await
        }
    }

    async fn put_single(
        &self,
        key: &str,
        path: &Path,
        length: u64,
        checksum: String,
    ) -> Result<PutOutput, StoreError> {
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StoreError::Transport(format!("read {}: {e}", path.display())))?;

        let response = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_length(length as i64)
            .content_md5(checksum)
            .body(body)
            .send()
            .await
            .map_err(classify)?;

        tracing::debug!(key, length, "Uploaded file in a single put");
        Ok(PutOutput {
            etag: response.e_tag().map(|e| e.trim_matches('"').to_string()),
        })
    }

    async fn put_multipart(
        &self,
        key: &str,
        path: &Path,
        length: u64,
        checksum: String,
    ) -> Result<PutOutput, StoreError> {
        let created = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .metadata(CHECKSUM_METADATA_KEY, checksum)
            .send()
            .await
            .map_err(classify)?;
        let upload_id = created
            .upload_id()
            .ok_or_else(|| StoreError::Transport("multipart upload returned no upload id".into()))?
            .to_string();

        let result = match self.upload_parts(key, path, length, &upload_id).await {
            Ok(parts) => self.complete(key, &upload_id, parts).await,
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            tracing::warn!(key, upload_id = %upload_id, error = %e, "Aborting multipart upload");
            if let Err(abort_err) = self
                .client
                .abort_multipart_upload()
                .bucket(&self.bucket)
                .key(key)
                .upload_id(&upload_id)
                .send()
                .await
            {
                tracing::warn!(key, error = %classify(abort_err), "Abort multipart upload failed");
            }
        }
        result
    }

    async fn upload_parts(
        &self,
        key: &str,
        path: &Path,
        length: u64,
        upload_id: &str,
    ) -> Result<Vec<CompletedPart>, StoreError> {
        let plan = plan_parts(length, self.part_size);
        tracing::debug!(key, length, parts = plan.len(), "Uploading parts");

        let mut tasks = JoinSet::new();
        for part in plan {
            let client = self.client.clone();
            let workers = self.workers.clone();
            let bucket = self.bucket.clone();
            let key = key.to_string();
            let path: PathBuf = path.to_path_buf();
            let upload_id = upload_id.to_string();

            tasks.spawn(async move {
                let _permit = workers
                    .acquire_owned()
                    .await
                    .map_err(|e| StoreError::Transport(e.to_string()))?;

                let body = ByteStream::read_from()
                    .path(&path)
                    .offset(part.offset)
                    .length(Length::Exact(part.length))
                    .build()
                    .await
                    .map_err(|e| StoreError::Transport(format!("read {}: {e}", path.display())))?;

                let response = client
                    .upload_part()
                    .bucket(bucket)
                    .key(key)
                    .upload_id(upload_id)
                    .part_number(part.number)
                    .content_length(part.length as i64)
                    .body(body)
                    .send()
                    .await
                    .map_err(classify)?;

                Ok::<_, StoreError>(
                    CompletedPart::builder()
                        .part_number(part.number)
                        .set_e_tag(response.e_tag().map(str::to_string))
                        .build(),
                )
            });
        }

        // Dropping the set on an early return aborts the remaining parts
        let mut parts = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let part = joined
                .map_err(|e| StoreError::Transport(format!("part upload task failed: {e}")))??;
            parts.push(part);
        }
        parts.sort_by_key(|p| p.part_number());
        Ok(parts)
    }

    async fn complete(
        &self,
        key: &str,
        upload_id: &str,
        parts: Vec<CompletedPart>,
    ) -> Result<PutOutput, StoreError> {
        let count = parts.len();
        let completed = CompletedMultipartUpload::builder()
            .set_parts(Some(parts))
            .build();

        let response = self
            .client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(completed)
            .send()
            .await
            .map_err(classify)?;

        tracing::debug!(key, parts = count, "Completed multipart upload");
        Ok(PutOutput {
            etag: response.e_tag().map(|e| e.trim_matches('"').to_string()),
        })
    }
}
