//! S3 backend implementation
//!
//! Wraps aws-sdk-s3 and implements the StoreBackend trait from cosn-core. Each method issues
//! exactly one SDK call; the SDK's own retry layer is disabled so that retry policy lives in
//! one place.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_s3::config::{RequestChecksumCalculation, ResponseChecksumValidation};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_smithy_runtime_api::client::orchestrator::HttpResponse;
use bytes::Bytes;
use jiff::Timestamp;

use cosn_core::key::object_name;
use cosn_core::{
    ByteRange, Error, ListRequest, ObjectBody, ObjectHead, ObjectListing, ObjectSummary,
    PutOutput, Result, StoreBackend, StoreConfig, StoreError,
};

use crate::transfer::TransferManager;

/// S3 client wrapper bound to one bucket
pub struct S3Backend {
    inner: aws_sdk_s3::Client,
    bucket: String,
    transfer: TransferManager,
}

impl S3Backend {
    /// Create a backend from a store configuration
    ///
    /// The configuration is validated here, so a bad setting fails initialization.
    pub async fn new(config: &StoreConfig) -> Result<Self> {
        config.validate()?;

        let credentials = aws_credential_types::Credentials::new(
            config.secret_id.clone(),
            config.secret_key.clone(),
            None, // session token
            None, // expiry
            "cosn-static-credentials",
        );

        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(aws_config::Region::new(config.region.clone()))
            .endpoint_url(config.endpoint_url())
            .retry_config(aws_config::retry::RetryConfig::disabled())
            .load()
            .await;

        // Checksums travel as Content-MD5; COS rejects the SDK's default aws-chunked trailers
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.path_style)
            .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
            .response_checksum_validation(ResponseChecksumValidation::WhenRequired)
            .build();
        let client = aws_sdk_s3::Client::from_conf(s3_config);

        let bucket = config.bucket_name();
        let transfer = TransferManager::new(
            client.clone(),
            bucket.clone(),
            config.upload_workers(),
            config.multipart_threshold,
            config.part_size,
        );

        tracing::info!(
            bucket = %bucket,
            endpoint = %config.endpoint_url(),
            upload_workers = config.upload_workers(),
            "Initialized S3 backend"
        );

        Ok(Self {
            inner: client,
            bucket,
            transfer,
        })
    }

    /// Get the underlying aws-sdk-s3 client
    pub fn inner(&self) -> &aws_sdk_s3::Client {
        &self.inner
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

/// Map an SDK failure onto the store fault classes.
///
/// Anything that produced an HTTP error status is a service fault carrying that status;
/// everything else (construction, timeout, dispatch) is a transport error.
pub(crate) fn classify<E>(error: SdkError<E, HttpResponse>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let status = error
        .raw_response()
        .map(|raw| raw.status().as_u16())
        .filter(|status| *status >= 400);

    match status {
        Some(status) => StoreError::Service {
            status,
            code: error.code().map(str::to_string),
            message: format_sdk_error(&error),
        },
        None => StoreError::Transport(format_sdk_error(&error)),
    }
}

/// Format AWS SDK error into a detailed error message
fn format_sdk_error<E>(error: &SdkError<E, HttpResponse>) -> String
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    match error {
        SdkError::ServiceError(service_err) => {
            let mut msg = match service_err.err().message() {
                Some(message) => message.to_string(),
                None => service_err.err().to_string(),
            };
            if let Some(request_id) = service_err.raw().headers().get("x-cos-request-id") {
                msg.push_str(&format!(" (request id: {request_id})"));
            }
            msg
        }
        SdkError::ConstructionFailure(_) => {
            format!("Request construction failed: {}", DisplayErrorContext(error))
        }
        SdkError::TimeoutError(_) => "Request timeout".to_string(),
        SdkError::DispatchFailure(_) => {
            format!("Network dispatch error: {}", DisplayErrorContext(error))
        }
        SdkError::ResponseError(_) => format!("Response error: {}", DisplayErrorContext(error)),
        _ => DisplayErrorContext(error).to_string(),
    }
}

pub(crate) fn to_timestamp(dt: &aws_smithy_types::DateTime) -> Option<Timestamp> {
    Timestamp::new(dt.secs(), dt.subsec_nanos() as i32).ok()
}

/// `x-amz-copy-source` value for `key` in `bucket`
fn copy_source(bucket: &str, key: &str) -> String {
    let encoded = urlencoding::encode(object_name(key)).replace("%2F", "/");
    format!("{bucket}/{encoded}")
}

fn non_negative(value: Option<i64>) -> u64 {
    value.and_then(|v| u64::try_from(v).ok()).unwrap_or(0)
}

#[async_trait]
impl StoreBackend for S3Backend {
    fn describe(&self, key: &str) -> String {
        format!("cosn://{}/{}", self.bucket, object_name(key))
    }

    async fn put_object(&self, key: &str, body: Bytes) -> std::result::Result<PutOutput, StoreError> {
        let length = body.len() as i64;
        let response = self
            .inner
            .put_object()
            .bucket(&self.bucket)
            .key(object_name(key))
            .content_length(length)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(classify)?;

        Ok(PutOutput {
            etag: response.e_tag().map(|e| e.trim_matches('"').to_string()),
        })
    }

    async fn head_object(&self, key: &str) -> std::result::Result<ObjectHead, StoreError> {
        let response = self
            .inner
            .head_object()
            .bucket(&self.bucket)
            .key(object_name(key))
            .send()
            .await
            .map_err(classify)?;

        Ok(ObjectHead {
            content_length: non_negative(response.content_length()),
            last_modified: response.last_modified().and_then(to_timestamp),
            etag: response.e_tag().map(|e| e.trim_matches('"').to_string()),
        })
    }

    async fn delete_object(&self, key: &str) -> std::result::Result<(), StoreError> {
        self.inner
            .delete_object()
            .bucket(&self.bucket)
            .key(object_name(key))
            .send()
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn copy_object(&self, src: &str, dst: &str) -> std::result::Result<(), StoreError> {
        self.inner
            .copy_object()
            .copy_source(copy_source(&self.bucket, src))
            .bucket(&self.bucket)
            .key(object_name(dst))
            .send()
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn get_object(
        &self,
        key: &str,
        range: Option<ByteRange>,
    ) -> std::result::Result<ObjectBody, StoreError> {
        let response = self
            .inner
            .get_object()
            .bucket(&self.bucket)
            .key(object_name(key))
            .set_range(range.map(|r| r.header_value()))
            .send()
            .await
            .map_err(classify)?;

        Ok(ObjectBody {
            content_length: response.content_length().and_then(|v| u64::try_from(v).ok()),
            reader: Box::pin(response.body.into_async_read()),
        })
    }

    async fn list_objects(
        &self,
        request: &ListRequest,
    ) -> std::result::Result<ObjectListing, StoreError> {
        let response = self
            .inner
            .list_objects()
            .bucket(&self.bucket)
            .prefix(object_name(&request.prefix))
            .set_delimiter(request.delimiter.clone())
            .set_marker(request.marker.clone())
            .max_keys(i32::try_from(request.max_keys).unwrap_or(i32::MAX))
            .send()
            .await
            .map_err(classify)?;

        let contents = response
            .contents()
            .iter()
            .map(|object| ObjectSummary {
                key: object.key().unwrap_or_default().to_string(),
                size: non_negative(object.size()),
                last_modified: object.last_modified().and_then(to_timestamp),
            })
            .collect();

        let common_prefixes = response
            .common_prefixes()
            .iter()
            .filter_map(|p| p.prefix().map(str::to_string))
            .collect();

        Ok(ObjectListing {
            contents,
            common_prefixes,
            is_truncated: response.is_truncated().unwrap_or(false),
            next_marker: response.next_marker().map(str::to_string),
        })
    }

    async fn upload_file(
        &self,
        key: &str,
        path: &Path,
        content_md5: &[u8],
    ) -> std::result::Result<PutOutput, StoreError> {
        self.transfer
            .upload(object_name(key), path, content_md5)
            .await
    }
}

/// Build a shareable backend from configuration
pub async fn connect(config: &StoreConfig) -> Result<Arc<dyn StoreBackend>> {
    let backend = S3Backend::new(config).await.inspect_err(|e| {
        if !matches!(e, Error::Config(_)) {
            tracing::error!(error = %e, "Failed to initialize S3 backend");
        }
    })?;
    Ok(Arc::new(backend))
}
