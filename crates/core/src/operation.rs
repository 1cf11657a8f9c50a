//! Store operations as a closed set of tagged requests
//!
//! Each [`StoreRequest`] variant maps to exactly one [`StoreBackend`] method in
//! [`StoreRequest::dispatch`], so the retry executor stays generic over the kind of call.

use std::path::PathBuf;

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::key::ByteRange;
use crate::traits::{
    ListRequest, ObjectBody, ObjectHead, ObjectListing, PutOutput, StoreBackend, StoreError,
};

/// Name of a store call, as it appears in logs and errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    PutObject,
    HeadObject,
    DeleteObject,
    CopyObject,
    GetObject,
    ListObjects,
    UploadFile,
}

impl OperationKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            OperationKind::PutObject => "putObject",
            OperationKind::HeadObject => "queryObjectMeta",
            OperationKind::DeleteObject => "deleteObject",
            OperationKind::CopyObject => "copyObject",
            OperationKind::GetObject => "getObject",
            OperationKind::ListObjects => "listObjects",
            OperationKind::UploadFile => "uploadFile",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One store call with its arguments
#[derive(Debug, Clone)]
pub enum StoreRequest {
    Put {
        key: String,
        body: Bytes,
    },
    Head {
        key: String,
    },
    Delete {
        key: String,
    },
    Copy {
        src: String,
        dst: String,
    },
    Get {
        key: String,
        range: Option<ByteRange>,
    },
    List(ListRequest),
    Upload {
        key: String,
        path: PathBuf,
        content_md5: Vec<u8>,
    },
}

impl StoreRequest {
    pub fn kind(&self) -> OperationKind {
        match self {
            StoreRequest::Put { .. } => OperationKind::PutObject,
            StoreRequest::Head { .. } => OperationKind::HeadObject,
            StoreRequest::Delete { .. } => OperationKind::DeleteObject,
            StoreRequest::Copy { .. } => OperationKind::CopyObject,
            StoreRequest::Get { .. } => OperationKind::GetObject,
            StoreRequest::List(_) => OperationKind::ListObjects,
            StoreRequest::Upload { .. } => OperationKind::UploadFile,
        }
    }

    /// Key the request is about, for error context. Copies report their source.
    pub fn key(&self) -> &str {
        match self {
            StoreRequest::Put { key, .. }
            | StoreRequest::Head { key }
            | StoreRequest::Delete { key }
            | StoreRequest::Get { key, .. }
            | StoreRequest::Upload { key, .. } => key,
            StoreRequest::Copy { src, .. } => src,
            StoreRequest::List(request) => &request.prefix,
        }
    }

    /// Issue this request against `backend`, once.
    pub async fn dispatch(
        &self,
        backend: &dyn StoreBackend,
    ) -> std::result::Result<StoreResponse, StoreError> {
        Ok(match self {
            StoreRequest::Put { key, body } => {
                StoreResponse::Put(backend.put_object(key, body.clone()).await?)
            }
            StoreRequest::Head { key } => StoreResponse::Head(backend.head_object(key).await?),
            StoreRequest::Delete { key } => {
                backend.delete_object(key).await?;
                StoreResponse::Deleted
            }
            StoreRequest::Copy { src, dst } => {
                backend.copy_object(src, dst).await?;
                StoreResponse::Copied
            }
            StoreRequest::Get { key, range } => {
                StoreResponse::Object(backend.get_object(key, *range).await?)
            }
            StoreRequest::List(request) => {
                StoreResponse::Listing(backend.list_objects(request).await?)
            }
            StoreRequest::Upload {
                key,
                path,
                content_md5,
            } => StoreResponse::Put(backend.upload_file(key, path, content_md5).await?),
        })
    }
}

/// Successful outcome of a [`StoreRequest`]
#[derive(Debug)]
pub enum StoreResponse {
    Put(PutOutput),
    Head(ObjectHead),
    Deleted,
    Copied,
    Object(ObjectBody),
    Listing(ObjectListing),
}

impl StoreResponse {
    fn variant(&self) -> &'static str {
        match self {
            StoreResponse::Put(_) => "put",
            StoreResponse::Head(_) => "head",
            StoreResponse::Deleted => "deleted",
            StoreResponse::Copied => "copied",
            StoreResponse::Object(_) => "object",
            StoreResponse::Listing(_) => "listing",
        }
    }

    fn mismatch(self, expected: &str) -> Error {
        Error::General(format!(
            "unexpected {} response, expected {expected}",
            self.variant()
        ))
    }

    pub fn into_put(self) -> Result<PutOutput> {
        match self {
            StoreResponse::Put(output) => Ok(output),
            other => Err(other.mismatch("put")),
        }
    }

    pub fn into_head(self) -> Result<ObjectHead> {
        match self {
            StoreResponse::Head(head) => Ok(head),
            other => Err(other.mismatch("head")),
        }
    }

    pub fn into_object(self) -> Result<ObjectBody> {
        match self {
            StoreResponse::Object(body) => Ok(body),
            other => Err(other.mismatch("object")),
        }
    }

    pub fn into_listing(self) -> Result<ObjectListing> {
        match self {
            StoreResponse::Listing(listing) => Ok(listing),
            other => Err(other.mismatch("listing")),
        }
    }
}
