//! cosn-s3: COS/S3 backend for cosn-core
//!
//! Implements the `StoreBackend` trait over aws-sdk-s3, including a managed multipart upload
//! path with a bounded worker pool.

pub mod client;
pub mod transfer;

pub use client::{S3Backend, connect};
pub use transfer::{CHECKSUM_METADATA_KEY, TransferManager};
