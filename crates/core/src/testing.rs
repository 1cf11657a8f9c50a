//! In-memory store backend for tests
//!
//! Emulates a flat object store: lexicographic key order, marker pagination with delimiter
//! grouping, 404 on missing keys, MD5 verification on upload, and per-operation fault injection.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use jiff::Timestamp;

use crate::key::{ByteRange, object_name};
use crate::operation::OperationKind;
use crate::traits::{
    ListRequest, ObjectBody, ObjectHead, ObjectListing, ObjectSummary, PutOutput, StoreBackend,
    StoreError,
};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    last_modified: Timestamp,
    content_md5: Option<Vec<u8>>,
}

#[derive(Default)]
pub(crate) struct MemoryBackend {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    faults: Mutex<HashMap<OperationKind, VecDeque<StoreError>>>,
    calls: Mutex<HashMap<OperationKind, u32>>,
}

impl MemoryBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&self, key: &str, data: impl Into<Bytes>) {
        self.objects.lock().unwrap().insert(
            object_name(key).to_string(),
            StoredObject {
                data: data.into(),
                last_modified: Timestamp::now(),
                content_md5: None,
            },
        );
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(object_name(key))
    }

    pub(crate) fn data(&self, key: &str) -> Option<Bytes> {
        self.objects
            .lock()
            .unwrap()
            .get(object_name(key))
            .map(|o| o.data.clone())
    }

    pub(crate) fn content_md5(&self, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(object_name(key))
            .and_then(|o| o.content_md5.clone())
    }

    /// Make the next `times` calls of `operation` fail with `error`.
    pub(crate) fn fail_next(&self, operation: OperationKind, error: StoreError, times: usize) {
        let mut faults = self.faults.lock().unwrap();
        let queue = faults.entry(operation).or_default();
        queue.extend(std::iter::repeat_n(error, times));
    }

    pub(crate) fn calls(&self, operation: OperationKind) -> u32 {
        self.calls
            .lock()
            .unwrap()
            .get(&operation)
            .copied()
            .unwrap_or(0)
    }

    fn enter(&self, operation: OperationKind) -> Result<(), StoreError> {
        *self.calls.lock().unwrap().entry(operation).or_default() += 1;
        match self
            .faults
            .lock()
            .unwrap()
            .get_mut(&operation)
            .and_then(VecDeque::pop_front)
        {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn not_found(key: &str) -> StoreError {
        StoreError::Service {
            status: 404,
            code: Some("NoSuchKey".into()),
            message: format!("{key} does not exist"),
        }
    }

    fn store(&self, key: &str, data: Bytes, content_md5: Option<Vec<u8>>) -> PutOutput {
        let etag = format!("{:x}", md5::compute(&data));
        self.objects.lock().unwrap().insert(
            object_name(key).to_string(),
            StoredObject {
                data,
                last_modified: Timestamp::now(),
                content_md5,
            },
        );
        PutOutput { etag: Some(etag) }
    }
}

#[async_trait]
impl StoreBackend for MemoryBackend {
    fn describe(&self, key: &str) -> String {
        format!("mem://test/{}", object_name(key))
    }

    async fn put_object(&self, key: &str, body: Bytes) -> Result<PutOutput, StoreError> {
        self.enter(OperationKind::PutObject)?;
        Ok(self.store(key, body, None))
    }

    async fn head_object(&self, key: &str) -> Result<ObjectHead, StoreError> {
        self.enter(OperationKind::HeadObject)?;
        let objects = self.objects.lock().unwrap();
        let object = objects
            .get(object_name(key))
            .ok_or_else(|| Self::not_found(key))?;
        Ok(ObjectHead {
            content_length: object.data.len() as u64,
            last_modified: Some(object.last_modified),
            etag: Some(format!("{:x}", md5::compute(&object.data))),
        })
    }

    async fn delete_object(&self, key: &str) -> Result<(), StoreError> {
        self.enter(OperationKind::DeleteObject)?;
        self.objects.lock().unwrap().remove(object_name(key));
        Ok(())
    }

    async fn copy_object(&self, src: &str, dst: &str) -> Result<(), StoreError> {
        self.enter(OperationKind::CopyObject)?;
        let mut objects = self.objects.lock().unwrap();
        let object = objects
            .get(object_name(src))
            .cloned()
            .ok_or_else(|| Self::not_found(src))?;
        objects.insert(object_name(dst).to_string(), object);
        Ok(())
    }

    async fn get_object(
        &self,
        key: &str,
        range: Option<ByteRange>,
    ) -> Result<ObjectBody, StoreError> {
        self.enter(OperationKind::GetObject)?;
        let data = self
            .objects
            .lock()
            .unwrap()
            .get(object_name(key))
            .map(|o| o.data.clone())
            .ok_or_else(|| Self::not_found(key))?;

        let slice = match range {
            None => data,
            Some(range) => {
                let len = data.len() as u64;
                if range.start >= len || range.end < range.start {
                    return Err(StoreError::service(416, "InvalidRange"));
                }
                let end = range.end.min(len - 1);
                data.slice(range.start as usize..=end as usize)
            }
        };

        Ok(ObjectBody {
            content_length: Some(slice.len() as u64),
            reader: Box::pin(std::io::Cursor::new(slice.to_vec())),
        })
    }

    async fn list_objects(&self, request: &ListRequest) -> Result<ObjectListing, StoreError> {
        self.enter(OperationKind::ListObjects)?;
        let prefix = object_name(&request.prefix);
        let marker = request.marker.as_deref();
        let objects = self.objects.lock().unwrap();

        let mut listing = ObjectListing::default();
        let mut returned = 0u32;
        let mut last: Option<String> = None;

        for (key, object) in objects.iter() {
            if !key.starts_with(prefix) || marker.is_some_and(|m| key.as_str() <= m) {
                continue;
            }

            let group = request.delimiter.as_deref().and_then(|d| {
                key[prefix.len()..]
                    .find(d)
                    .map(|pos| key[..prefix.len() + pos + d.len()].to_string())
            });

            if let Some(group) = &group {
                let seen = listing.common_prefixes.last() == Some(group)
                    || marker.is_some_and(|m| m.starts_with(group.as_str()));
                if seen {
                    continue;
                }
            }

            if returned == request.max_keys {
                listing.is_truncated = true;
                break;
            }
            returned += 1;

            match group {
                Some(group) => {
                    last = Some(group.clone());
                    listing.common_prefixes.push(group);
                }
                None => {
                    last = Some(key.clone());
                    listing.contents.push(ObjectSummary {
                        key: key.clone(),
                        size: object.data.len() as u64,
                        last_modified: Some(object.last_modified),
                    });
                }
            }
        }

        if listing.is_truncated {
            listing.next_marker = last;
        }
        Ok(listing)
    }

    async fn upload_file(
        &self,
        key: &str,
        path: &Path,
        content_md5: &[u8],
    ) -> Result<PutOutput, StoreError> {
        self.enter(OperationKind::UploadFile)?;
        let data = tokio::fs::read(path).await?;
        if md5::compute(&data).0.as_slice() != content_md5 {
            return Err(StoreError::Service {
                status: 400,
                code: Some("BadDigest".into()),
                message: "Content-MD5 does not match".into(),
            });
        }
        Ok(self.store(key, Bytes::from(data), Some(content_md5.to_vec())))
    }
}
