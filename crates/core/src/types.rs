//! Filesystem-facing data model
//!
//! These values are built per call and owned by the caller.

use jiff::Timestamp;
use serde::Serialize;

/// Metadata of a file, directory marker or synthesized common prefix
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileMetadata {
    pub key: String,
    /// Content length; always 0 when `is_file` is false
    pub size: u64,
    pub mod_time: Timestamp,
    pub is_file: bool,
}

impl FileMetadata {
    pub fn file(key: impl Into<String>, size: u64, mod_time: Option<Timestamp>) -> Self {
        Self {
            key: key.into(),
            size,
            mod_time: mod_time.unwrap_or(Timestamp::UNIX_EPOCH),
            is_file: true,
        }
    }

    pub fn directory(key: impl Into<String>, mod_time: Option<Timestamp>) -> Self {
        Self {
            key: key.into(),
            size: 0,
            mod_time: mod_time.unwrap_or(Timestamp::UNIX_EPOCH),
            is_file: false,
        }
    }

    /// Common prefix entry: directory with epoch modification time
    pub fn common_prefix(key: impl Into<String>) -> Self {
        Self::directory(key, None)
    }

    pub fn is_dir(&self) -> bool {
        !self.is_file
    }
}

/// How a listing treats keys below the immediate level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListMode {
    /// No delimiter: every descendant is returned as a file
    Flat,
    /// Delimiter set: deeper keys are grouped into common prefixes
    #[default]
    Hierarchical,
}

impl ListMode {
    pub fn recursive(recursive: bool) -> Self {
        if recursive {
            ListMode::Flat
        } else {
            ListMode::Hierarchical
        }
    }
}

/// One page of a directory listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PartialListing {
    /// Resubmit to continue; `None` once the listing is exhausted. Never empty.
    pub next_marker: Option<String>,
    pub files: Vec<FileMetadata>,
    pub common_prefixes: Vec<FileMetadata>,
}

impl PartialListing {
    pub fn is_complete(&self) -> bool {
        self.next_marker.is_none()
    }

    pub fn len(&self) -> usize {
        self.files.len() + self.common_prefixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
