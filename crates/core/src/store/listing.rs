use futures::Stream;

use crate::error::{Error, Result};
use crate::key::{self, DELIMITER};
use crate::operation::StoreRequest;
use crate::traits::{ListRequest, ObjectListing};
use crate::types::{FileMetadata, ListMode, PartialListing};

use super::NativeStore;

impl NativeStore {
    /// List one page under `prefix`.
    ///
    /// The prefix is normalized to start with the delimiter, and so are the returned keys. The
    /// prefix's own directory marker is not reported as a child. Resubmit `next_marker` until it
    /// comes back `None` to enumerate everything.
    pub async fn list(
        &self,
        prefix: &str,
        mode: ListMode,
        max_entries: u32,
        marker: Option<&str>,
    ) -> Result<PartialListing> {
        if max_entries == 0 {
            return Err(Error::InvalidArgument(
                "listing page size must be at least 1".into(),
            ));
        }

        let prefix = key::with_leading_delimiter(prefix);
        let delimiter = match mode {
            ListMode::Flat => None,
            ListMode::Hierarchical => Some(DELIMITER.to_string()),
        };
        tracing::debug!(prefix = %prefix, ?mode, max_entries, marker, "List prefix");

        let request = StoreRequest::List(ListRequest {
            prefix: prefix.clone(),
            delimiter,
            marker: marker.filter(|m| !m.is_empty()).map(str::to_string),
            max_keys: max_entries,
        });
        let listing = self
            .executor
            .execute(&request)
            .await
            .and_then(|response| response.into_listing())
            .inspect_err(|e| {
                tracing::error!(
                    prefix = %prefix,
                    ?mode,
                    max_entries,
                    marker = marker.unwrap_or(""),
                    error = %e,
                    "List failed"
                );
            })?;

        let next_marker = continuation_marker(&listing)?;

        let files: Vec<FileMetadata> = listing
            .contents
            .into_iter()
            .filter_map(|summary| {
                let path = key::with_leading_delimiter(&summary.key);
                (path != prefix)
                    .then(|| FileMetadata::file(path, summary.size, summary.last_modified))
            })
            .collect();

        let common_prefixes: Vec<FileMetadata> = listing
            .common_prefixes
            .iter()
            .map(|p| FileMetadata::common_prefix(key::with_leading_delimiter(p)))
            .collect();

        tracing::debug!(
            files = files.len(),
            common_prefixes = common_prefixes.len(),
            complete = next_marker.is_none(),
            "Listed prefix"
        );

        Ok(PartialListing {
            next_marker,
            files,
            common_prefixes,
        })
    }

    /// First page of the directory at `prefix`: its files and immediate subdirectories.
    pub async fn list_dir(&self, prefix: &str, max_entries: u32) -> Result<PartialListing> {
        self.list(prefix, ListMode::Hierarchical, max_entries, None)
            .await
    }

    /// Stream successive pages under `prefix`, each fetched only when polled.
    pub fn list_pages<'a>(
        &'a self,
        prefix: &'a str,
        mode: ListMode,
        page_size: u32,
    ) -> impl Stream<Item = Result<PartialListing>> + Send + 'a {
        // State: Some(marker) while pages remain
        futures::stream::try_unfold(Some(None::<String>), move |state| async move {
            let Some(marker) = state else {
                return Ok(None);
            };
            let page = self
                .list(prefix, mode, page_size, marker.as_deref())
                .await?;
            let next = page.next_marker.clone().map(Some);
            Ok(Some((page, next)))
        })
    }
}

/// Marker for the next page, or `None` when the listing is complete.
///
/// Stores only report `NextMarker` for delimited listings, so a truncated page without one
/// continues after its last entry.
fn continuation_marker(listing: &ObjectListing) -> Result<Option<String>> {
    if !listing.is_truncated {
        return Ok(None);
    }
    if let Some(marker) = listing.next_marker.as_deref().filter(|m| !m.is_empty()) {
        return Ok(Some(marker.to_string()));
    }

    let last_key = listing.contents.last().map(|s| s.key.as_str());
    let last_prefix = listing.common_prefixes.last().map(String::as_str);
    last_key
        .max(last_prefix)
        .filter(|m| !m.is_empty())
        .map(|m| Some(m.to_string()))
        .ok_or_else(|| Error::General("truncated listing returned no continuation marker".into()))
}
