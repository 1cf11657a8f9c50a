//! Object key helpers
//!
//! Keys are flat strings. A key ending in [`DELIMITER`] names a directory marker; every other key
//! names a regular object. Backends ignore a leading delimiter, so `/a/b` and `a/b` are the same
//! object; listings hand keys back in the store's raw form and [`with_leading_delimiter`]
//! brings them back to the logical form.

/// Path delimiter imposing hierarchy on flat keys
pub const DELIMITER: &str = "/";

/// True if `key` names a directory marker.
pub fn is_dir_marker(key: &str) -> bool {
    key.ends_with(DELIMITER)
}

/// Strip one trailing delimiter, if present.
pub fn strip_trailing_delimiter(key: &str) -> &str {
    key.strip_suffix(DELIMITER).unwrap_or(key)
}

/// Ensure `key` ends with the delimiter (the directory marker form).
pub fn with_trailing_delimiter(key: &str) -> String {
    if is_dir_marker(key) {
        key.to_string()
    } else {
        format!("{key}{DELIMITER}")
    }
}

/// Ensure `key` starts with the delimiter (the logical form used by listings).
pub fn with_leading_delimiter(key: &str) -> String {
    if key.starts_with(DELIMITER) {
        key.to_string()
    } else {
        format!("{DELIMITER}{key}")
    }
}

/// The name the store actually holds for `key`: leading delimiters removed.
pub fn object_name(key: &str) -> &str {
    key.trim_start_matches(DELIMITER)
}

/// Inclusive byte range `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Number of bytes covered; zero when `end < start`.
    pub fn len(&self) -> u64 {
        if self.end < self.start {
            0
        } else {
            self.end - self.start + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// HTTP `Range` header value
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

impl std::fmt::Display for ByteRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{} - {}]", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_forms() {
        assert!(is_dir_marker("a/b/"));
        assert!(!is_dir_marker("a/b"));
        assert_eq!(strip_trailing_delimiter("a/b/"), "a/b");
        assert_eq!(strip_trailing_delimiter("a/b"), "a/b");
        assert_eq!(strip_trailing_delimiter("/"), "");
        assert_eq!(with_trailing_delimiter("a/b"), "a/b/");
        assert_eq!(with_trailing_delimiter("a/b/"), "a/b/");
    }

    #[test]
    fn test_leading_delimiter() {
        assert_eq!(with_leading_delimiter("a/b"), "/a/b");
        assert_eq!(with_leading_delimiter("/a/b"), "/a/b");
        assert_eq!(with_leading_delimiter(""), "/");
        assert_eq!(object_name("/a/b"), "a/b");
        assert_eq!(object_name("a/b/"), "a/b/");
        assert_eq!(object_name("/"), "");
    }

    #[test]
    fn test_byte_range() {
        let range = ByteRange::new(10, 19);
        assert_eq!(range.len(), 10);
        assert_eq!(range.header_value(), "bytes=10-19");
        assert!(ByteRange::new(5, 4).is_empty());
    }
}
