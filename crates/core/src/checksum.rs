//! Content checksums

use std::path::Path;

use tokio::io::AsyncReadExt;

use crate::error::Result;

const READ_BUF: usize = 64 * 1024;

/// MD5 digest of a local file, read in chunks.
pub async fn file_md5(path: &Path) -> Result<[u8; 16]> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut context = md5::Context::new();
    let mut buf = vec![0u8; READ_BUF];

    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        context.consume(&buf[..n]);
    }

    Ok(context.compute().0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_md5_matches_in_memory_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob");
        let content: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &content).unwrap();

        assert_eq!(file_md5(&path).await.unwrap(), md5::compute(&content).0);
    }

    #[tokio::test]
    async fn test_file_md5_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(file_md5(&dir.path().join("absent")).await.is_err());
    }
}
