//! Streaming content fingerprints
//!
//! Files are digested with SHA-256 in fixed-size chunks so memory use stays
//! flat regardless of file size. The digest is a change-detection checksum,
//! not an integrity or security primitive.

use std::path::Path;

use anyhow::Context;
use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

use fanout_core::domain::newtypes::ContentDigest;

/// Read chunk size for streaming digests.
const CHUNK_SIZE: usize = 8192;

/// Computes the hex-encoded SHA-256 digest of a file's content.
///
/// The file is read in [`CHUNK_SIZE`] chunks; a file modified concurrently
/// yields an arbitrary interleaving, which the next cycle corrects.
pub async fn digest_file(path: &Path) -> anyhow::Result<ContentDigest> {
    let mut file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("opening {} for fingerprinting", path.display()))?;

    let mut hasher = Sha256::new();
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let n = file
            .read(&mut buf)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    let digest = ContentDigest::new(hex::encode(hasher.finalize()))?;
    Ok(digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_empty_file_digest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.txt");
        std::fs::write(&path, b"").unwrap();

        let digest = digest_file(&path).await.unwrap();
        // SHA-256 of the empty string.
        assert_eq!(
            digest.as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[tokio::test]
    async fn test_known_content_digest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hello.txt");
        std::fs::write(&path, b"hello world").unwrap();

        let digest = digest_file(&path).await.unwrap();
        assert_eq!(
            digest.as_str(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[tokio::test]
    async fn test_large_file_spans_multiple_chunks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.bin");
        let content = vec![0x5a_u8; CHUNK_SIZE * 3 + 17];
        std::fs::write(&path, &content).unwrap();

        let streamed = digest_file(&path).await.unwrap();
        let whole = hex::encode(Sha256::digest(&content));
        assert_eq!(streamed.as_str(), whole);
    }

    #[tokio::test]
    async fn test_content_change_changes_digest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mut.txt");

        std::fs::write(&path, b"one").unwrap();
        let first = digest_file(&path).await.unwrap();

        std::fs::write(&path, b"two").unwrap();
        let second = digest_file(&path).await.unwrap();

        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = digest_file(&dir.path().join("gone.txt")).await;
        assert!(result.is_err());
    }
}
