//! SHA256 digest utilities for local artifacts
//!
//! Local files are hashed once during pre-flight. The release service reports
//! asset digests as `sha256:<hex>`, which is compared against the local value
//! after an upload.

use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::AsyncReadExt;

const READ_CHUNK: usize = 64 * 1024;

/// Compute the hex SHA256 of in-memory data
pub fn sha256_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Compute the hex SHA256 of a file without loading it whole
pub async fn sha256_file(path: &Path) -> std::io::Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Compare a local hex digest with a service-reported digest
///
/// Returns `None` when the service digest uses an algorithm other than sha256.
pub fn matches_reported(local_hex: &str, reported: &str) -> Option<bool> {
    reported
        .strip_prefix("sha256:")
        .map(|hex_part| hex_part.eq_ignore_ascii_case(local_hex))
}
