use sha2::{Digest, Sha256};
use std::path::Path;

/// Compute SHA-256 hash of a byte slice
pub fn compute_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// Compute SHA-256 hash of a file's contents
pub fn compute_file_hash(path: &Path) -> Result<String, std::io::Error> {
    let content = std::fs::read(path)?;
    Ok(compute_hash(&content))
}
