use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use sha2::{Digest, Sha256};

pub fn sha256_hex(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

pub fn sha256_file_hex(path: &Path) -> Result<String> {
    let file = File::open(path)
        .with_context(|| format!("failed to open file for hashing: {}", path.display()))?;
    digest_reader(BufReader::new(file))
        .with_context(|| format!("failed to hash file: {}", path.display()))
}

/// Compares the SHA-256 of `path` with `expected_hex`.
///
/// Returns `Ok(false)` on a mismatch; a malformed expected digest is an error.
pub fn verify_sha256_file(path: &Path, expected_hex: &str) -> Result<bool> {
    let file = File::open(path)
        .with_context(|| format!("failed to open file for hashing: {}", path.display()))?;
    verify_sha256_reader(BufReader::new(file), expected_hex)
        .with_context(|| format!("failed to verify file: {}", path.display()))
}

fn verify_sha256_reader<R: Read>(reader: R, expected_hex: &str) -> Result<bool> {
    let expected = normalize_expected_digest(expected_hex)?;
    Ok(digest_reader(reader)? == expected)
}

fn digest_reader<R: Read>(mut reader: R) -> Result<String> {
    let mut hasher = Sha256::new();
    let mut buf = [0_u8; 64 * 1024];
    loop {
        let read = reader.read(&mut buf).context("failed to read payload")?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

fn normalize_expected_digest(expected_hex: &str) -> Result<String> {
    let normalized = expected_hex.trim().to_ascii_lowercase();
    let bytes = hex::decode(&normalized)
        .with_context(|| format!("failed to decode SHA-256 hex: {expected_hex}"))?;
    if bytes.len() != 32 {
        return Err(anyhow!(
            "invalid SHA-256 length: expected 32 bytes, got {}",
            bytes.len()
        ));
    }
    Ok(normalized)
}
