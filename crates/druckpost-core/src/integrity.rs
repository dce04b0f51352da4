// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content fingerprints for log correlation.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of `data` and return it as a lowercase hex string.
///
/// Every job carries the hash of its source document, and the raster stage
/// logs the hash of what it produced, so repeated submissions of the same file
/// can be matched up in the logs.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// First 12 hex digits of [`hash_bytes`], for log lines.
pub fn short_hash(data: &[u8]) -> String {
    let mut full = hash_bytes(data);
    full.truncate(12);
    full
}

#[cfg(test)]
mod tests {
    use super::*;

    /// SHA-256 of the empty byte slice (well-known constant).
    const EMPTY_SHA256: &str =
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn hash_empty_input() {
        assert_eq!(hash_bytes(b""), EMPTY_SHA256);
    }

    #[test]
    fn short_hash_is_a_prefix() {
        let data = b"druckpost";
        let short = short_hash(data);
        assert_eq!(short.len(), 12);
        assert!(hash_bytes(data).starts_with(&short));
    }
}
