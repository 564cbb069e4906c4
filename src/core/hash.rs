use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

static SCAN_SEQ: AtomicU64 = AtomicU64::new(0);

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Scan id of the form `scan_<millis>_<12 hex>`. The suffix mixes in a
/// process-wide sequence number so ids stay unique within one millisecond.
pub fn scan_id(url: &str, at: DateTime<Utc>) -> String {
    let seq = SCAN_SEQ.fetch_add(1, Ordering::Relaxed);
    let millis = at.timestamp_millis();
    let digest = sha256_hex(format!("{url}|{millis}|{seq}").as_bytes());
    format!("scan_{}_{}", millis, &digest[..12])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_ids_are_unique_at_same_instant() {
        let at = Utc::now();
        let a = scan_id("https://example.com", at);
        let b = scan_id("https://example.com", at);
        assert_ne!(a, b);
        assert!(a.starts_with(&format!("scan_{}_", at.timestamp_millis())));
    }

    #[test]
    fn sha256_of_empty_input() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
