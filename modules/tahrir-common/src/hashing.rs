//! Deterministic hashing for dedup keys and cluster keys.
//!
//! All hashes here must be stable across process restarts — the std
//! `DefaultHasher` is NOT (HashDoS randomization), so token hashing uses
//! FNV-1a and persistent keys use SHA-256.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::text::normalize_whitespace;

/// Exact-dedup key for an ingested item: SHA-256 over
/// (source name, URL, normalized title).
pub fn unique_hash(source_name: &str, url: &str, title: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_name.as_bytes());
    hasher.update(b"|");
    hasher.update(url.trim().as_bytes());
    hasher.update(b"|");
    hasher.update(normalize_whitespace(title).to_lowercase().as_bytes());
    hex_digest(&hasher.finalize())
}

/// Deterministic story-cluster key: anchor seed + category + day bucket.
pub fn cluster_key(seed: &str, category: &str, bucket_day: DateTime<Utc>) -> String {
    let bucket = bucket_day.format("%Y%m%d").to_string();
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update(b"|");
    hasher.update(category.as_bytes());
    hasher.update(b"|");
    hasher.update(bucket.as_bytes());
    let digest = hex_digest(&hasher.finalize());
    format!("evt-{bucket}-{}", &digest[..24])
}

/// Per-article correlation id threaded through logs.
pub fn generate_trace_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// FNV-1a 64-bit. Used for SimHash token hashing and content change
/// detection.
pub fn fnv1a_64(data: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in data {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

fn hex_digest(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_hash_is_stable_and_title_normalized() {
        let a = unique_hash("APS", "https://example.dz/a", "العنوان  الكامل");
        let b = unique_hash("APS", "https://example.dz/a", " العنوان الكامل ");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn unique_hash_distinguishes_sources() {
        let a = unique_hash("APS", "https://example.dz/a", "title");
        let b = unique_hash("TSA", "https://example.dz/a", "title");
        assert_ne!(a, b);
    }

    #[test]
    fn cluster_key_buckets_by_day() {
        let d1 = "2026-03-01T10:00:00Z".parse().unwrap();
        let d2 = "2026-03-01T23:59:00Z".parse().unwrap();
        let d3 = "2026-03-02T00:01:00Z".parse().unwrap();
        let k1 = cluster_key("seed", "politics", d1);
        assert_eq!(k1, cluster_key("seed", "politics", d2));
        assert_ne!(k1, cluster_key("seed", "politics", d3));
        assert!(k1.starts_with("evt-20260301-"));
    }

    #[test]
    fn fnv_matches_known_vector() {
        // FNV-1a of empty input is the offset basis.
        assert_eq!(fnv1a_64(b""), 0xcbf29ce484222325);
        assert_ne!(fnv1a_64(b"a"), fnv1a_64(b"b"));
    }
}
