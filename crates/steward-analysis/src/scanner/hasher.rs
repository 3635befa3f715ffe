//! Content hashing via xxh3.

use xxhash_rust::xxh3::xxh3_64;

/// xxh3-64 of normalized file content.
#[inline]
pub fn hash_content(content: &[u8]) -> u64 {
    xxh3_64(content)
}

/// Stable 64-bit key of one line, used by line-level comparisons.
#[inline]
pub fn hash_line(line: &str) -> u64 {
    xxh3_64(line.as_bytes())
}
