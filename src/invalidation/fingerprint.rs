//! Change fingerprints for invalidation groups.
//!
//! A fingerprint is a SHA-256 digest over the `(path, value)` pairs of a
//! group, sorted by path so the result does not depend on traversal order.

use sha2::{Digest, Sha256};

/// Byte written between a path and its value.
const FIELD_SEPARATOR: u8 = 0x1f;

/// Byte written after each value.
const RECORD_SEPARATOR: u8 = 0x1e;

/// Computes fingerprints for groups of parameter values.
#[derive(Debug, Default, Clone, Copy)]
pub struct Fingerprinter;

impl Fingerprinter {
    /// Creates a new fingerprinter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes the fingerprint of a set of `(path, value)` pairs.
    ///
    /// Pairs are sorted by path before hashing. An empty set yields the
    /// digest of the empty input.
    #[must_use]
    pub fn fingerprint<'a, I>(&self, pairs: I) -> String
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut pairs: Vec<(&str, &str)> = pairs.into_iter().collect();
        pairs.sort_unstable();

        let mut hasher = Sha256::new();
        for (path, value) in pairs {
            hasher.update(path.as_bytes());
            hasher.update([FIELD_SEPARATOR]);
            hasher.update(value.as_bytes());
            hasher.update([RECORD_SEPARATOR]);
        }

        hex::encode(hasher.finalize())
    }

    /// Computes a short fingerprint (first 8 characters) for display purposes.
    #[must_use]
    pub fn short(&self, fingerprint: &str) -> String {
        fingerprint.chars().take(8).collect()
    }
}
