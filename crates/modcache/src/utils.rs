//! Hashing helpers for resolved state.

use modcache_core::{Payload, VirtualPath};
use xxhash_rust::xxh3::xxh3_64;

/// Compute a deterministic fingerprint of a set of resolved files.
///
/// The fingerprint is built from sorted `(path_hash, payload_hash)` pairs, so
/// two equal resolution maps always produce the same value regardless of
/// iteration order. Returns `0` for an empty set.
///
/// Owners are not part of the fingerprint; two collections that serve the same
/// files from different mods compare equal.
pub fn compute_resolved_fingerprint<'a, I>(entries: I) -> u64
where
    I: IntoIterator<Item = (&'a VirtualPath, &'a Payload)>,
{
    let mut pairs: Vec<(u64, u64)> = entries
        .into_iter()
        .map(|(path, payload)| {
            (
                xxh3_64(path.as_str().as_bytes()),
                xxh3_64(payload.to_string().as_bytes()),
            )
        })
        .collect();
    if pairs.is_empty() {
        return 0;
    }
    pairs.sort_unstable();

    let mut buf = Vec::with_capacity(pairs.len() * 16);
    for (path_hash, payload_hash) in &pairs {
        buf.extend_from_slice(&path_hash.to_le_bytes());
        buf.extend_from_slice(&payload_hash.to_le_bytes());
    }

    xxh3_64(&buf)
}
