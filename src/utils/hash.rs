//! Content hashing for revisioned asset filenames.
//!
//! Uses blake3 so that identical content always yields the identical
//! fingerprint across runs and platforms. Unchanged assets therefore keep
//! their revisioned filename between builds, which is what keeps browser
//! caches warm.

/// Compute a content fingerprint: first 10 hex chars of the blake3 hash.
///
/// Embedded in revisioned filenames (e.g. `client-a1b2c3d4e5.js`).
#[inline]
pub fn fingerprint<T: AsRef<[u8]> + ?Sized>(data: &T) -> String {
    let hash = blake3::hash(data.as_ref());
    hex::encode(hash.as_bytes())[..10].to_string()
}
