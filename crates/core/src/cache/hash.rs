//! Request key generation.

use sha2::{Digest, Sha256};

/// Compute the cache key for a request.
///
/// The method is uppercased; the URL is expected to be canonical already
/// (fragment removed). Query strings are part of the key.
pub fn compute_request_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
