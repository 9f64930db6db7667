use sha2::{Digest, Sha256};

/// SHA-256 of the raw fetched bytes, lowercase hex.
///
/// Always computed on the bytes as downloaded, before any transcoding, so the
/// same source file hashes identically regardless of output settings.
pub fn content_hash(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
