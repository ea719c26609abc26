//! SHA-256 digests of replica content
//!
//! Reports carry the digest of every resolved body so that two runs can be
//! compared without keeping the bodies around.

use sha2::{Digest, Sha256};

const PREFIX: &str = "sha256:";

/// Compute the digest of `content` in the form `"sha256:<hex>"`.
pub fn content_digest(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{}{:x}", PREFIX, hasher.finalize())
}

/// Abbreviate a digest produced by [`content_digest`] for log lines.
pub fn short_digest(digest: &str) -> &str {
    let hex = digest.strip_prefix(PREFIX).unwrap_or(digest);
    &hex[..hex.len().min(12)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_known_value() {
        assert_eq!(
            content_digest(b"hello world"),
            "sha256:b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn short_digest_strips_prefix() {
        let digest = content_digest(b"hello world");
        assert_eq!(short_digest(&digest), "b94d27b9934d");
        assert_eq!(short_digest("abc"), "abc");
    }
}
