//! Optimistic concurrency tokens

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Token taken at read time: modification time plus content hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Etag {
    pub modified: DateTime<Utc>,
    /// SHA-256 of the content, lowercase hex
    pub hash: String,
}

impl Etag {
    pub fn new(modified: DateTime<Utc>, content: &str) -> Self {
        Self {
            modified,
            hash: content_hash(content.as_bytes()),
        }
    }

    /// Content still hashes to this token
    pub fn matches(&self, content: &str) -> bool {
        self.hash == content_hash(content.as_bytes())
    }
}

pub fn content_hash(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable_hex() {
        assert_eq!(
            content_hash(b"hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn matches_on_content_only() {
        let etag = Etag::new(Utc::now(), "text");
        assert!(etag.matches("text"));
        assert!(!etag.matches("text\n"));
    }
}
