// Message preprocessing to the fixed digest length signed by the scheme

use sha2::{Digest, Sha256};

use crate::symmetric::MESSAGE_DIGEST_LEN;

const MESSAGE_DOMAIN: &[u8] = b"hashsig-engine/message/v1";

/// Converts arbitrary-length messages into 32-byte digests
pub struct MessagePreprocessor;

impl MessagePreprocessor {
    /// `SHA-256(domain || len(message) as u64 BE || message)`
    ///
    /// Preconditions: None (accepts any byte slice)
    /// Postconditions: Returns exactly 32 bytes
    /// Invariants: Same input always produces same output
    pub fn preprocess(message: &[u8]) -> [u8; MESSAGE_DIGEST_LEN] {
        let mut hasher = Sha256::new();
        hasher.update(MESSAGE_DOMAIN);
        hasher.update((message.len() as u64).to_be_bytes());
        hasher.update(message);
        hasher.finalize().into()
    }
}
