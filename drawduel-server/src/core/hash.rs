//! State Hashing for Verification
//!
//! Provides deterministic hashing of game state for:
//! - Convergence checks between the room authority and every replica
//! - Log lines that identify a state without dumping it
//!
//! The hash input is always the canonical encoding from [`super::codec`],
//! prefixed by a domain separator and the encoded length.

use serde::Serialize;
use sha2::{Sha256, Digest};

use super::codec::{self, CodecError};

/// Hash output type (256 bits / 32 bytes)
pub type StateHash = [u8; 32];

/// Domain separator for game state hashes.
pub const GAME_STATE_DOMAIN: &[u8] = b"DRAWDUEL_STATE_V1";

/// Deterministic hasher for game state.
///
/// Wraps SHA-256 with a domain separator.
/// Order of updates is critical for determinism.
pub struct StateHasher {
    hasher: Sha256,
}

impl StateHasher {
    /// Create a new hasher with domain separator.
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        Self { hasher }
    }

    /// Update with a length-prefixed byte string.
    #[inline]
    pub fn update_framed(&mut self, bytes: &[u8]) {
        self.hasher.update((bytes.len() as u64).to_le_bytes());
        self.hasher.update(bytes);
    }

    /// Finalize and return the hash.
    pub fn finalize(self) -> StateHash {
        self.hasher.finalize().into()
    }
}

/// Hash the canonical encoding of `value` under `domain`.
///
/// Two values hash equal exactly when their canonical encodings are equal.
pub fn hash_canonical<T: Serialize>(domain: &[u8], value: &T) -> Result<StateHash, CodecError> {
    let bytes = codec::encode(value)?;
    let mut hasher = StateHasher::new(domain);
    hasher.update_framed(&bytes);
    Ok(hasher.finalize())
}

/// Short hex prefix of a hash, for log lines.
pub fn short_hex(hash: &StateHash) -> String {
    hex::encode(&hash[..8])
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_state_hasher_determinism() {
        let make_hash = || {
            let mut hasher = StateHasher::new(GAME_STATE_DOMAIN);
            hasher.update_framed(b"adam");
            hasher.update_framed(b"bob");
            hasher.finalize()
        };

        assert_eq!(make_hash(), make_hash());
    }

    #[test]
    fn test_hash_order_matters() {
        let hash1 = {
            let mut h = StateHasher::new(b"test");
            h.update_framed(&[1]);
            h.update_framed(&[2]);
            h.finalize()
        };

        let hash2 = {
            let mut h = StateHasher::new(b"test");
            h.update_framed(&[2]);
            h.update_framed(&[1]);
            h.finalize()
        };

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_domain_separation() {
        let data = vec![1u8, 2, 3, 4];

        let hash1 = hash_canonical(b"DOMAIN_A", &data).unwrap();
        let hash2 = hash_canonical(b"DOMAIN_B", &data).unwrap();

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_framing_separates_concatenations() {
        let hash1 = {
            let mut h = StateHasher::new(b"test");
            h.update_framed(b"ab");
            h.update_framed(b"c");
            h.finalize()
        };
        let hash2 = {
            let mut h = StateHasher::new(b"test");
            h.update_framed(b"a");
            h.update_framed(b"bc");
            h.finalize()
        };

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_hash_canonical_ignores_insertion_order() {
        let mut a = BTreeMap::new();
        a.insert(2u32, "bob".to_string());
        a.insert(1u32, "adam".to_string());

        let mut b = BTreeMap::new();
        b.insert(1u32, "adam".to_string());
        b.insert(2u32, "bob".to_string());

        let ha = hash_canonical(GAME_STATE_DOMAIN, &a).unwrap();
        let hb = hash_canonical(GAME_STATE_DOMAIN, &b).unwrap();
        assert_eq!(ha, hb);
    }

    #[test]
    fn test_short_hex() {
        let hash = [0xabu8; 32];
        assert_eq!(short_hex(&hash), "abababababababab");
    }
}
