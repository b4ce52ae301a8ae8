//! Core deterministic primitives.
//!
//! Everything the reducer and the room authority need to agree on bytes:
//! fixed-point canvas coordinates, the canonical codec, state hashing and
//! the seeded RNG used for word selection.

pub mod fixed;
pub mod rng;
pub mod hash;
pub mod codec;

// Re-export core types
pub use fixed::{Fixed, FIXED_ONE, FIXED_HALF, FIXED_SCALE};
pub use rng::DeterministicRng;
pub use hash::{StateHash, StateHasher};
pub use codec::CodecError;
