//! # DrawDuel Engine
//!
//! Authoritative game state for a real-time drawing-and-guessing game.
//! One room holds the canonical [`Game`]; clients observe and influence it
//! through a binary event protocol over WebSocket.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    DRAWDUEL SERVER                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── fixed.rs    - Q16.16 canvas coordinates                 │
//! │  ├── codec.rs    - Canonical bincode encoding                │
//! │  ├── rng.rs      - Deterministic Xorshift128+ PRNG           │
//! │  └── hash.rs     - State hashing for convergence checks      │
//! │                                                              │
//! │  game/           - Game logic (deterministic)                │
//! │  ├── state.rs    - Game, player and round state              │
//! │  ├── draw.rs     - Drawing operations                        │
//! │  ├── events.rs   - Client intents and server events          │
//! │  ├── reducer.rs  - advance / advance_all                     │
//! │  ├── round.rs    - Round timers, rotation, scoring           │
//! │  └── words.rs    - Word lists                                │
//! │                                                              │
//! │  network/        - Networking (non-deterministic)            │
//! │  ├── server.rs   - WebSocket server                          │
//! │  ├── protocol.rs - Frames, handshake, close codes            │
//! │  ├── room.rs     - Room authority and room tasks             │
//! │  └── auth.rs     - JWT and reconnection credentials          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Convergence Guarantee
//!
//! The `core/` and `game/` modules are **100% deterministic**:
//! - No floating-point state (canvas coordinates are fixed point)
//! - No HashMap (uses BTreeMap for sorted iteration)
//! - No system time dependencies (time is passed in)
//! - All randomness from seeded Xorshift128+, and only in the authority
//!
//! A client that applies the bootstrap `SetGame` and then every broadcast
//! batch in order holds a game whose canonical encoding, and therefore
//! state hash, equals the server's.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use crate::core::fixed::{Fixed, FIXED_ONE, FIXED_HALF, FIXED_SCALE};
pub use crate::core::rng::DeterministicRng;
pub use crate::core::hash::StateHash;
pub use game::events::{ClientEvent, ServerEvent, ServerEvents};
pub use game::reducer::{advance, advance_all, Transition};
pub use game::state::{Game, Player, PlayerId, Round};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
