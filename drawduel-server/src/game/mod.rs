//! Game Logic Module
//!
//! Everything that must agree byte for byte between server and clients.
//! 100% deterministic: no clocks, no I/O, randomness only through a
//! caller-supplied `DeterministicRng`.
//!
//! ## Module Structure
//!
//! - `state`: Game, player and round state
//! - `draw`: Drawing operations
//! - `events`: Client intents and authoritative server events
//! - `reducer`: Applies server events to a game
//! - `round`: Round timers, drawer rotation and scoring
//! - `words`: Word lists

pub mod state;
pub mod draw;
pub mod events;
pub mod reducer;
pub mod round;
pub mod words;

// Re-export key types
pub use state::{Game, Guess, Hint, Phase, Player, PlayerId, Round, WordChoice};
pub use draw::{BrushSize, ColorType, DrawOp};
pub use events::{ClientEvent, ErrorKind, ScoreKind, ServerEvent, ServerEvents};
pub use reducer::{advance, advance_all, Transition};
pub use round::RoundConfig;
