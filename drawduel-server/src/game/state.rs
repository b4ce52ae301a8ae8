//! Game State Definitions
//!
//! The canonical aggregate for one room: players plus the current round.
//! Uses BTreeMap for deterministic iteration order, so equal states encode
//! to identical bytes and hash identically on server and clients.

use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};

use crate::core::codec::CodecError;
use crate::core::hash::{hash_canonical, StateHash, GAME_STATE_DOMAIN};
use crate::game::draw::DrawOp;

// =============================================================================
// PLAYER
// =============================================================================

/// Player identifier, unique within a room for the room's lifetime.
///
/// Allocated monotonically by the room authority and never reused while
/// the player record exists.
pub type PlayerId = u32;

/// Per-player record.
///
/// A disconnected player keeps their record (and score) until an explicit
/// leave removes it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Display name
    pub name: String,
    /// Total score
    pub score: u32,
    /// Points earned while drawing
    pub drawer_score: u32,
    /// Points earned while guessing
    pub guesser_score: u32,
    /// Whether the player currently has a live connection
    pub connected: bool,
}

impl Player {
    /// Create a freshly joined, connected player.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            score: 0,
            drawer_score: 0,
            guesser_score: 0,
            connected: true,
        }
    }
}

// =============================================================================
// ROUND
// =============================================================================

/// Round phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Default)]
pub enum Phase {
    /// Drawer is picking between the easy and hard word
    #[default]
    ChooseWord,
    /// Drawer draws, everyone else guesses
    Drawing,
    /// Word revealed, waiting for the next round
    Reveal,
}

/// Which of the two offered words the drawer took.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Default)]
pub enum WordChoice {
    /// The easy word
    #[default]
    Easy,
    /// The hard word
    Hard,
}

/// A guess submitted by a non-drawer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guess {
    /// Who guessed
    pub guesser: PlayerId,
    /// Guess text as submitted
    pub guess: String,
    /// Number of draw ops the guesser had seen
    pub after_draw_ops: u32,
}

/// Hint revealed to guessers during a round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Hint {
    /// Length of the chosen word, in letters
    WordLength {
        /// Letter count
        letters: u32,
    },
    /// One letter of the chosen word
    Letter {
        /// Position in the word (in chars)
        index: u32,
        /// The letter at that position
        letter: char,
    },
}

/// One drawing round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    /// Monotonic round number
    pub round_id: u32,
    /// Player drawing this round
    pub drawer: PlayerId,
    /// Easy word offered to the drawer
    pub easy_word: String,
    /// Hard word offered to the drawer
    pub hard_word: String,
    /// Current phase
    pub phase: Phase,
    /// Word the drawer picked
    pub word_choice: WordChoice,
    /// Drawing so far, in order
    pub drawing: Vec<DrawOp>,
    /// Points earned by the drawer this round
    pub drawing_score: u32,
    /// Points earned by guessers this round
    pub guessing_score: u32,
    /// Guesses so far, in order
    pub guesses: Vec<Guess>,
    /// Hints revealed so far
    pub hints: Vec<Hint>,
    /// Unix epoch ms at which the current phase times out (0 = no deadline)
    pub ends_at: u64,
}

impl Round {
    /// Fresh round in `ChooseWord` with empty drawing, guesses and hints.
    pub fn new(
        round_id: u32,
        drawer: PlayerId,
        easy_word: impl Into<String>,
        hard_word: impl Into<String>,
    ) -> Self {
        Self {
            round_id,
            drawer,
            easy_word: easy_word.into(),
            hard_word: hard_word.into(),
            phase: Phase::ChooseWord,
            word_choice: WordChoice::Easy,
            drawing: Vec::new(),
            drawing_score: 0,
            guessing_score: 0,
            guesses: Vec::new(),
            hints: Vec::new(),
            ends_at: 0,
        }
    }

    /// The word currently selected by `word_choice`.
    pub fn word(&self) -> &str {
        match self.word_choice {
            WordChoice::Easy => &self.easy_word,
            WordChoice::Hard => &self.hard_word,
        }
    }

    /// Case-insensitive, whitespace-trimmed comparison against the word.
    pub fn is_correct_guess(&self, guess: &str) -> bool {
        guess.trim().to_lowercase() == self.word().to_lowercase()
    }

    /// Number of draw ops, saturated to u32.
    pub fn draw_op_count(&self) -> u32 {
        u32::try_from(self.drawing.len()).unwrap_or(u32::MAX)
    }
}

// =============================================================================
// GAME
// =============================================================================

/// Complete state of one room.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    /// All known players, keyed by id
    pub players: BTreeMap<PlayerId, Player>,
    /// Current round, absent before the first one
    pub round: Option<Round>,
}

impl Game {
    /// Empty game: no players, no round.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a player.
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    /// Connected players in id order.
    pub fn connected_players(&self) -> impl Iterator<Item = (PlayerId, &Player)> {
        self.players
            .iter()
            .filter(|(_, p)| p.connected)
            .map(|(id, p)| (*id, p))
    }

    /// Number of connected players.
    pub fn connected_count(&self) -> usize {
        self.connected_players().count()
    }

    /// True when nobody is connected.
    pub fn is_empty(&self) -> bool {
        self.connected_count() == 0
    }

    /// Id of the current round, if any.
    pub fn round_id(&self) -> Option<u32> {
        self.round.as_ref().map(|r| r.round_id)
    }

    /// SHA-256 of the canonical encoding.
    pub fn state_hash(&self) -> Result<StateHash, CodecError> {
        hash_canonical(GAME_STATE_DOMAIN, self)
    }
}

// =============================================================================
// TESTS
// =============================================================================
