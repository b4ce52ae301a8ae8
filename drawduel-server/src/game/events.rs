//! Game Events
//!
//! The two event vocabularies of the protocol:
//!
//! - [`ClientEvent`]: an intent sent by one player. Never applied directly;
//!   the room authority validates it and translates it.
//! - [`ServerEvent`]: an authoritative fact. Applied by the reducer on the
//!   server and, in the same order, on every client.
//!
//! Server events travel in [`ServerEvents`] batches; a batch is the unit of
//! broadcast and is always applied whole and in order.

use serde::{Serialize, Deserialize};

use crate::game::draw::DrawOp;
use crate::game::state::{Game, Hint, Phase, PlayerId, WordChoice};

// =============================================================================
// CLIENT -> SERVER
// =============================================================================

/// Which score counter a self-reported increase targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScoreKind {
    /// Total score
    Total,
    /// Drawer score
    Drawer,
    /// Guesser score
    Guesser,
}

/// Player intent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientEvent {
    /// Change display name.
    Rename {
        /// New name (trimmed by the authority)
        name: String,
    },
    /// Self-reported score increase, capped by room config.
    IncreaseScore {
        /// Counter to increase
        kind: ScoreKind,
        /// Amount
        by: u32,
    },
    /// Drawing input from the drawer.
    DrawOp {
        /// The op
        op: DrawOp,
    },
    /// Drawer picks a word.
    ChooseWord {
        /// Easy or hard
        choice: WordChoice,
    },
    /// Guess at the current word.
    GuessWord {
        /// Guess text
        guess: String,
        /// Draw ops the guesser had seen when guessing
        after_draw_ops: u32,
    },
    /// Like a round's drawing.
    LikeRound {
        /// Round being liked
        round_id: u32,
    },
    /// Leave the room for good.
    Leave,
}

// =============================================================================
// SERVER -> CLIENT
// =============================================================================

/// Reason attached to an [`ServerEvent::Error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Credential belongs to a player who is already connected.
    AlreadyConnected,
    /// Room is at its player limit.
    RoomFull,
    /// Server is at its connection or room limit.
    ServerOverloaded,
    /// Token failed validation.
    InvalidToken,
    /// Token has expired.
    TokenExpired,
    /// Malformed frame or message.
    ProtocolViolation,
    /// Internal error.
    InternalError,
}

/// Authoritative fact.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerEvent {
    /// Replace the whole game (bootstrap).
    SetGame {
        /// Id assigned to the receiving connection
        player_id: PlayerId,
        /// Full state
        game: Game,
    },
    /// Player joined (upsert).
    PlayerJoin {
        /// Player id
        id: PlayerId,
        /// Display name
        name: String,
    },
    /// Player left for good.
    PlayerLeave {
        /// Player id
        id: PlayerId,
    },
    /// Known player reconnected.
    PlayerConnect {
        /// Player id
        id: PlayerId,
    },
    /// Player lost their connection.
    PlayerDisconnect {
        /// Player id
        id: PlayerId,
    },
    /// Player changed name.
    PlayerRename {
        /// Player id
        id: PlayerId,
        /// New name
        name: String,
    },
    /// Total score increase.
    PlayerIncreaseScore {
        /// Player id
        id: PlayerId,
        /// Amount
        by: u32,
    },
    /// Drawer score increase.
    PlayerIncreaseDrawerScore {
        /// Player id
        id: PlayerId,
        /// Amount
        by: u32,
    },
    /// Guesser score increase.
    PlayerIncreaseGuesserScore {
        /// Player id
        id: PlayerId,
        /// Amount
        by: u32,
    },
    /// Drawer appended a draw op.
    PlayerDrawOp {
        /// Drawer id
        id: PlayerId,
        /// The op
        op: DrawOp,
    },
    /// Drawer picked a word.
    PlayerChooseWord {
        /// Drawer id
        drawer: PlayerId,
        /// Easy or hard
        choice: WordChoice,
    },
    /// A guess was made.
    PlayerGuessWord {
        /// Guesser id
        guesser: PlayerId,
        /// Guess text
        guess: String,
        /// Draw ops the guesser had seen
        after_draw_ops: u32,
    },
    /// A player liked a round. Carries no state.
    PlayerLikeRound {
        /// Who liked it
        liker: PlayerId,
        /// Which round
        round_id: u32,
    },
    /// Start a new round.
    NewRound {
        /// New round id
        round_id: u32,
        /// Drawer for this round
        drawer: PlayerId,
        /// Easy word offered
        easy_word: String,
        /// Hard word offered
        hard_word: String,
    },
    /// Round moved to a new phase.
    RoundPhase {
        /// Round id
        round_id: u32,
        /// New phase
        phase: Phase,
        /// Deadline of the new phase (unix ms, 0 = none)
        ends_at: u64,
    },
    /// Hint revealed.
    RoundHint {
        /// Round id
        round_id: u32,
        /// The hint
        hint: Hint,
    },
    /// Per-round score increase.
    RoundScore {
        /// Round id
        round_id: u32,
        /// Added to the drawing score
        drawing: u32,
        /// Added to the guessing score
        guessing: u32,
    },
    /// Error addressed to one connection. Carries no state.
    Error {
        /// Reason
        kind: ErrorKind,
        /// Human-readable detail
        message: String,
    },
}

impl ServerEvent {
    /// Variant name, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::SetGame { .. } => "SetGame",
            ServerEvent::PlayerJoin { .. } => "PlayerJoin",
            ServerEvent::PlayerLeave { .. } => "PlayerLeave",
            ServerEvent::PlayerConnect { .. } => "PlayerConnect",
            ServerEvent::PlayerDisconnect { .. } => "PlayerDisconnect",
            ServerEvent::PlayerRename { .. } => "PlayerRename",
            ServerEvent::PlayerIncreaseScore { .. } => "PlayerIncreaseScore",
            ServerEvent::PlayerIncreaseDrawerScore { .. } => "PlayerIncreaseDrawerScore",
            ServerEvent::PlayerIncreaseGuesserScore { .. } => "PlayerIncreaseGuesserScore",
            ServerEvent::PlayerDrawOp { .. } => "PlayerDrawOp",
            ServerEvent::PlayerChooseWord { .. } => "PlayerChooseWord",
            ServerEvent::PlayerGuessWord { .. } => "PlayerGuessWord",
            ServerEvent::PlayerLikeRound { .. } => "PlayerLikeRound",
            ServerEvent::NewRound { .. } => "NewRound",
            ServerEvent::RoundPhase { .. } => "RoundPhase",
            ServerEvent::RoundHint { .. } => "RoundHint",
            ServerEvent::RoundScore { .. } => "RoundScore",
            ServerEvent::Error { .. } => "Error",
        }
    }

    /// Build an error event.
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        ServerEvent::Error { kind, message: message.into() }
    }
}

/// Ordered batch of server events.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerEvents(pub Vec<ServerEvent>);

impl ServerEvents {
    /// Empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event.
    pub fn push(&mut self, event: ServerEvent) {
        self.0.push(event);
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the batch holds no events.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in order.
    pub fn iter(&self) -> std::slice::Iter<'_, ServerEvent> {
        self.0.iter()
    }

    /// First event, if any.
    pub fn first(&self) -> Option<&ServerEvent> {
        self.0.first()
    }
}

impl From<Vec<ServerEvent>> for ServerEvents {
    fn from(events: Vec<ServerEvent>) -> Self {
        Self(events)
    }
}

impl From<ServerEvent> for ServerEvents {
    fn from(event: ServerEvent) -> Self {
        Self(vec![event])
    }
}

impl<'a> IntoIterator for &'a ServerEvents {
    type Item = &'a ServerEvent;
    type IntoIter = std::slice::Iter<'a, ServerEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// =============================================================================
// TESTS
// =============================================================================
