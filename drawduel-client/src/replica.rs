//! Client Replica
//!
//! Local copy of a room's game, driven only by server batches. The replica
//! runs the same reducer as the room authority, so after the bootstrap and
//! every later batch its state hash matches the server's.

use drawduel::core::codec::CodecError;
use drawduel::core::hash::{short_hex, StateHash};
use drawduel::game::{
    advance, ErrorKind, Game, Phase, Player, PlayerId, Round, ServerEvent, ServerEvents,
};
use tracing::{debug, trace};

/// Errors surfaced while applying server batches.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplicaError {
    /// The first batch did not start with `SetGame`.
    #[error("first batch must start with SetGame")]
    MissingBootstrap,

    /// The server reported an error (usually a join rejection).
    #[error("rejected by server ({kind:?}): {message}")]
    Rejected {
        /// Error category
        kind: ErrorKind,
        /// Human readable detail
        message: String,
    },
}

/// Game mirror for one connection.
#[derive(Debug, Default)]
pub struct Replica {
    game: Game,
    player_id: Option<PlayerId>,
}

impl Replica {
    /// Empty replica awaiting its bootstrap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one batch in order. Returns how many events it held.
    ///
    /// Events are never reordered, skipped or deduplicated. An `Error` event
    /// is reported after the whole batch has been applied.
    pub fn apply(&mut self, batch: &ServerEvents) -> Result<usize, ReplicaError> {
        if !self.is_bootstrapped() {
            match batch.first() {
                Some(ServerEvent::SetGame { .. }) => {}
                _ => return Err(rejection(batch).unwrap_or(ReplicaError::MissingBootstrap)),
            }
        }

        for event in batch {
            if let ServerEvent::SetGame { player_id, .. } = event {
                debug!(player_id, "Bootstrapped");
                self.player_id = Some(*player_id);
            }
            let transition = advance(&mut self.game, event);
            trace!(event = event.name(), ?transition, "Applied");
        }

        match rejection(batch) {
            Some(err) => Err(err),
            None => Ok(batch.len()),
        }
    }

    /// Whether a `SetGame` has been received.
    pub fn is_bootstrapped(&self) -> bool {
        self.player_id.is_some()
    }

    /// The mirrored game.
    pub fn game(&self) -> &Game {
        &self.game
    }

    /// Seat assigned by the server.
    pub fn player_id(&self) -> Option<PlayerId> {
        self.player_id
    }

    /// This connection's player record.
    pub fn me(&self) -> Option<&Player> {
        self.player_id.and_then(|id| self.game.player(id))
    }

    /// Current round, if any.
    pub fn round(&self) -> Option<&Round> {
        self.game.round.as_ref()
    }

    /// Whether this player draws the current round.
    pub fn is_drawer(&self) -> bool {
        match (self.round(), self.player_id) {
            (Some(round), Some(id)) => round.drawer == id,
            _ => false,
        }
    }

    /// Whether guesses are accepted right now.
    pub fn can_guess(&self) -> bool {
        self.round().is_some_and(|r| r.phase == Phase::Drawing) && !self.is_drawer()
    }

    /// SHA-256 of the canonical encoding of the game.
    pub fn state_hash(&self) -> Result<StateHash, CodecError> {
        self.game.state_hash()
    }

    /// Short hex form of [`Replica::state_hash`], for logs.
    pub fn short_hash(&self) -> String {
        self.state_hash().map(|h| short_hex(&h)).unwrap_or_else(|_| "?".into())
    }
}

fn rejection(batch: &ServerEvents) -> Option<ReplicaError> {
    batch.iter().find_map(|event| match event {
        ServerEvent::Error { kind, message } => Some(ReplicaError::Rejected {
            kind: *kind,
            message: message.clone(),
        }),
        _ => None,
    })
}

// =============================================================================
// TESTS
// =============================================================================
