//! Room Authority
//!
//! One room owns one canonical [`Game`]. All mutation happens in a single
//! task per room that receives [`RoomCommand`]s over an mpsc channel, so
//! commands are serialized without locks. For every command the room:
//!
//! 1. validates the intent and translates it into canonical server events,
//! 2. applies them through the reducer, keeping only those not dropped,
//! 3. encodes the kept events as one batch and broadcasts it to every
//!    subscribed connection, the originator included.
//!
//! [`RoomAuthority`] is the synchronous core (no I/O, time passed in) and
//! [`run_room`] is the task that drives it.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, RwLock};
use tracing::{debug, info, instrument, trace, warn};

use crate::core::hash::short_hex;
use crate::core::rng::DeterministicRng;
use crate::game::events::{ClientEvent, ErrorKind, ScoreKind, ServerEvent, ServerEvents};
use crate::game::reducer::advance;
use crate::game::round::{self, RoundConfig};
use crate::game::state::{Game, Phase, PlayerId};
use crate::network::auth::Credential;
use crate::network::env_or;

/// Encoded, finalized batch shared by every subscriber.
pub type EncodedBatch = Arc<[u8]>;

/// Longest accepted display name (chars).
pub const MAX_NAME_CHARS: usize = 32;

/// Longest accepted guess (chars).
pub const MAX_GUESS_CHARS: usize = 64;

/// Draw ops accepted per round. Keeps the bootstrap `SetGame` far below
/// the codec's message limit.
pub const MAX_DRAW_OPS_PER_ROUND: usize = 20_000;

/// Wrong guesses recorded per round. A correct guess is always accepted.
pub const MAX_GUESSES_PER_ROUND: usize = 1_000;

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Per-room configuration.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Players (connected or not) a room holds.
    pub max_players: usize,
    /// Cap on a single self-reported score increase.
    pub max_self_score_increase: u32,
    /// How long a room with nobody connected keeps its state.
    pub empty_room_reset_after: Duration,
    /// Interval of the room's timer tick.
    pub tick_interval: Duration,
    /// Capacity of the broadcast buffer. A subscriber lagging further is dropped.
    pub broadcast_capacity: usize,
    /// Capacity of the command queue.
    pub command_capacity: usize,
    /// Round timing and scoring.
    pub round: RoundConfig,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_players: 16,
            max_self_score_increase: 100,
            empty_room_reset_after: Duration::from_secs(60),
            tick_interval: Duration::from_millis(200),
            broadcast_capacity: 2048,
            command_capacity: 256,
            round: RoundConfig::default(),
        }
    }
}

impl RoomConfig {
    /// Create config from `DRAWDUEL_*` environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            max_players: env_or("DRAWDUEL_MAX_PLAYERS", d.max_players),
            max_self_score_increase: env_or(
                "DRAWDUEL_MAX_SELF_SCORE_INCREASE",
                d.max_self_score_increase,
            ),
            empty_room_reset_after: Duration::from_millis(env_or(
                "DRAWDUEL_EMPTY_ROOM_RESET_MS",
                d.empty_room_reset_after.as_millis() as u64,
            )),
            tick_interval: Duration::from_millis(env_or(
                "DRAWDUEL_ROOM_TICK_MS",
                d.tick_interval.as_millis() as u64,
            )),
            broadcast_capacity: env_or("DRAWDUEL_BROADCAST_CAPACITY", d.broadcast_capacity),
            command_capacity: env_or("DRAWDUEL_COMMAND_CAPACITY", d.command_capacity),
            round: RoundConfig {
                min_players: env_or("DRAWDUEL_MIN_PLAYERS", d.round.min_players),
                choose_word_ms: env_or("DRAWDUEL_CHOOSE_WORD_MS", d.round.choose_word_ms),
                drawing_ms: env_or("DRAWDUEL_DRAWING_MS", d.round.drawing_ms),
                reveal_ms: env_or("DRAWDUEL_REVEAL_MS", d.round.reveal_ms),
                easy_points: env_or("DRAWDUEL_EASY_POINTS", d.round.easy_points),
                hard_points: env_or("DRAWDUEL_HARD_POINTS", d.round.hard_points),
            },
        }
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Reasons a connection is refused a seat.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JoinError {
    /// The credential's player already has a live connection.
    #[error("player is already connected")]
    AlreadyConnected,

    /// The room is at `max_players`.
    #[error("room is full")]
    RoomFull,

    /// The server is at its room limit.
    #[error("too many rooms")]
    TooManyRooms,

    /// The room task is gone.
    #[error("room closed")]
    RoomClosed,

    /// Bootstrap could not be encoded.
    #[error("internal error: {0}")]
    Internal(String),
}

impl JoinError {
    /// Error kind sent to the rejected client.
    pub fn kind(&self) -> ErrorKind {
        match self {
            JoinError::AlreadyConnected => ErrorKind::AlreadyConnected,
            JoinError::RoomFull => ErrorKind::RoomFull,
            JoinError::TooManyRooms => ErrorKind::ServerOverloaded,
            JoinError::RoomClosed | JoinError::Internal(_) => ErrorKind::InternalError,
        }
    }
}

// =============================================================================
// AUTHORITY
// =============================================================================

/// Result of a successful connect.
#[derive(Debug)]
pub struct Admission {
    /// Seat assigned to the connection.
    pub player_id: PlayerId,
    /// Whether an existing player was resumed.
    pub reconnected: bool,
    /// Events to broadcast (PlayerJoin or PlayerConnect, maybe a rename).
    pub broadcast: ServerEvents,
}

/// Synchronous core of a room. Owns the canonical game.
pub struct RoomAuthority {
    name: String,
    config: RoomConfig,
    game: Game,
    credentials: BTreeMap<Credential, PlayerId>,
    /// Seats that can never be resumed.
    anonymous: BTreeSet<PlayerId>,
    next_player_id: PlayerId,
    rng: DeterministicRng,
    empty_since: Option<u64>,
}

impl RoomAuthority {
    /// Create an empty room.
    pub fn new(name: impl Into<String>, config: RoomConfig, rng: DeterministicRng) -> Self {
        Self {
            name: name.into(),
            config,
            game: Game::new(),
            credentials: BTreeMap::new(),
            anonymous: BTreeSet::new(),
            next_player_id: 0,
            rng,
            empty_since: None,
        }
    }

    /// Room name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The canonical game.
    pub fn game(&self) -> &Game {
        &self.game
    }

    /// Room configuration.
    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Seat a connection.
    ///
    /// A known credential resumes its player; otherwise a fresh id is
    /// allocated. `name` is used when valid, else `playerNN`. A full room
    /// frees the seat of a disconnected anonymous player, if there is one.
    pub fn connect(
        &mut self,
        credential: &Credential,
        name: Option<&str>,
    ) -> Result<Admission, JoinError> {
        let requested = name.and_then(valid_name);

        if let Some(&id) = self.credentials.get(credential) {
            if let Some(player) = self.game.player(id) {
                if player.connected {
                    return Err(JoinError::AlreadyConnected);
                }
                let mut events = vec![ServerEvent::PlayerConnect { id }];
                if let Some(name) = requested.filter(|n| *n != player.name) {
                    events.push(ServerEvent::PlayerRename { id, name });
                }
                self.empty_since = None;
                return Ok(Admission {
                    player_id: id,
                    reconnected: true,
                    broadcast: self.apply(events),
                });
            }
            // Player record is gone; treat as new
            self.credentials.remove(credential);
        }

        let mut events = Vec::new();
        if self.game.players.len() >= self.config.max_players {
            let Some(stale) = self.reclaimable_seat() else {
                return Err(JoinError::RoomFull);
            };
            debug!(room = %self.name, player_id = stale, "Reclaiming anonymous seat");
            self.anonymous.remove(&stale);
            events.push(ServerEvent::PlayerLeave { id: stale });
        }

        let id = self.next_player_id;
        self.next_player_id = self.next_player_id.wrapping_add(1);
        if credential.can_reconnect() {
            self.credentials.insert(credential.clone(), id);
        } else {
            self.anonymous.insert(id);
        }

        let name = requested.unwrap_or_else(|| format!("player{id:02}"));
        events.push(ServerEvent::PlayerJoin { id, name });
        self.empty_since = None;
        Ok(Admission {
            player_id: id,
            reconnected: false,
            broadcast: self.apply(events),
        })
    }

    /// Undo an admission whose bootstrap could not be delivered.
    ///
    /// A fresh seat is removed again, a resumed one goes back to disconnected.
    pub fn revoke(&mut self, admission: &Admission, now_ms: u64) -> ServerEvents {
        let id = admission.player_id;
        let event = if admission.reconnected {
            ServerEvent::PlayerDisconnect { id }
        } else {
            self.credentials.retain(|_, seat| *seat != id);
            self.anonymous.remove(&id);
            ServerEvent::PlayerLeave { id }
        };
        let batch = self.apply(vec![event]);
        self.note_if_empty(now_ms);
        batch
    }

    /// Lowest disconnected anonymous seat.
    fn reclaimable_seat(&self) -> Option<PlayerId> {
        self.anonymous
            .iter()
            .copied()
            .find(|id| self.game.player(*id).is_some_and(|p| !p.connected))
    }

    /// Bootstrap batch for a freshly seated connection.
    pub fn bootstrap(&self, player_id: PlayerId) -> ServerEvents {
        ServerEvent::SetGame { player_id, game: self.game.clone() }.into()
    }

    /// Validate and translate one intent.
    pub fn client_event(&mut self, player_id: PlayerId, event: ClientEvent, now_ms: u64) -> ServerEvents {
        let events = self.translate(player_id, event, now_ms);
        if events.is_empty() {
            return ServerEvents::new();
        }
        self.apply(events)
    }

    /// A connection went away. Never removes the player.
    pub fn disconnect(&mut self, player_id: PlayerId, now_ms: u64) -> ServerEvents {
        let batch = self.apply(vec![ServerEvent::PlayerDisconnect { id: player_id }]);
        self.note_if_empty(now_ms);
        batch
    }

    /// Drive round timers and the empty-room reset.
    pub fn tick(&mut self, now_ms: u64) -> ServerEvents {
        if self.game.is_empty() {
            self.note_if_empty(now_ms);
            let reset_after = self.config.empty_room_reset_after.as_millis() as u64;
            if let Some(since) = self.empty_since {
                let dirty = self.game != Game::new() || !self.credentials.is_empty() || !self.anonymous.is_empty();
                if dirty && now_ms.saturating_sub(since) >= reset_after {
                    info!(room = %self.name, "Resetting empty room");
                    self.game = Game::new();
                    self.credentials.clear();
                    self.anonymous.clear();
                }
            }
            return ServerEvents::new();
        }

        let events = round::on_tick(&self.game, &self.config.round, &mut self.rng, now_ms);
        if events.is_empty() {
            return ServerEvents::new();
        }
        self.apply(events)
    }

    /// Nobody has been connected for `empty_room_reset_after`.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        let reset_after = self.config.empty_room_reset_after.as_millis() as u64;
        self.game.is_empty()
            && self
                .empty_since
                .is_some_and(|since| now_ms.saturating_sub(since) >= reset_after)
    }

    fn note_if_empty(&mut self, now_ms: u64) {
        if self.game.is_empty() {
            self.empty_since.get_or_insert(now_ms);
        }
    }

    /// Apply events in order; keep the ones the reducer did not drop.
    fn apply(&mut self, events: Vec<ServerEvent>) -> ServerEvents {
        let mut kept = ServerEvents::new();
        for event in events {
            if advance(&mut self.game, &event).is_kept() {
                kept.push(event);
            } else {
                debug!(room = %self.name, event = event.name(), "Dropped event");
            }
        }
        kept
    }

    fn translate(&mut self, player_id: PlayerId, event: ClientEvent, now_ms: u64) -> Vec<ServerEvent> {
        if self.game.player(player_id).is_none() {
            return Vec::new();
        }
        let round_cfg = &self.config.round;

        match event {
            ClientEvent::Rename { name } => match valid_name(&name) {
                Some(name) => vec![ServerEvent::PlayerRename { id: player_id, name }],
                None => Vec::new(),
            },
            ClientEvent::IncreaseScore { kind, by } => {
                if by == 0 || by > self.config.max_self_score_increase {
                    return Vec::new();
                }
                let id = player_id;
                vec![match kind {
                    ScoreKind::Total => ServerEvent::PlayerIncreaseScore { id, by },
                    ScoreKind::Drawer => ServerEvent::PlayerIncreaseDrawerScore { id, by },
                    ScoreKind::Guesser => ServerEvent::PlayerIncreaseGuesserScore { id, by },
                }]
            }
            ClientEvent::DrawOp { op } => match self.game.round.as_ref() {
                Some(r) if r.phase == Phase::Drawing && r.drawer == player_id && op.is_on_canvas() => {
                    if r.drawing.len() >= MAX_DRAW_OPS_PER_ROUND {
                        trace!(room = %self.name, round = r.round_id, "Drawing is full");
                        return Vec::new();
                    }
                    vec![ServerEvent::PlayerDrawOp { id: player_id, op }]
                }
                _ => Vec::new(),
            },
            ClientEvent::ChooseWord { choice } => match self.game.round.as_ref() {
                Some(r) if r.phase == Phase::ChooseWord && r.drawer == player_id => {
                    round::choose_word(r, choice, round_cfg, now_ms)
                }
                _ => Vec::new(),
            },
            ClientEvent::GuessWord { guess, after_draw_ops } => {
                let Some(r) = self.game.round.as_ref() else {
                    return Vec::new();
                };
                let guess = guess.trim();
                let chars = guess.chars().count();
                if r.phase != Phase::Drawing || r.drawer == player_id || chars == 0 || chars > MAX_GUESS_CHARS {
                    return Vec::new();
                }
                let correct = r.is_correct_guess(guess);
                if !correct && r.guesses.len() >= MAX_GUESSES_PER_ROUND {
                    return Vec::new();
                }
                let mut events = vec![ServerEvent::PlayerGuessWord {
                    guesser: player_id,
                    guess: guess.to_string(),
                    after_draw_ops: after_draw_ops.min(r.draw_op_count()),
                }];
                if correct {
                    debug!(room = %self.name, round = r.round_id, guesser = player_id, "Correct guess");
                    events.extend(round::correct_guess(r, player_id, round_cfg, now_ms));
                }
                events
            }
            ClientEvent::LikeRound { round_id } => match self.game.round_id() {
                Some(current) if current == round_id => {
                    vec![ServerEvent::PlayerLikeRound { liker: player_id, round_id }]
                }
                _ => Vec::new(),
            },
            ClientEvent::Leave => {
                self.credentials.retain(|_, id| *id != player_id);
                self.anonymous.remove(&player_id);
                let mut events = vec![ServerEvent::PlayerLeave { id: player_id }];
                if let Some(r) = self.game.round.as_ref().filter(|r| r.drawer == player_id) {
                    if let Some(end) = round::on_drawer_left(r, round_cfg, now_ms) {
                        warn!(room = %self.name, round = r.round_id, drawer = player_id, "Drawer left mid-round, ending round");
                        events.push(end);
                    }
                }
                events
            }
        }
    }
}

/// Trimmed name of 1..=32 chars, or `None`.
fn valid_name(name: &str) -> Option<String> {
    let name = name.trim();
    let chars = name.chars().count();
    if chars == 0 || chars > MAX_NAME_CHARS || name.chars().any(char::is_control) {
        return None;
    }
    Some(name.to_string())
}

// =============================================================================
// ROOM TASK
// =============================================================================

/// Seat granted by the room task.
#[derive(Debug)]
pub struct Joined {
    /// Assigned player id.
    pub player_id: PlayerId,
    /// Encoded `[SetGame]` batch; must be the first message sent.
    pub bootstrap: EncodedBatch,
    /// Every batch broadcast after the bootstrap was taken.
    pub updates: broadcast::Receiver<EncodedBatch>,
}

/// Commands accepted by a room task.
#[derive(Debug)]
pub enum RoomCommand {
    /// Seat a new connection.
    Connect {
        /// Reconnection credential.
        credential: Credential,
        /// Requested display name.
        name: Option<String>,
        /// Where to send the outcome.
        reply: oneshot::Sender<Result<Joined, JoinError>>,
    },
    /// Intent from a seated connection.
    Event {
        /// Sender.
        player_id: PlayerId,
        /// The intent.
        event: ClientEvent,
    },
    /// A seated connection closed.
    Disconnect {
        /// Player whose connection closed.
        player_id: PlayerId,
    },
}

/// Cloneable handle to a running room.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    name: Arc<str>,
    commands: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// Room name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ask for a seat.
    pub async fn connect(&self, credential: Credential, name: Option<String>) -> Result<Joined, JoinError> {
        let (reply, outcome) = oneshot::channel();
        self.commands
            .send(RoomCommand::Connect { credential, name, reply })
            .await
            .map_err(|_| JoinError::RoomClosed)?;
        outcome.await.map_err(|_| JoinError::RoomClosed)?
    }

    /// Forward an intent. Returns false if the room is gone.
    pub async fn send_event(&self, player_id: PlayerId, event: ClientEvent) -> bool {
        self.commands.send(RoomCommand::Event { player_id, event }).await.is_ok()
    }

    /// Report a closed connection.
    pub async fn disconnect(&self, player_id: PlayerId) {
        let _ = self.commands.send(RoomCommand::Disconnect { player_id }).await;
    }

    /// Whether the room task is still running.
    pub fn is_open(&self) -> bool {
        !self.commands.is_closed()
    }
}

/// Spawn a room task.
pub fn spawn_room(name: &str, config: RoomConfig) -> RoomHandle {
    let (tx, rx) = mpsc::channel(config.command_capacity.max(1));
    let nonce = *uuid::Uuid::new_v4().as_bytes();
    let authority = RoomAuthority::new(name, config, DeterministicRng::for_room(name, &nonce));
    tokio::spawn(run_room(authority, rx));
    RoomHandle { name: Arc::from(name), commands: tx }
}

/// Current unix time in milliseconds.
pub fn now_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

/// Room control loop. Exits when every handle is dropped, or once the room
/// has had nobody connected for `empty_room_reset_after`.
#[instrument(skip_all, fields(room = %authority.name()))]
pub async fn run_room(mut authority: RoomAuthority, mut commands: mpsc::Receiver<RoomCommand>) {
    let (updates_tx, _) = broadcast::channel::<EncodedBatch>(authority.config().broadcast_capacity.max(1));
    let mut ticker = tokio::time::interval(authority.config().tick_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    info!("Room opened");

    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else { break };
                match command {
                    RoomCommand::Connect { credential, name, reply } => {
                        let outcome = seat(&mut authority, &updates_tx, &credential, name.as_deref());
                        if let Err(e) = &outcome {
                            debug!("Join rejected: {}", e);
                        }
                        let _ = reply.send(outcome);
                    }
                    RoomCommand::Event { player_id, event } => {
                        let batch = authority.client_event(player_id, event, now_ms());
                        publish(&authority, &updates_tx, &batch);
                    }
                    RoomCommand::Disconnect { player_id } => {
                        let batch = authority.disconnect(player_id, now_ms());
                        publish(&authority, &updates_tx, &batch);
                    }
                }
            }
            _ = ticker.tick() => {
                let now = now_ms();
                let batch = authority.tick(now);
                publish(&authority, &updates_tx, &batch);
                if authority.is_expired(now) {
                    info!("Room idle, closing");
                    break;
                }
            }
        }
    }

    info!("Room closed");
}

/// Connect, broadcast, then subscribe and hand out the bootstrap.
fn seat(
    authority: &mut RoomAuthority,
    updates_tx: &broadcast::Sender<EncodedBatch>,
    credential: &Credential,
    name: Option<&str>,
) -> Result<Joined, JoinError> {
    let admission = authority.connect(credential, name)?;
    publish(authority, updates_tx, &admission.broadcast);

    let updates = updates_tx.subscribe();
    let bootstrap = match authority.bootstrap(admission.player_id).to_bytes() {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(player_id = admission.player_id, "Failed to encode bootstrap: {}", e);
            let rollback = authority.revoke(&admission, now_ms());
            publish(authority, updates_tx, &rollback);
            return Err(JoinError::Internal(e.to_string()));
        }
    };

    info!(
        player_id = admission.player_id,
        reconnected = admission.reconnected,
        players = authority.game().players.len(),
        "Player seated"
    );
    Ok(Joined { player_id: admission.player_id, bootstrap: Arc::from(bootstrap), updates })
}

fn publish(authority: &RoomAuthority, updates_tx: &broadcast::Sender<EncodedBatch>, batch: &ServerEvents) {
    if batch.is_empty() {
        return;
    }
    let bytes = match batch.to_bytes() {
        Ok(b) => b,
        Err(e) => {
            tracing::error!("Failed to encode batch: {}", e);
            return;
        }
    };

    if tracing::enabled!(tracing::Level::TRACE) {
        let hash = authority.game().state_hash().map(|h| short_hex(&h)).unwrap_or_default();
        match batch.to_json() {
            Ok(json) => trace!(state = %hash, batch = %json, "Broadcast"),
            Err(_) => trace!(state = %hash, events = batch.len(), "Broadcast"),
        }
    }

    // No receivers is fine: nobody is listening
    let _ = updates_tx.send(Arc::from(bytes));
}

// =============================================================================
// ROOM MANAGER
// =============================================================================

/// Registry of running rooms, created on first join.
pub struct RoomManager {
    config: RoomConfig,
    max_rooms: usize,
    rooms: RwLock<BTreeMap<String, RoomHandle>>,
}

impl RoomManager {
    /// Create a manager.
    pub fn new(config: RoomConfig, max_rooms: usize) -> Self {
        Self {
            config,
            max_rooms,
            rooms: RwLock::new(BTreeMap::new()),
        }
    }

    /// Look up a room, spawning it if needed.
    pub async fn get_or_create(&self, name: &str) -> Result<RoomHandle, JoinError> {
        if let Some(handle) = self.rooms.read().await.get(name).filter(|h| h.is_open()) {
            return Ok(handle.clone());
        }

        let mut rooms = self.rooms.write().await;
        rooms.retain(|_, h| h.is_open());
        if let Some(handle) = rooms.get(name) {
            return Ok(handle.clone());
        }
        if rooms.len() >= self.max_rooms {
            warn!("Room limit reached, refusing {}", name);
            return Err(JoinError::TooManyRooms);
        }

        let handle = spawn_room(name, self.config.clone());
        rooms.insert(name.to_string(), handle.clone());
        debug!(rooms = rooms.len(), "Opened room {}", name);
        Ok(handle)
    }

    /// Seat a connection in `room`, creating the room if needed.
    ///
    /// A room that closed itself between lookup and connect is replaced once.
    pub async fn join(
        &self,
        room: &str,
        credential: Credential,
        name: Option<String>,
    ) -> Result<(RoomHandle, Joined), JoinError> {
        let handle = self.get_or_create(room).await?;
        match handle.connect(credential.clone(), name.clone()).await {
            Err(JoinError::RoomClosed) => {
                debug!("Room {} closed during join, reopening", room);
                let handle = self.get_or_create(room).await?;
                let joined = handle.connect(credential, name).await?;
                Ok((handle, joined))
            }
            outcome => outcome.map(|joined| (handle, joined)),
        }
    }

    /// Number of live rooms.
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.values().filter(|h| h.is_open()).count()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::{FIXED_HALF, FIXED_ONE};
    use crate::game::draw::{BrushSize, ColorType, DrawOp};
    use crate::game::reducer::advance_all;
    use crate::game::state::{Guess, Hint, WordChoice};

    fn pass(s: &str) -> Credential {
        Credential::Pass(s.into())
    }

    fn room() -> RoomAuthority {
        RoomAuthority::new("test", RoomConfig::default(), DeterministicRng::new(42))
    }

    fn stroke(x: i32) -> DrawOp {
        DrawOp::StartStroke { color: ColorType::Primary, size: BrushSize::Medium, x, y: FIXED_HALF }
    }

    /// adam (0) and bob (1) seated, round 1 started with adam drawing.
    fn room_in_choose_word() -> RoomAuthority {
        let mut room = room();
        room.connect(&pass("a"), Some("adam")).unwrap();
        room.connect(&pass("b"), Some("bob")).unwrap();
        let batch = room.tick(1_000);
        assert_eq!(batch.len(), 2);
        room
    }

    fn room_in_drawing() -> RoomAuthority {
        let mut room = room_in_choose_word();
        let batch = room.client_event(0, ClientEvent::ChooseWord { choice: WordChoice::Easy }, 2_000);
        assert_eq!(batch.len(), 3);
        room
    }

    #[test]
    fn test_join_allocates_ids() {
        let mut room = room();
        let a = room.connect(&pass("a"), Some("  adam ")).unwrap();
        let b = room.connect(&pass("b"), None).unwrap();

        assert_eq!((a.player_id, b.player_id), (0, 1));
        assert!(!a.reconnected);
        assert_eq!(a.broadcast.0, vec![ServerEvent::PlayerJoin { id: 0, name: "adam".into() }]);
        assert_eq!(b.broadcast.0, vec![ServerEvent::PlayerJoin { id: 1, name: "player01".into() }]);
    }

    #[test]
    fn test_reconnect_resumes_player() {
        let mut room = room();
        room.connect(&pass("a"), Some("adam")).unwrap();
        room.client_event(0, ClientEvent::IncreaseScore { kind: ScoreKind::Total, by: 10 }, 0);

        // Same credential while connected is refused
        assert_eq!(room.connect(&pass("a"), None).unwrap_err(), JoinError::AlreadyConnected);

        let batch = room.disconnect(0, 0);
        assert_eq!(batch.0, vec![ServerEvent::PlayerDisconnect { id: 0 }]);
        assert!(room.game().player(0).is_some());

        let again = room.connect(&pass("a"), Some("ada")).unwrap();
        assert!(again.reconnected);
        assert_eq!(again.player_id, 0);
        assert_eq!(
            again.broadcast.0,
            vec![ServerEvent::PlayerConnect { id: 0 }, ServerEvent::PlayerRename { id: 0, name: "ada".into() }]
        );
        assert_eq!(room.game().players[&0].score, 10);
    }

    #[test]
    fn test_anonymous_never_reconnects() {
        let mut room = room();
        let anon = Credential::anonymous();
        room.connect(&anon, None).unwrap();
        room.disconnect(0, 0);

        let next = room.connect(&anon, None).unwrap();
        assert_eq!(next.player_id, 1);
    }

    #[test]
    fn test_room_full() {
        let config = RoomConfig { max_players: 2, ..Default::default() };
        let mut room = RoomAuthority::new("small", config, DeterministicRng::new(1));
        room.connect(&pass("a"), None).unwrap();
        room.connect(&pass("b"), None).unwrap();

        assert_eq!(room.connect(&pass("c"), None).unwrap_err(), JoinError::RoomFull);

        // Disconnected players still hold their seat, but can come back
        room.disconnect(1, 0);
        assert_eq!(room.connect(&pass("c"), None).unwrap_err(), JoinError::RoomFull);
        assert!(room.connect(&pass("b"), None).is_ok());
    }

    #[test]
    fn test_room_full_reclaims_anonymous_seat() {
        let config = RoomConfig { max_players: 2, ..Default::default() };
        let mut room = RoomAuthority::new("small", config, DeterministicRng::new(1));
        room.connect(&pass("a"), None).unwrap();
        let anon = room.connect(&Credential::anonymous(), None).unwrap();
        assert_eq!(anon.player_id, 1);

        // A connected anonymous player keeps the seat
        assert_eq!(room.connect(&pass("c"), None).unwrap_err(), JoinError::RoomFull);

        // Once gone it can never come back, so the seat is handed on
        room.disconnect(1, 0);
        let carol = room.connect(&pass("c"), Some("carol")).unwrap();
        assert_eq!(carol.player_id, 2);
        assert_eq!(
            carol.broadcast.0,
            vec![ServerEvent::PlayerLeave { id: 1 }, ServerEvent::PlayerJoin { id: 2, name: "carol".into() }]
        );
        assert!(room.game().player(1).is_none());
        assert_eq!(room.game().players.len(), 2);

        // Only anonymous seats are reclaimed
        room.disconnect(2, 0);
        assert_eq!(room.connect(&pass("d"), None).unwrap_err(), JoinError::RoomFull);
    }

    #[test]
    fn test_bootstrap_is_set_game() {
        let mut room = room();
        room.connect(&pass("a"), None).unwrap();
        let boot = room.bootstrap(0);
        assert_eq!(boot.0, vec![ServerEvent::SetGame { player_id: 0, game: room.game().clone() }]);
    }

    #[test]
    fn test_rename_validation() {
        let mut room = room();
        room.connect(&pass("a"), None).unwrap();

        assert!(room.client_event(0, ClientEvent::Rename { name: "   ".into() }, 0).is_empty());
        assert!(room.client_event(0, ClientEvent::Rename { name: "x".repeat(33) }, 0).is_empty());
        assert!(room.client_event(0, ClientEvent::Rename { name: "a\u{7}b".into() }, 0).is_empty());

        let batch = room.client_event(0, ClientEvent::Rename { name: " adam ".into() }, 0);
        assert_eq!(batch.0, vec![ServerEvent::PlayerRename { id: 0, name: "adam".into() }]);
    }

    #[test]
    fn test_unknown_sender_ignored() {
        let mut room = room();
        assert!(room.client_event(7, ClientEvent::Rename { name: "ghost".into() }, 0).is_empty());
    }

    #[test]
    fn test_self_score_cap() {
        let mut room = room();
        room.connect(&pass("a"), None).unwrap();

        let cap = room.config().max_self_score_increase;
        assert!(room.client_event(0, ClientEvent::IncreaseScore { kind: ScoreKind::Total, by: 0 }, 0).is_empty());
        assert!(room.client_event(0, ClientEvent::IncreaseScore { kind: ScoreKind::Total, by: cap + 1 }, 0).is_empty());

        let batch = room.client_event(0, ClientEvent::IncreaseScore { kind: ScoreKind::Guesser, by: cap }, 0);
        assert_eq!(batch.0, vec![ServerEvent::PlayerIncreaseGuesserScore { id: 0, by: cap }]);
    }

    #[test]
    fn test_round_starts_with_enough_players() {
        let mut room = room();
        room.connect(&pass("a"), None).unwrap();
        assert!(room.tick(0).is_empty());

        room.connect(&pass("b"), None).unwrap();
        let batch = room.tick(500);
        assert!(matches!(batch.0[0], ServerEvent::NewRound { round_id: 1, drawer: 0, .. }));
        assert_eq!(room.game().round.as_ref().unwrap().phase, Phase::ChooseWord);
    }

    #[test]
    fn test_choose_word_only_by_drawer_in_phase() {
        let mut room = room_in_choose_word();
        assert!(room.client_event(1, ClientEvent::ChooseWord { choice: WordChoice::Hard }, 0).is_empty());

        let batch = room.client_event(0, ClientEvent::ChooseWord { choice: WordChoice::Hard }, 2_000);
        let r = room.game().round.clone().unwrap();
        assert_eq!(r.phase, Phase::Drawing);
        assert_eq!(r.word_choice, WordChoice::Hard);
        assert_eq!(r.hints, vec![Hint::WordLength { letters: r.hard_word.len() as u32 }]);
        assert_eq!(batch.len(), 3);

        // Second choice is out of phase
        assert!(room.client_event(0, ClientEvent::ChooseWord { choice: WordChoice::Easy }, 0).is_empty());
    }

    #[test]
    fn test_draw_op_authorization() {
        let mut room = room_in_choose_word();

        // Not in Drawing yet
        assert!(room.client_event(0, ClientEvent::DrawOp { op: stroke(0) }, 0).is_empty());

        room.client_event(0, ClientEvent::ChooseWord { choice: WordChoice::Easy }, 0);

        assert!(room.client_event(1, ClientEvent::DrawOp { op: stroke(0) }, 0).is_empty());
        assert!(room.client_event(0, ClientEvent::DrawOp { op: stroke(FIXED_ONE + 1) }, 0).is_empty());

        let batch = room.client_event(0, ClientEvent::DrawOp { op: stroke(FIXED_ONE) }, 0);
        assert_eq!(batch.0, vec![ServerEvent::PlayerDrawOp { id: 0, op: stroke(FIXED_ONE) }]);
        assert_eq!(room.game().round.as_ref().unwrap().drawing.len(), 1);
    }

    #[test]
    fn test_draw_ops_capped_per_round() {
        let mut room = room_in_drawing();
        room.game.round.as_mut().unwrap().drawing = vec![stroke(FIXED_ONE); MAX_DRAW_OPS_PER_ROUND - 1];

        assert_eq!(room.client_event(0, ClientEvent::DrawOp { op: stroke(0) }, 0).len(), 1);
        assert!(room.client_event(0, ClientEvent::DrawOp { op: stroke(0) }, 0).is_empty());
        assert_eq!(room.game().round.as_ref().unwrap().drawing.len(), MAX_DRAW_OPS_PER_ROUND);

        // A full drawing still fits in a bootstrap
        assert!(room.bootstrap(1).to_bytes().is_ok());
    }

    #[test]
    fn test_wrong_guesses_capped_per_round() {
        let mut room = room_in_drawing();
        let filler = Guess { guesser: 1, guess: "z".repeat(MAX_GUESS_CHARS), after_draw_ops: 0 };
        room.game.round.as_mut().unwrap().guesses = vec![filler; MAX_GUESSES_PER_ROUND];

        assert!(room.client_event(1, ClientEvent::GuessWord { guess: "nope".into(), after_draw_ops: 0 }, 0).is_empty());

        let word = room.game().round.as_ref().unwrap().easy_word.clone();
        let batch = room.client_event(1, ClientEvent::GuessWord { guess: word, after_draw_ops: 0 }, 0);
        assert!(!batch.is_empty());
        assert_eq!(room.game().round.as_ref().unwrap().phase, Phase::Reveal);
        assert!(room.bootstrap(1).to_bytes().is_ok());
    }

    #[test]
    fn test_failed_bootstrap_rolls_back_seat() {
        let mut room = room_in_drawing();
        let (updates_tx, mut updates) = broadcast::channel(16);

        // Large enough that SetGame exceeds the message limit
        room.game.round.as_mut().unwrap().drawing = vec![stroke(FIXED_ONE); 120_000];

        let err = seat(&mut room, &updates_tx, &pass("c"), Some("carol")).unwrap_err();
        assert!(matches!(err, JoinError::Internal(_)));
        assert!(room.game().player(2).is_none());
        assert_eq!(room.game().players.len(), 2);

        // Subscribers saw the join and its undo
        let join = ServerEvents::from_bytes(&updates.try_recv().unwrap()).unwrap();
        assert_eq!(join.0, vec![ServerEvent::PlayerJoin { id: 2, name: "carol".into() }]);
        let undo = ServerEvents::from_bytes(&updates.try_recv().unwrap()).unwrap();
        assert_eq!(undo.0, vec![ServerEvent::PlayerLeave { id: 2 }]);

        // No ghost left holding the credential
        let again = seat(&mut room, &updates_tx, &pass("c"), Some("carol")).unwrap_err();
        assert!(matches!(again, JoinError::Internal(_)));

        // A failed resume leaves the player disconnected
        room.disconnect(1, 0);
        assert!(seat(&mut room, &updates_tx, &pass("b"), None).is_err());
        assert!(!room.game().players[&1].connected);

        room.game.round.as_mut().unwrap().drawing.clear();
        let joined = seat(&mut room, &updates_tx, &pass("b"), None).unwrap();
        assert_eq!(joined.player_id, 1);
        assert!(room.game().players[&1].connected);
    }

    #[test]
    fn test_wrong_guess() {
        let mut room = room_in_drawing();
        room.client_event(0, ClientEvent::DrawOp { op: stroke(0) }, 0);

        let batch = room.client_event(1, ClientEvent::GuessWord { guess: " zzz ".into(), after_draw_ops: 99 }, 0);
        assert_eq!(
            batch.0,
            vec![ServerEvent::PlayerGuessWord { guesser: 1, guess: "zzz".into(), after_draw_ops: 1 }]
        );

        // Drawer cannot guess, empty and oversized guesses are dropped
        assert!(room.client_event(0, ClientEvent::GuessWord { guess: "zzz".into(), after_draw_ops: 0 }, 0).is_empty());
        assert!(room.client_event(1, ClientEvent::GuessWord { guess: " ".into(), after_draw_ops: 0 }, 0).is_empty());
        assert!(room.client_event(1, ClientEvent::GuessWord { guess: "z".repeat(65), after_draw_ops: 0 }, 0).is_empty());
    }

    #[test]
    fn test_correct_guess_ends_round() {
        let mut room = room_in_drawing();
        let word = room.game().round.as_ref().unwrap().easy_word.to_uppercase();

        let batch = room.client_event(1, ClientEvent::GuessWord { guess: word, after_draw_ops: 0 }, 5_000);
        assert_eq!(batch.len(), 7);

        let points = room.config().round.easy_points;
        let game = room.game();
        assert_eq!(game.players[&1].guesser_score, points);
        assert_eq!(game.players[&0].drawer_score, points);
        let r = game.round.as_ref().unwrap();
        assert_eq!(r.phase, Phase::Reveal);
        assert_eq!((r.drawing_score, r.guessing_score), (points, points));

        // No more guessing in Reveal
        assert!(room.client_event(1, ClientEvent::GuessWord { guess: "again".into(), after_draw_ops: 0 }, 0).is_empty());
    }

    #[test]
    fn test_like_round() {
        let mut room = room_in_drawing();
        assert!(room.client_event(1, ClientEvent::LikeRound { round_id: 9 }, 0).is_empty());

        let before = room.game().clone();
        let batch = room.client_event(1, ClientEvent::LikeRound { round_id: 1 }, 0);
        assert_eq!(batch.0, vec![ServerEvent::PlayerLikeRound { liker: 1, round_id: 1 }]);
        assert_eq!(*room.game(), before);
    }

    #[test]
    fn test_drawer_leave_ends_round() {
        let mut room = room_in_drawing();
        let batch = room.client_event(0, ClientEvent::Leave, 3_000);

        assert_eq!(batch.0[0], ServerEvent::PlayerLeave { id: 0 });
        assert_eq!(room.game().round.as_ref().unwrap().phase, Phase::Reveal);
        assert!(room.game().player(0).is_none());

        // Credential was forgotten: same pass gets a new seat
        let again = room.connect(&pass("a"), None).unwrap();
        assert_eq!(again.player_id, 2);
        assert!(!again.reconnected);
    }

    #[test]
    fn test_disconnect_after_leave_is_silent() {
        let mut room = room();
        room.connect(&pass("a"), None).unwrap();
        room.client_event(0, ClientEvent::Leave, 0);
        assert!(room.disconnect(0, 0).is_empty());
    }

    #[test]
    fn test_empty_room_reset() {
        let mut room = room_in_drawing();
        let reset_ms = room.config().empty_room_reset_after.as_millis() as u64;
        room.disconnect(0, 10_000);
        room.disconnect(1, 10_000);

        // Not yet
        assert!(room.tick(10_000 + reset_ms - 1).is_empty());
        assert!(room.game().round.is_some());

        assert!(room.tick(10_000 + reset_ms).is_empty());
        assert_eq!(*room.game(), Game::new());

        // Credentials were forgotten too
        let fresh = room.connect(&pass("a"), None).unwrap();
        assert!(!fresh.reconnected);
    }

    #[test]
    fn test_is_expired() {
        let mut room = room();
        let reset_ms = room.config().empty_room_reset_after.as_millis() as u64;
        room.connect(&pass("a"), None).unwrap();
        assert!(!room.is_expired(u64::MAX));

        room.disconnect(0, 1_000);
        assert!(!room.is_expired(1_000 + reset_ms - 1));
        assert!(room.is_expired(1_000 + reset_ms));

        room.connect(&pass("a"), None).unwrap();
        assert!(!room.is_expired(u64::MAX));
    }

    #[test]
    fn test_broadcast_replays_to_same_state() {
        // A replica fed bootstrap plus every broadcast converges
        let mut room = room();
        let mut replica = Game::new();

        let a = room.connect(&pass("a"), None).unwrap();
        advance_all(&mut replica, &room.bootstrap(a.player_id));

        let mut batches = Vec::new();
        batches.push(room.connect(&pass("b"), None).unwrap().broadcast);
        batches.push(room.tick(0));
        batches.push(room.client_event(0, ClientEvent::ChooseWord { choice: WordChoice::Hard }, 1));
        batches.push(room.client_event(0, ClientEvent::DrawOp { op: stroke(0) }, 2));
        batches.push(room.client_event(1, ClientEvent::GuessWord { guess: "nope".into(), after_draw_ops: 1 }, 3));
        batches.push(room.disconnect(1, 4));

        for batch in &batches {
            advance_all(&mut replica, batch);
        }
        assert_eq!(replica, *room.game());
        assert_eq!(replica.state_hash().unwrap(), room.game().state_hash().unwrap());
    }

    #[tokio::test]
    async fn test_room_task_bootstrap_then_updates() {
        let handle = spawn_room("task", RoomConfig::default());

        let first = handle.connect(pass("a"), Some("adam".into())).await.unwrap();
        let boot = ServerEvents::from_bytes(&first.bootstrap).unwrap();
        assert!(matches!(boot.0[0], ServerEvent::SetGame { player_id: 0, .. }));

        let mut updates = first.updates;
        let second = handle.connect(pass("b"), Some("bob".into())).await.unwrap();
        assert_eq!(second.player_id, 1);

        let bytes = updates.recv().await.unwrap();
        let batch = ServerEvents::from_bytes(&bytes).unwrap();
        assert_eq!(batch.0, vec![ServerEvent::PlayerJoin { id: 1, name: "bob".into() }]);

        // Already connected is reported through the handle
        let err = handle.connect(pass("a"), None).await.unwrap_err();
        assert_eq!(err, JoinError::AlreadyConnected);
        assert_eq!(err.kind(), ErrorKind::AlreadyConnected);
    }

    #[tokio::test]
    async fn test_room_manager() {
        let manager = RoomManager::new(RoomConfig::default(), 1);

        let a = manager.get_or_create("lobby").await.unwrap();
        let b = manager.get_or_create("lobby").await.unwrap();
        assert_eq!(a.name(), b.name());
        assert_eq!(manager.room_count().await, 1);

        let err = manager.get_or_create("other").await.unwrap_err();
        assert_eq!(err, JoinError::TooManyRooms);
    }

    #[tokio::test]
    async fn test_idle_room_closes_and_frees_slot() {
        let config = RoomConfig {
            empty_room_reset_after: Duration::from_millis(50),
            tick_interval: Duration::from_millis(10),
            ..Default::default()
        };
        let manager = RoomManager::new(config, 1);

        let (handle, joined) = manager.join("first", pass("a"), None).await.unwrap();
        assert_eq!(joined.player_id, 0);
        assert_eq!(manager.get_or_create("second").await.unwrap_err(), JoinError::TooManyRooms);

        handle.disconnect(joined.player_id).await;
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert!(!handle.is_open());
        assert_eq!(manager.room_count().await, 0);

        let (other, _) = manager.join("second", pass("b"), None).await.unwrap();
        assert_eq!(other.name(), "second");
        assert_eq!(manager.room_count().await, 1);
    }
}
