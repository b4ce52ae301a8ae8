//! Round State Machine
//!
//! Decides which canonical events move a round forward. Nothing here mutates
//! the game: every function reads the current state and returns the events
//! the room authority should apply and broadcast, in order.
//!
//! ```text
//!   (no round) ──► ChooseWord ──choose / timeout──► Drawing ──guess / timeout──► Reveal
//!                      ▲                                                       │
//!                      └──────────────── timeout, enough players ──────────────┘
//! ```

use serde::{Serialize, Deserialize};

use crate::core::rng::DeterministicRng;
use crate::game::events::ServerEvent;
use crate::game::state::{Game, Hint, Phase, PlayerId, Round, WordChoice};
use crate::game::words;

/// Timing and scoring for rounds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundConfig {
    /// Connected players needed to start a round
    pub min_players: usize,
    /// Time the drawer has to pick a word (ms)
    pub choose_word_ms: u64,
    /// Drawing phase length (ms)
    pub drawing_ms: u64,
    /// Reveal phase length (ms)
    pub reveal_ms: u64,
    /// Points for guessing (and drawing) the easy word
    pub easy_points: u32,
    /// Points for guessing (and drawing) the hard word
    pub hard_points: u32,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            min_players: 2,
            choose_word_ms: 10_000,
            drawing_ms: 80_000,
            reveal_ms: 5_000,
            easy_points: 100,
            hard_points: 200,
        }
    }
}

impl RoundConfig {
    /// Points awarded for a word choice.
    pub fn points(&self, choice: WordChoice) -> u32 {
        match choice {
            WordChoice::Easy => self.easy_points,
            WordChoice::Hard => self.hard_points,
        }
    }
}

/// Next drawer: first connected player after `previous` in id order, wrapping.
pub fn next_drawer(game: &Game, previous: Option<PlayerId>) -> Option<PlayerId> {
    let mut connected = game.connected_players().map(|(id, _)| id);
    match previous {
        None => connected.next(),
        Some(prev) => {
            let ids: Vec<PlayerId> = connected.collect();
            ids.iter()
                .copied()
                .find(|id| *id > prev)
                .or_else(|| ids.first().copied())
        }
    }
}

/// Start the next round, if enough players are connected.
pub fn start_round(
    game: &Game,
    config: &RoundConfig,
    rng: &mut DeterministicRng,
    now_ms: u64,
) -> Vec<ServerEvent> {
    if game.connected_count() < config.min_players.max(1) {
        return Vec::new();
    }
    let previous = game.round.as_ref().map(|r| r.drawer);
    let Some(drawer) = next_drawer(game, previous) else {
        return Vec::new();
    };
    // Round ids never wrap; a room that exhausts them stops starting rounds
    let Some(round_id) = game.round_id().map_or(Some(1), |id| id.checked_add(1)) else {
        return Vec::new();
    };
    let (easy_word, hard_word) = words::pick_pair(rng);

    vec![
        ServerEvent::NewRound {
            round_id,
            drawer,
            easy_word: easy_word.to_string(),
            hard_word: hard_word.to_string(),
        },
        ServerEvent::RoundPhase {
            round_id,
            phase: Phase::ChooseWord,
            ends_at: now_ms.saturating_add(config.choose_word_ms),
        },
    ]
}

/// Drawer picked (or timed out into) a word: start drawing.
pub fn choose_word(
    round: &Round,
    choice: WordChoice,
    config: &RoundConfig,
    now_ms: u64,
) -> Vec<ServerEvent> {
    let word = match choice {
        WordChoice::Easy => &round.easy_word,
        WordChoice::Hard => &round.hard_word,
    };
    let letters = u32::try_from(word.chars().count()).unwrap_or(u32::MAX);

    vec![
        ServerEvent::PlayerChooseWord { drawer: round.drawer, choice },
        ServerEvent::RoundPhase {
            round_id: round.round_id,
            phase: Phase::Drawing,
            ends_at: now_ms.saturating_add(config.drawing_ms),
        },
        ServerEvent::RoundHint {
            round_id: round.round_id,
            hint: Hint::WordLength { letters },
        },
    ]
}

/// Score events for a correct guess, ending the round.
pub fn correct_guess(
    round: &Round,
    guesser: PlayerId,
    config: &RoundConfig,
    now_ms: u64,
) -> Vec<ServerEvent> {
    let points = config.points(round.word_choice);
    let mut events = vec![
        ServerEvent::PlayerIncreaseScore { id: guesser, by: points },
        ServerEvent::PlayerIncreaseGuesserScore { id: guesser, by: points },
        ServerEvent::PlayerIncreaseScore { id: round.drawer, by: points },
        ServerEvent::PlayerIncreaseDrawerScore { id: round.drawer, by: points },
        ServerEvent::RoundScore { round_id: round.round_id, drawing: points, guessing: points },
    ];
    events.push(reveal(round, config, now_ms));
    events
}

/// Move the round into `Reveal`.
pub fn reveal(round: &Round, config: &RoundConfig, now_ms: u64) -> ServerEvent {
    ServerEvent::RoundPhase {
        round_id: round.round_id,
        phase: Phase::Reveal,
        ends_at: now_ms.saturating_add(config.reveal_ms),
    }
}

/// Reveal one letter not hinted yet.
pub fn letter_hint(round: &Round, rng: &mut DeterministicRng) -> Option<ServerEvent> {
    let hinted: Vec<u32> = round
        .hints
        .iter()
        .filter_map(|h| match h {
            Hint::Letter { index, .. } => Some(*index),
            Hint::WordLength { .. } => None,
        })
        .collect();
    let candidates: Vec<(u32, char)> = round
        .word()
        .chars()
        .enumerate()
        .filter_map(|(i, c)| u32::try_from(i).ok().map(|i| (i, c)))
        .filter(|(i, _)| !hinted.contains(i))
        .collect();

    rng.choose(&candidates).map(|&(index, letter)| ServerEvent::RoundHint {
        round_id: round.round_id,
        hint: Hint::Letter { index, letter },
    })
}

/// Timer-driven transitions due at `now_ms`.
pub fn on_tick(
    game: &Game,
    config: &RoundConfig,
    rng: &mut DeterministicRng,
    now_ms: u64,
) -> Vec<ServerEvent> {
    let Some(round) = game.round.as_ref() else {
        return start_round(game, config, rng, now_ms);
    };
    let expired = round.ends_at != 0 && now_ms >= round.ends_at;

    match round.phase {
        Phase::ChooseWord if expired => choose_word(round, WordChoice::Easy, config, now_ms),
        Phase::Drawing if expired => vec![reveal(round, config, now_ms)],
        Phase::Drawing => {
            let half_time = round.ends_at.saturating_sub(config.drawing_ms / 2);
            let has_letter = round.hints.iter().any(|h| matches!(h, Hint::Letter { .. }));
            if round.ends_at != 0 && now_ms >= half_time && !has_letter {
                letter_hint(round, rng).into_iter().collect()
            } else {
                Vec::new()
            }
        }
        Phase::Reveal if expired => start_round(game, config, rng, now_ms),
        Phase::ChooseWord | Phase::Reveal => Vec::new(),
    }
}

/// The drawer left for good: end the round early.
pub fn on_drawer_left(round: &Round, config: &RoundConfig, now_ms: u64) -> Option<ServerEvent> {
    match round.phase {
        Phase::ChooseWord | Phase::Drawing => Some(reveal(round, config, now_ms)),
        Phase::Reveal => None,
    }
}

// =============================================================================
// TESTS
// =============================================================================
