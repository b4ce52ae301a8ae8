//! Reducer
//!
//! `advance` is the only way state changes, on the server and on every client.
//! It is a pure function of `(Game, ServerEvent)`: no clock, no randomness,
//! no I/O. A failed precondition leaves the game untouched.

use crate::game::events::{ServerEvent, ServerEvents};
use crate::game::state::{Game, Guess, Player, Round};

/// Outcome of applying one event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// State changed (or was replaced).
    Applied,
    /// Precondition failed; state untouched.
    Dropped,
    /// Event carries no state.
    Informational,
}

impl Transition {
    /// True unless the event was dropped.
    pub fn is_kept(self) -> bool {
        !matches!(self, Transition::Dropped)
    }
}

/// Apply one event.
pub fn advance(game: &mut Game, event: &ServerEvent) -> Transition {
    match event {
        ServerEvent::SetGame { game: next, .. } => {
            *game = next.clone();
            Transition::Applied
        }
        ServerEvent::PlayerJoin { id, name } => {
            game.players.insert(*id, Player::new(name.clone()));
            Transition::Applied
        }
        ServerEvent::PlayerLeave { id } => applied_if(game.players.remove(id).is_some()),
        ServerEvent::PlayerConnect { id } => with_player(game, *id, |p| p.connected = true),
        ServerEvent::PlayerDisconnect { id } => with_player(game, *id, |p| p.connected = false),
        ServerEvent::PlayerRename { id, name } => {
            with_player(game, *id, |p| p.name.clone_from(name))
        }
        ServerEvent::PlayerIncreaseScore { id, by } => {
            with_player(game, *id, |p| p.score = p.score.saturating_add(*by))
        }
        ServerEvent::PlayerIncreaseDrawerScore { id, by } => {
            with_player(game, *id, |p| p.drawer_score = p.drawer_score.saturating_add(*by))
        }
        ServerEvent::PlayerIncreaseGuesserScore { id, by } => {
            with_player(game, *id, |p| p.guesser_score = p.guesser_score.saturating_add(*by))
        }
        ServerEvent::PlayerDrawOp { id, op } => match game.round.as_mut() {
            Some(round) if round.drawer == *id => {
                round.drawing.push(op.clone());
                Transition::Applied
            }
            _ => Transition::Dropped,
        },
        ServerEvent::PlayerChooseWord { drawer, choice } => match game.round.as_mut() {
            Some(round) if round.drawer == *drawer => {
                round.word_choice = *choice;
                Transition::Applied
            }
            _ => Transition::Dropped,
        },
        ServerEvent::PlayerGuessWord { guesser, guess, after_draw_ops } => {
            match game.round.as_mut() {
                Some(round) if round.drawer != *guesser => {
                    round.guesses.push(Guess {
                        guesser: *guesser,
                        guess: guess.clone(),
                        after_draw_ops: *after_draw_ops,
                    });
                    Transition::Applied
                }
                _ => Transition::Dropped,
            }
        }
        ServerEvent::NewRound { round_id, drawer, easy_word, hard_word } => {
            if game.round_id() == Some(*round_id) {
                return Transition::Dropped;
            }
            game.round = Some(Round::new(*round_id, *drawer, easy_word.clone(), hard_word.clone()));
            Transition::Applied
        }
        ServerEvent::RoundPhase { round_id, phase, ends_at } => {
            with_round(game, *round_id, |r| {
                r.phase = *phase;
                r.ends_at = *ends_at;
            })
        }
        ServerEvent::RoundHint { round_id, hint } => {
            with_round(game, *round_id, |r| r.hints.push(hint.clone()))
        }
        ServerEvent::RoundScore { round_id, drawing, guessing } => {
            with_round(game, *round_id, |r| {
                r.drawing_score = r.drawing_score.saturating_add(*drawing);
                r.guessing_score = r.guessing_score.saturating_add(*guessing);
            })
        }
        ServerEvent::PlayerLikeRound { .. } | ServerEvent::Error { .. } => Transition::Informational,
    }
}

/// Apply a batch in order (left fold of [`advance`]).
pub fn advance_all(game: &mut Game, events: &ServerEvents) {
    for event in events {
        advance(game, event);
    }
}

#[inline]
fn applied_if(changed: bool) -> Transition {
    if changed {
        Transition::Applied
    } else {
        Transition::Dropped
    }
}

fn with_player(game: &mut Game, id: u32, f: impl FnOnce(&mut Player)) -> Transition {
    match game.players.get_mut(&id) {
        Some(player) => {
            f(player);
            Transition::Applied
        }
        None => Transition::Dropped,
    }
}

fn with_round(game: &mut Game, round_id: u32, f: impl FnOnce(&mut Round)) -> Transition {
    match game.round.as_mut() {
        Some(round) if round.round_id == round_id => {
            f(round);
            Transition::Applied
        }
        _ => Transition::Dropped,
    }
}

// =============================================================================
// TESTS
// =============================================================================
