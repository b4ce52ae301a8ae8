//! Line commands typed by the player, and readable renderings of server
//! events for the terminal.

use drawduel::game::{ClientEvent, DrawOp, Game, Hint, Phase, PlayerId, ServerEvent, WordChoice};

use crate::replica::Replica;

// =============================================================================
// PLAYER -> CLIENT
// =============================================================================

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/name <new name>`
    Rename(String),
    /// `/guess <word>` or any line not starting with `/`
    Guess(String),
    /// `/choose easy|hard`
    Choose(WordChoice),
    /// `/like`: like the current round
    Like,
    /// `/undo`: drawer removes the last mark
    Undo,
    /// `/clear`: drawer wipes the canvas
    Clear,
    /// `/leave`: leave the room for good
    Leave,
    /// `/state`: print the local game as JSON
    State,
    /// `/help`
    Help,
}

/// Input lines that do not parse.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command /{0} (try /help)")]
    Unknown(String),

    #[error("/{0} needs an argument")]
    MissingArgument(&'static str),

    #[error("expected easy or hard, got {0:?}")]
    BadChoice(String),
}

/// Usage text for `/help`.
pub const HELP: &str = "\
commands:
  <text>              guess the word
  /guess <word>       guess the word
  /name <name>        change your name
  /choose easy|hard   pick a word (drawer)
  /undo, /clear       edit the drawing (drawer)
  /like               like the current round
  /state              dump the game as JSON
  /leave              leave the room";

impl Command {
    /// Parse one line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Some(Command::Guess(line.to_string())));
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };
        let command = match name {
            "name" => Command::Rename(required(arg, "name")?),
            "guess" => Command::Guess(required(arg, "guess")?),
            "choose" => match arg.to_ascii_lowercase().as_str() {
                "easy" => Command::Choose(WordChoice::Easy),
                "hard" => Command::Choose(WordChoice::Hard),
                "" => return Err(CommandError::MissingArgument("choose")),
                _ => return Err(CommandError::BadChoice(arg.to_string())),
            },
            "like" => Command::Like,
            "undo" => Command::Undo,
            "clear" => Command::Clear,
            "leave" | "quit" => Command::Leave,
            "state" => Command::State,
            "help" => Command::Help,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }

    /// Intent to send, given what the replica currently knows.
    ///
    /// Local commands and intents that need a round when there is none
    /// return `None`. The server still validates whatever is sent.
    pub fn to_event(&self, replica: &Replica) -> Option<ClientEvent> {
        let round = replica.round();
        match self {
            Command::Rename(name) => Some(ClientEvent::Rename { name: name.clone() }),
            Command::Guess(guess) => Some(ClientEvent::GuessWord {
                guess: guess.clone(),
                after_draw_ops: round.map_or(0, |r| r.draw_op_count()),
            }),
            Command::Choose(choice) => Some(ClientEvent::ChooseWord { choice: *choice }),
            Command::Like => round.map(|r| ClientEvent::LikeRound { round_id: r.round_id }),
            Command::Undo => Some(ClientEvent::DrawOp { op: DrawOp::Undo }),
            Command::Clear => Some(ClientEvent::DrawOp { op: DrawOp::Clear }),
            Command::Leave => Some(ClientEvent::Leave),
            Command::State | Command::Help => None,
        }
    }
}

fn required(arg: &str, command: &'static str) -> Result<String, CommandError> {
    if arg.is_empty() {
        Err(CommandError::MissingArgument(command))
    } else {
        Ok(arg.to_string())
    }
}

// =============================================================================
// SERVER -> PLAYER
// =============================================================================

/// One-line description of an applied event, or `None` for noise.
///
/// `game` is the state after the event was applied.
pub fn describe(event: &ServerEvent, game: &Game, me: Option<PlayerId>) -> Option<String> {
    let who = |id: PlayerId| match game.player(id) {
        Some(p) if Some(id) == me => format!("{} (you)", p.name),
        Some(p) => p.name.clone(),
        None => format!("player {id}"),
    };

    let line = match event {
        ServerEvent::SetGame { player_id, game } => format!(
            "joined as {} with {} player(s){}",
            who(*player_id),
            game.players.len(),
            game.round.as_ref().map_or(String::new(), |r| format!(", round {} in progress", r.round_id)),
        ),
        ServerEvent::PlayerJoin { name, .. } => format!("{name} joined"),
        ServerEvent::PlayerLeave { id } => format!("{} left", who(*id)),
        ServerEvent::PlayerConnect { id } => format!("{} is back", who(*id)),
        ServerEvent::PlayerDisconnect { id } => format!("{} lost connection", who(*id)),
        ServerEvent::PlayerRename { id, name } => format!("player {id} is now {name}"),
        ServerEvent::PlayerIncreaseScore { id, by } => format!(
            "{} +{by} ({} total)",
            who(*id),
            game.player(*id).map_or(0, |p| p.score),
        ),
        ServerEvent::PlayerIncreaseDrawerScore { .. }
        | ServerEvent::PlayerIncreaseGuesserScore { .. }
        | ServerEvent::PlayerDrawOp { .. }
        | ServerEvent::RoundScore { .. } => return None,
        ServerEvent::PlayerChooseWord { drawer, choice } => {
            let level = match choice {
                WordChoice::Easy => "easy",
                WordChoice::Hard => "hard",
            };
            format!("{} picked the {level} word", who(*drawer))
        }
        ServerEvent::PlayerGuessWord { guesser, guess, .. } => format!("{}: {guess}", who(*guesser)),
        ServerEvent::PlayerLikeRound { liker, round_id } => {
            format!("{} liked round {round_id}", who(*liker))
        }
        ServerEvent::NewRound { round_id, drawer, easy_word, hard_word } => {
            if Some(*drawer) == me {
                format!("round {round_id}: you draw! /choose easy ({easy_word}) or hard ({hard_word})")
            } else {
                format!("round {round_id}: {} is drawing", who(*drawer))
            }
        }
        ServerEvent::RoundPhase { round_id, phase, .. } => match phase {
            Phase::ChooseWord => return None,
            Phase::Drawing => format!("round {round_id}: drawing started"),
            Phase::Reveal => format!(
                "round {round_id}: the word was {:?}",
                game.round.as_ref().map_or("", |r| r.word()),
            ),
        },
        ServerEvent::RoundHint { hint, .. } => match hint {
            Hint::WordLength { letters } => format!("hint: {letters} letters"),
            Hint::Letter { index, letter } => format!("hint: letter {} is '{letter}'", index + 1),
        },
        ServerEvent::Error { kind, message } => format!("server error {kind:?}: {message}"),
    };
    Some(line)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use drawduel::game::{Player, Round, ServerEvents};

    #[test]
    fn test_plain_text_is_a_guess() {
        assert_eq!(Command::parse("  platypus "), Ok(Some(Command::Guess("platypus".into()))));
        assert_eq!(Command::parse("   "), Ok(None));
    }

    #[test]
    fn test_commands() {
        assert_eq!(Command::parse("/name adam x"), Ok(Some(Command::Rename("adam x".into()))));
        assert_eq!(Command::parse("/guess cat"), Ok(Some(Command::Guess("cat".into()))));
        assert_eq!(Command::parse("/choose HARD"), Ok(Some(Command::Choose(WordChoice::Hard))));
        assert_eq!(Command::parse("/like"), Ok(Some(Command::Like)));
        assert_eq!(Command::parse("/leave"), Ok(Some(Command::Leave)));
    }

    #[test]
    fn test_command_errors() {
        assert_eq!(Command::parse("/name"), Err(CommandError::MissingArgument("name")));
        assert_eq!(Command::parse("/choose"), Err(CommandError::MissingArgument("choose")));
        assert_eq!(Command::parse("/choose medium"), Err(CommandError::BadChoice("medium".into())));
        assert_eq!(Command::parse("/dance"), Err(CommandError::Unknown("dance".into())));
    }

    fn replica_in_round() -> Replica {
        let mut game = Game::new();
        game.players.insert(0, Player::new("adam"));
        game.players.insert(1, Player::new("bob"));
        let mut round = Round::new(4, 0, "cat", "platypus");
        round.phase = Phase::Drawing;
        round.drawing.push(DrawOp::Clear);
        game.round = Some(round);

        let mut replica = Replica::new();
        let batch: ServerEvents = ServerEvent::SetGame { player_id: 1, game }.into();
        replica.apply(&batch).unwrap();
        replica
    }

    #[test]
    fn test_events_from_replica() {
        let replica = replica_in_round();
        assert_eq!(
            Command::Guess("cat".into()).to_event(&replica),
            Some(ClientEvent::GuessWord { guess: "cat".into(), after_draw_ops: 1 }),
        );
        assert_eq!(Command::Like.to_event(&replica), Some(ClientEvent::LikeRound { round_id: 4 }));
        assert_eq!(Command::State.to_event(&replica), None);

        // No round, nothing to like
        assert_eq!(Command::Like.to_event(&Replica::new()), None);
    }

    #[test]
    fn test_describe() {
        let replica = replica_in_round();
        let game = replica.game();
        let me = replica.player_id();

        let line = describe(&ServerEvent::PlayerGuessWord { guesser: 1, guess: "dog".into(), after_draw_ops: 1 }, game, me);
        assert_eq!(line.as_deref(), Some("bob (you): dog"));

        let line = describe(&ServerEvent::RoundPhase { round_id: 4, phase: Phase::Reveal, ends_at: 0 }, game, me);
        assert_eq!(line.as_deref(), Some("round 4: the word was \"cat\""));

        assert_eq!(describe(&ServerEvent::PlayerDrawOp { id: 0, op: DrawOp::Undo }, game, me), None);
    }
}
