//! Network module - WebSocket connection to a DrawDuel room

mod client;
mod messages;

pub use client::{ClientError, Connection};
pub use messages::{describe, Command, CommandError, HELP};
