//! Network Layer
//!
//! WebSocket server, room authority and handshake handling.
//! This layer is **non-deterministic** (clocks, sockets, scheduling); every
//! state change still goes through the reducer in `game/`.

use std::str::FromStr;

pub mod auth;
pub mod protocol;
pub mod room;
pub mod server;

pub use auth::{AuthConfig, AuthError, Credential, TokenClaims, resolve_credential, validate_token};
pub use protocol::{ClientInfo, ProtocolError};
pub use room::{JoinError, Joined, RoomAuthority, RoomConfig, RoomHandle, RoomManager};
pub use server::{GameServer, GameServerError, ServerConfig};

/// Read and parse an environment variable, falling back to `default`
/// when it is unset or unparsable.
pub(crate) fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("Ignoring unparsable {}={:?}", key, raw);
                default
            }
        },
        Err(_) => default,
    }
}
