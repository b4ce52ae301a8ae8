//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//!
//! - One binary frame is one message.
//! - Client to server frames decode as a single [`ClientEvent`].
//! - Server to client frames decode as a non-empty [`ServerEvents`] batch.
//! - Text frames are a protocol violation.
//!
//! The connection parameters (room, display name, credential) travel in the
//! handshake query string, see [`ClientInfo`].

use url::form_urlencoded;

use crate::core::codec::{self, CodecError};
use crate::game::events::{ClientEvent, ServerEvents};

/// Room joined when the handshake names none.
pub const DEFAULT_ROOM: &str = "lobby";

/// Longest accepted room name (chars).
pub const MAX_ROOM_NAME: usize = 32;

// =============================================================================
// CLOSE CODES
// =============================================================================

/// Normal closure (e.g. after a leave).
pub const CLOSE_NORMAL: u16 = 1000;
/// Going away (server shutdown or stale connection).
pub const CLOSE_GOING_AWAY: u16 = 1001;
/// Malformed frame or message.
pub const CLOSE_PROTOCOL: u16 = 1002;
/// Unsupported frame type (text).
pub const CLOSE_UNSUPPORTED: u16 = 1003;
/// Join rejected by policy (room full, already connected, bad token).
pub const CLOSE_POLICY: u16 = 1008;

// =============================================================================
// ERRORS
// =============================================================================

/// Frame-level protocol errors. Fatal to the connection.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Text frames are not part of the protocol.
    #[error("text frames are not supported")]
    TextFrame,

    /// Frame did not decode.
    #[error("malformed message: {0}")]
    Codec(#[from] CodecError),

    /// Server sent a batch with no events.
    #[error("empty event batch")]
    EmptyBatch,

    /// Room name in the handshake is unusable.
    #[error("invalid room name: {0:?}")]
    InvalidRoom(String),
}

impl ProtocolError {
    /// WebSocket close code for this error.
    pub fn close_code(&self) -> u16 {
        match self {
            ProtocolError::TextFrame => CLOSE_UNSUPPORTED,
            ProtocolError::Codec(_) | ProtocolError::EmptyBatch => CLOSE_PROTOCOL,
            ProtocolError::InvalidRoom(_) => CLOSE_POLICY,
        }
    }
}

// =============================================================================
// HANDSHAKE
// =============================================================================

/// Connection parameters from the handshake query string.
///
/// `ws://host:port/?room=<name>&name=<display>&pass=<secret>` or `&token=<jwt>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    /// Room to join
    pub room: String,
    /// Requested display name
    pub name: Option<String>,
    /// Reconnection secret
    pub pass: Option<String>,
    /// JWT
    pub token: Option<String>,
}

impl ClientInfo {
    /// Parse a query string (without the leading `?`).
    ///
    /// Unknown keys are ignored; empty values count as absent.
    pub fn from_query(query: Option<&str>) -> Result<Self, ProtocolError> {
        let mut info = ClientInfo::default();
        let mut room = None;

        for (key, value) in form_urlencoded::parse(query.unwrap_or("").as_bytes()) {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "room" => room = Some(value.to_string()),
                "name" => info.name = Some(value.to_string()),
                "pass" => info.pass = Some(value.to_string()),
                "token" => info.token = Some(value.to_string()),
                _ => {}
            }
        }

        info.room = match room {
            Some(room) if is_valid_room_name(&room) => room,
            Some(room) => return Err(ProtocolError::InvalidRoom(room)),
            None => DEFAULT_ROOM.to_string(),
        };
        Ok(info)
    }

    /// Render as a query string (used by clients).
    pub fn to_query(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        query.append_pair("room", &self.room);
        if let Some(name) = &self.name {
            query.append_pair("name", name);
        }
        if let Some(pass) = &self.pass {
            query.append_pair("pass", pass);
        }
        if let Some(token) = &self.token {
            query.append_pair("token", token);
        }
        query.finish()
    }
}

/// Room names: 1..=32 ASCII letters, digits, `-` or `_`.
pub fn is_valid_room_name(room: &str) -> bool {
    !room.is_empty()
        && room.len() <= MAX_ROOM_NAME
        && room.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

// =============================================================================
// FRAMES
// =============================================================================

/// Decode a client frame.
pub fn decode_client_frame(data: &[u8]) -> Result<ClientEvent, ProtocolError> {
    Ok(ClientEvent::from_bytes(data)?)
}

/// Decode a server frame; batches are never empty.
pub fn decode_server_frame(data: &[u8]) -> Result<ServerEvents, ProtocolError> {
    let batch = ServerEvents::from_bytes(data)?;
    if batch.is_empty() {
        return Err(ProtocolError::EmptyBatch);
    }
    Ok(batch)
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientEvent {
    /// Serialize to JSON (for logs and debugging).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to the wire format.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        codec::encode(self)
    }

    /// Deserialize from the wire format.
    pub fn from_bytes(data: &[u8]) -> Result<Self, CodecError> {
        codec::decode(data)
    }
}

impl ServerEvents {
    /// Serialize to JSON (for logs and debugging).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to the wire format.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        codec::encode(self)
    }

    /// Deserialize from the wire format.
    pub fn from_bytes(data: &[u8]) -> Result<Self, CodecError> {
        codec::decode(data)
    }
}

// =============================================================================
// TESTS
// =============================================================================
