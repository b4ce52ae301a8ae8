//! WebSocket connection to a room.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

use drawduel::core::codec::CodecError;
use drawduel::game::{ClientEvent, ServerEvents};
use drawduel::network::protocol::{decode_server_frame, ClientInfo, ProtocolError};

use crate::replica::{Replica, ReplicaError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Client connection errors.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Server address did not parse.
    #[error("invalid server url: {0}")]
    Url(#[from] url::ParseError),

    /// Transport failure.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// Server sent something outside the protocol.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Intent failed to encode.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Batch was refused by the replica (missing bootstrap or server error).
    #[error(transparent)]
    Replica(#[from] ReplicaError),

    /// Server closed before the bootstrap arrived.
    #[error("connection closed ({code}): {reason}")]
    Closed {
        /// WebSocket close code
        code: u16,
        /// Close reason
        reason: String,
    },
}

/// Live connection with its replica.
pub struct Connection {
    ws: WsStream,
    replica: Replica,
    close: Option<(u16, String)>,
}

impl Connection {
    /// Connect to `server` (e.g. `ws://127.0.0.1:8080`) and wait for the
    /// bootstrap batch.
    pub async fn connect(server: &str, info: &ClientInfo) -> Result<Self, ClientError> {
        let mut url = Url::parse(server)?;
        url.set_query(Some(&info.to_query()));
        debug!(url = %url, "Connecting");

        let (ws, _) = connect_async(url.as_str()).await?;
        let mut connection = Self { ws, replica: Replica::new(), close: None };

        if connection.next_update().await?.is_none() {
            let (code, reason) = connection
                .close
                .take()
                .unwrap_or((u16::from(CloseCode::Abnormal), String::new()));
            return Err(ClientError::Closed { code, reason });
        }
        info!(
            room = %info.room,
            player_id = ?connection.replica.player_id(),
            hash = %connection.replica.short_hash(),
            "Joined"
        );
        Ok(connection)
    }

    /// Mirrored game state.
    pub fn replica(&self) -> &Replica {
        &self.replica
    }

    /// Close code and reason, once the server has closed.
    pub fn close_reason(&self) -> Option<(u16, &str)> {
        self.close.as_ref().map(|(code, reason)| (*code, reason.as_str()))
    }

    /// Send one intent.
    pub async fn send(&mut self, event: &ClientEvent) -> Result<(), ClientError> {
        let bytes = event.to_bytes()?;
        self.ws.send(Message::Binary(bytes)).await?;
        Ok(())
    }

    /// Wait for the next batch and apply it to the replica.
    ///
    /// Returns `None` once the connection has closed.
    pub async fn next_update(&mut self) -> Result<Option<ServerEvents>, ClientError> {
        while let Some(frame) = self.ws.next().await {
            let msg = match frame {
                Ok(msg) => msg,
                Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => break,
                Err(e) => return Err(e.into()),
            };
            match msg {
                Message::Binary(data) => {
                    let batch = decode_server_frame(&data)?;
                    self.replica.apply(&batch)?;
                    debug!(events = batch.len(), hash = %self.replica.short_hash(), "Applied batch");
                    return Ok(Some(batch));
                }
                Message::Text(_) => return Err(ProtocolError::TextFrame.into()),
                Message::Close(frame) => {
                    let (code, reason) = frame
                        .map(|f| (u16::from(f.code), f.reason.into_owned()))
                        .unwrap_or((u16::from(CloseCode::Status), String::new()));
                    if code != u16::from(CloseCode::Normal) {
                        warn!(code, %reason, "Server closed connection");
                    }
                    self.close = Some((code, reason));
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
        Ok(None)
    }

    /// Close the connection normally.
    pub async fn close(&mut self) -> Result<(), ClientError> {
        let frame = CloseFrame { code: CloseCode::Normal, reason: "".into() };
        match self.ws.close(Some(frame)).await {
            Ok(()) | Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
