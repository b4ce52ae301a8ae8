//! WebSocket Game Server
//!
//! Async WebSocket server for room connections.
//! Handles the handshake (room, name and credential from the query string),
//! seats the connection in its room, then pumps frames both ways until the
//! connection closes, goes stale, lags the broadcast, or the server shuts down.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, RwLock};
use tokio::time::interval;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::{accept_async, accept_hdr_async, tungstenite::Message, WebSocketStream};
use futures_util::{SinkExt, StreamExt};
use futures_util::stream::{SplitSink, SplitStream};
use tracing::{info, warn, error, debug, instrument};

use crate::core::codec::CodecError;
use crate::game::events::{ClientEvent, ErrorKind, ServerEvent, ServerEvents};
use crate::game::state::PlayerId;
use crate::network::auth::{resolve_credential, AuthConfig, AuthError};
use crate::network::env_or;
use crate::network::protocol::{
    decode_client_frame, ClientInfo, ProtocolError, CLOSE_GOING_AWAY, CLOSE_NORMAL, CLOSE_POLICY,
};
use crate::network::room::{EncodedBatch, JoinError, RoomConfig, RoomHandle, RoomManager};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Maximum concurrent rooms.
    pub max_rooms: usize,
    /// Ping a connection after this long without traffic.
    pub inactive_after: Duration,
    /// Drop a connection after this long without traffic.
    pub stale_after: Duration,
    /// How often connections check the two timeouts above.
    pub keepalive_interval: Duration,
    /// Settings for every room.
    pub room: RoomConfig,
    /// JWT settings.
    pub auth: AuthConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_connections: 1000,
            max_rooms: 100,
            inactive_after: Duration::from_millis(4000),
            stale_after: Duration::from_millis(9000),
            keepalive_interval: Duration::from_millis(5000),
            room: RoomConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create config from `DRAWDUEL_*` (and `AUTH_*`) environment variables.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            bind_addr: env_or("DRAWDUEL_BIND_ADDR", d.bind_addr),
            max_connections: env_or("DRAWDUEL_MAX_CONNECTIONS", d.max_connections),
            max_rooms: env_or("DRAWDUEL_MAX_ROOMS", d.max_rooms),
            inactive_after: Duration::from_millis(env_or(
                "DRAWDUEL_INACTIVE_AFTER_MS",
                d.inactive_after.as_millis() as u64,
            )),
            stale_after: Duration::from_millis(env_or(
                "DRAWDUEL_STALE_AFTER_MS",
                d.stale_after.as_millis() as u64,
            )),
            keepalive_interval: Duration::from_millis(env_or(
                "DRAWDUEL_KEEPALIVE_INTERVAL_MS",
                d.keepalive_interval.as_millis() as u64,
            )),
            room: RoomConfig::from_env(),
            auth: AuthConfig::from_env(),
        }
    }
}

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Connection limit reached.
    #[error("Connection limit reached")]
    ConnectionLimitReached,

    /// Client broke the protocol.
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Handshake credential rejected.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Room refused the connection.
    #[error("Join error: {0}")]
    Join(#[from] JoinError),

    /// Outgoing message could not be encoded.
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}

impl GameServerError {
    /// Error kind and close code to send before closing, if the client should be told.
    fn rejection(&self) -> Option<(ErrorKind, u16)> {
        match self {
            GameServerError::Protocol(e) => Some((ErrorKind::ProtocolViolation, e.close_code())),
            GameServerError::Auth(AuthError::Expired) => Some((ErrorKind::TokenExpired, CLOSE_POLICY)),
            GameServerError::Auth(_) => Some((ErrorKind::InvalidToken, CLOSE_POLICY)),
            GameServerError::Join(e) => Some((e.kind(), CLOSE_POLICY)),
            GameServerError::ConnectionLimitReached => Some((ErrorKind::ServerOverloaded, CLOSE_POLICY)),
            GameServerError::BindFailed(_) | GameServerError::WebSocket(_) | GameServerError::Codec(_) => None,
        }
    }
}

/// Connected client state.
#[derive(Debug)]
struct ConnectedClient {
    /// Room the client asked for.
    room: String,
    /// Seat, once granted.
    player_id: Option<PlayerId>,
    /// Connection time.
    connected_at: Instant,
}

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;
type WsSource = SplitStream<WebSocketStream<TcpStream>>;

/// Why a seated connection's loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    ClientClosed,
    Left,
    Stale,
    Lagged,
    RoomGone,
    Shutdown,
}

/// The game server.
pub struct GameServer {
    /// Server configuration.
    config: Arc<ServerConfig>,
    /// Room registry.
    rooms: Arc<RoomManager>,
    /// Connected clients.
    clients: Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a new game server.
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let rooms = RoomManager::new(config.room.clone(), config.max_rooms);

        Self {
            config: Arc::new(config),
            rooms: Arc::new(rooms),
            clients: Arc::new(RwLock::new(BTreeMap::new())),
            shutdown_tx,
        }
    }

    /// Bind the configured address and run the server.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Accept connections on an already bound listener until shutdown.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), GameServerError> {
        info!("Game server listening on {}", listener.local_addr()?);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let clients_count = self.clients.read().await.len();
                            if clients_count >= self.config.max_connections {
                                warn!("Connection limit reached, rejecting {}", addr);
                                tokio::spawn(Self::turn_away(stream, addr));
                                continue;
                            }

                            debug!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let clients = self.clients.clone();
        let rooms = self.rooms.clone();
        let config = self.config.clone();
        let shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            if let Err(e) = Self::serve_connection(stream, addr, &config, &rooms, &clients, shutdown_rx).await {
                debug!("Connection {} ended with error: {}", addr, e);
            }

            // Remove client
            if let Some(client) = clients.write().await.remove(&addr) {
                info!(
                    room = %client.room,
                    player_id = ?client.player_id,
                    secs = client.connected_at.elapsed().as_secs(),
                    "Client {} cleaned up", addr
                );
            }
        });
    }

    /// Complete the handshake only to say the server is full.
    async fn turn_away(stream: TcpStream, addr: SocketAddr) {
        let ws_stream = match accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                debug!("WebSocket handshake failed for {}: {}", addr, e);
                return;
            }
        };
        let (mut ws_sender, _) = ws_stream.split();
        let e = GameServerError::ConnectionLimitReached;
        if let Some((kind, code)) = e.rejection() {
            reject(&mut ws_sender, kind, &e.to_string(), code).await;
        }
    }

    async fn serve_connection(
        stream: TcpStream,
        addr: SocketAddr,
        config: &ServerConfig,
        rooms: &RoomManager,
        clients: &RwLock<BTreeMap<SocketAddr, ConnectedClient>>,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), GameServerError> {
        let mut query: Option<String> = None;
        let ws_stream = accept_hdr_async(stream, |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            query = req.uri().query().map(str::to_owned);
            Ok(resp)
        })
        .await?;
        let (mut ws_sender, ws_receiver) = ws_stream.split();

        // Handshake parameters and seat
        let joined = async {
            let info = ClientInfo::from_query(query.as_deref())?;
            clients.write().await.insert(addr, ConnectedClient {
                room: info.room.clone(),
                player_id: None,
                connected_at: Instant::now(),
            });
            let credential = resolve_credential(info.pass.as_deref(), info.token.as_deref(), &config.auth)?;
            let seat = rooms.join(&info.room, credential, info.name).await?;
            Ok::<_, GameServerError>(seat)
        }
        .await;

        let (room, joined) = match joined {
            Ok(seat) => seat,
            Err(e) => {
                if let Some((kind, code)) = e.rejection() {
                    info!("Rejecting {}: {}", addr, e);
                    reject(&mut ws_sender, kind, &e.to_string(), code).await;
                }
                return Err(e);
            }
        };

        let player_id = joined.player_id;
        if let Some(client) = clients.write().await.get_mut(&addr) {
            client.player_id = Some(player_id);
        }

        let exit = Self::pump(
            ws_sender,
            ws_receiver,
            config,
            &room,
            player_id,
            joined.bootstrap.to_vec(),
            joined.updates,
            shutdown_rx,
        )
        .await;

        // Disconnect after a leave is a no-op in the room
        room.disconnect(player_id).await;
        debug!(player_id, room = room.name(), "Connection {} closed: {:?}", addr, exit);
        exit.map(|_| ())
    }

    /// Frame pump for a seated connection. Bootstrap goes out first.
    #[allow(clippy::too_many_arguments)]
    async fn pump(
        mut ws_sender: WsSink,
        mut ws_receiver: WsSource,
        config: &ServerConfig,
        room: &RoomHandle,
        player_id: PlayerId,
        bootstrap: Vec<u8>,
        mut updates: broadcast::Receiver<EncodedBatch>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<Exit, GameServerError> {
        ws_sender.send(Message::Binary(bootstrap)).await?;

        let mut last_seen = Instant::now();
        let mut keepalive = interval(config.keepalive_interval);

        let exit = loop {
            tokio::select! {
                msg = ws_receiver.next() => {
                    last_seen = Instant::now();
                    match msg {
                        Some(Ok(Message::Binary(data))) => {
                            let event = match decode_client_frame(&data) {
                                Ok(event) => event,
                                Err(e) => {
                                    debug!(player_id, "Protocol violation: {}", e);
                                    close(&mut ws_sender, e.close_code(), "protocol violation").await;
                                    return Err(e.into());
                                }
                            };
                            let leaving = event == ClientEvent::Leave;
                            if !room.send_event(player_id, event).await {
                                break Exit::RoomGone;
                            }
                            if leaving {
                                close(&mut ws_sender, CLOSE_NORMAL, "left").await;
                                break Exit::Left;
                            }
                        }
                        Some(Ok(Message::Text(_))) => {
                            let e = ProtocolError::TextFrame;
                            close(&mut ws_sender, e.close_code(), "binary frames only").await;
                            return Err(e.into());
                        }
                        Some(Ok(Message::Close(_))) | None => break Exit::ClientClosed,
                        Some(Ok(_)) => {
                            // Ping/Pong carry no game semantics
                        }
                        Some(Err(e)) => {
                            debug!(player_id, "WebSocket error: {}", e);
                            break Exit::ClientClosed;
                        }
                    }
                }
                update = updates.recv() => {
                    match update {
                        Ok(bytes) => {
                            if ws_sender.send(Message::Binary(bytes.to_vec())).await.is_err() {
                                break Exit::ClientClosed;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(missed)) => {
                            warn!(player_id, missed, "Client lagged behind broadcast, dropping");
                            close(&mut ws_sender, CLOSE_GOING_AWAY, "lagged").await;
                            break Exit::Lagged;
                        }
                        Err(broadcast::error::RecvError::Closed) => break Exit::RoomGone,
                    }
                }
                _ = keepalive.tick() => {
                    let idle = last_seen.elapsed();
                    if idle >= config.stale_after {
                        info!(player_id, idle_ms = idle.as_millis() as u64, "Dropping stale connection");
                        close(&mut ws_sender, CLOSE_GOING_AWAY, "stale").await;
                        break Exit::Stale;
                    }
                    if idle >= config.inactive_after {
                        debug!(player_id, "Pinging inactive connection");
                        if ws_sender.send(Message::Ping(Vec::new())).await.is_err() {
                            break Exit::ClientClosed;
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    close(&mut ws_sender, CLOSE_GOING_AWAY, "server shutting down").await;
                    break Exit::Shutdown;
                }
            }
        };

        Ok(exit)
    }

    /// Signal shutdown to the accept loop and every connection.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Number of open connections.
    pub async fn connection_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Number of live rooms.
    pub async fn room_count(&self) -> usize {
        self.rooms.room_count().await
    }
}

/// Tell the client why, then close.
async fn reject(ws_sender: &mut WsSink, kind: ErrorKind, message: &str, code: u16) {
    let batch: ServerEvents = ServerEvent::error(kind, message).into();
    match batch.to_bytes() {
        Ok(bytes) => {
            let _ = ws_sender.send(Message::Binary(bytes)).await;
        }
        Err(e) => error!("Failed to encode rejection: {}", e),
    }
    close(ws_sender, code, message).await;
}

async fn close(ws_sender: &mut WsSink, code: u16, reason: &str) {
    let frame = CloseFrame {
        code: CloseCode::from(code),
        reason: reason.to_owned().into(),
    };
    let _ = ws_sender.send(Message::Close(Some(frame))).await;
}

// =============================================================================
// TESTS
// =============================================================================
