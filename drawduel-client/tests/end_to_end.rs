//! End-to-end: a real server on a loopback socket and two terminal clients.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::time::timeout;

use drawduel::game::{ClientEvent, ErrorKind, Phase, WordChoice};
use drawduel::network::protocol::ClientInfo;
use drawduel::network::{GameServer, RoomConfig, ServerConfig};
use drawduel_client::{ClientError, Connection, Replica, ReplicaError};

async fn start() -> (Arc<GameServer>, String) {
    let config = ServerConfig {
        room: RoomConfig { tick_interval: Duration::from_millis(20), ..RoomConfig::default() },
        ..ServerConfig::default()
    };
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    let server = Arc::new(GameServer::new(config));
    let runner = server.clone();
    tokio::spawn(async move { runner.serve(listener).await });
    (server, format!("ws://{addr}"))
}

fn info(name: &str, pass: &str) -> ClientInfo {
    ClientInfo {
        room: "e2e".into(),
        name: Some(name.into()),
        pass: Some(pass.into()),
        token: None,
    }
}

/// Apply updates until `done` holds for the replica.
async fn until(connection: &mut Connection, done: impl Fn(&Replica) -> bool) {
    timeout(Duration::from_secs(5), async {
        while !done(connection.replica()) {
            connection.next_update().await.unwrap().expect("connection closed early");
        }
    })
    .await
    .expect("timed out waiting for state");
}

#[tokio::test]
async fn test_two_clients_converge_through_a_round() {
    let (server, url) = start().await;

    let mut adam = Connection::connect(&url, &info("adam", "a-secret")).await.unwrap();
    let mut bob = Connection::connect(&url, &info("bob", "b-secret")).await.unwrap();
    assert_eq!(adam.replica().player_id(), Some(0));
    assert_eq!(bob.replica().player_id(), Some(1));

    // Round starts once both are seated; adam draws first
    until(&mut adam, |r| r.round().is_some()).await;
    until(&mut bob, |r| r.round().is_some()).await;
    assert!(adam.replica().is_drawer());

    adam.send(&ClientEvent::ChooseWord { choice: WordChoice::Hard }).await.unwrap();
    until(&mut bob, Replica::can_guess).await;

    let word = bob.replica().round().unwrap().word().to_string();
    bob.send(&ClientEvent::GuessWord { guess: word, after_draw_ops: 0 }).await.unwrap();

    let revealed = |r: &Replica| r.round().is_some_and(|round| round.phase == Phase::Reveal);
    until(&mut adam, revealed).await;
    until(&mut bob, revealed).await;

    assert_eq!(adam.replica().state_hash().unwrap(), bob.replica().state_hash().unwrap());
    assert_eq!(bob.replica().me().unwrap().guesser_score, 200);
    assert_eq!(adam.replica().me().unwrap().drawer_score, 200);

    adam.close().await.unwrap();
    bob.close().await.unwrap();
    server.shutdown();
}

#[tokio::test]
async fn test_reconnect_gets_fresh_bootstrap() {
    let (server, url) = start().await;

    let mut adam = Connection::connect(&url, &info("adam", "a-secret")).await.unwrap();
    let mut bob = Connection::connect(&url, &info("bob", "b-secret")).await.unwrap();
    bob.send(&ClientEvent::Rename { name: "bobby".into() }).await.unwrap();
    until(&mut adam, |r| r.game().player(1).is_some_and(|p| p.name == "bobby")).await;

    bob.close().await.unwrap();
    until(&mut adam, |r| r.game().player(1).is_some_and(|p| !p.connected)).await;

    let bob = Connection::connect(&url, &info("bob", "b-secret")).await.unwrap();
    assert_eq!(bob.replica().player_id(), Some(1));
    assert_eq!(bob.replica().me().unwrap().name, "bob");
    until(&mut adam, |r| r.game().player(1).is_some_and(|p| p.connected && p.name == "bob")).await;

    server.shutdown();
}

#[tokio::test]
async fn test_duplicate_credential_rejected() {
    let (server, url) = start().await;

    let _adam = Connection::connect(&url, &info("adam", "shared")).await.unwrap();
    match Connection::connect(&url, &info("imposter", "shared")).await {
        Err(ClientError::Replica(ReplicaError::Rejected { kind, .. })) => {
            assert_eq!(kind, ErrorKind::AlreadyConnected)
        }
        Err(other) => panic!("expected rejection, got {other}"),
        Ok(_) => panic!("expected rejection"),
    }

    server.shutdown();
}
