//! DrawDuel terminal client.
//!
//! Joins a room, prints what happens through `tracing`, and turns typed
//! lines into intents (see `/help`).

use clap::Parser;
use rand::RngCore;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use drawduel::network::protocol::{ClientInfo, DEFAULT_ROOM};
use drawduel_client::network::{describe, Command, Connection, HELP};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "ws://127.0.0.1:8080")]
    server: String,

    /// Room to join
    #[arg(short = 'r', long, default_value = DEFAULT_ROOM)]
    room: String,

    /// Display name
    #[arg(short = 'n', long)]
    name: Option<String>,

    /// Reconnection secret (random when omitted)
    #[arg(short = 'p', long)]
    pass: Option<String>,

    /// JWT, for servers with authentication enabled
    #[arg(short = 't', long, conflicts_with = "pass")]
    token: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let args = Args::parse();
    let pass = match (&args.pass, &args.token) {
        (Some(pass), _) => Some(pass.clone()),
        (None, Some(_)) => None,
        (None, None) => {
            let mut secret = [0u8; 16];
            rand::thread_rng().fill_bytes(&mut secret);
            Some(hex::encode(secret))
        }
    };
    let info = ClientInfo { room: args.room, name: args.name, pass, token: args.token };

    info!("Connecting to {} room {}", args.server, info.room);
    if let Some(pass) = &info.pass {
        info!("Reconnect with --pass {}", pass);
    }
    let mut connection = Connection::connect(&args.server, &info).await?;
    for line in HELP.lines() {
        info!("{}", line);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            update = connection.next_update() => {
                let Some(batch) = update? else {
                    match connection.close_reason() {
                        Some((code, reason)) => info!("Disconnected ({}) {}", code, reason),
                        None => info!("Disconnected"),
                    }
                    break;
                };
                let replica = connection.replica();
                for event in &batch {
                    if let Some(line) = describe(event, replica.game(), replica.player_id()) {
                        info!("{}", line);
                    }
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    // stdin closed
                    connection.close().await?;
                    break;
                };
                let command = match Command::parse(&line) {
                    Ok(Some(command)) => command,
                    Ok(None) => continue,
                    Err(e) => {
                        warn!("{}", e);
                        continue;
                    }
                };
                match command {
                    Command::Help => HELP.lines().for_each(|l| info!("{}", l)),
                    Command::State => match serde_json::to_string_pretty(connection.replica().game()) {
                        Ok(json) => println!("{json}"),
                        Err(e) => error!("Failed to render state: {}", e),
                    },
                    command => match command.to_event(connection.replica()) {
                        Some(event) => connection.send(&event).await?,
                        None => warn!("Nothing to do right now"),
                    },
                }
            }
        }
    }

    info!("State hash {}", connection.replica().short_hash());
    Ok(())
}
