//! # DrawDuel Client
//!
//! Terminal client for DrawDuel rooms. A [`Connection`] joins a room,
//! receives the bootstrap `SetGame` and then every broadcast batch, and
//! folds them into a [`Replica`] with the same reducer the server runs.

pub mod network;
pub mod replica;

pub use network::{ClientError, Command, Connection};
pub use replica::{Replica, ReplicaError};
