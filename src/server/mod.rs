//! TCP line-protocol front end for the leaderboard service

mod command;
mod connection;
mod server;

pub use command::{Command, Reply};
pub use connection::{ConnectionHandler, REQUEST_LINE_MAX};
pub use server::LeaderboardServer;
