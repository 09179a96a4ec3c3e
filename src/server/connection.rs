use super::command::{Command, Reply};
use crate::leaderboard::LeaderboardService;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Longest accepted request line in bytes
pub const REQUEST_LINE_MAX: usize = 4096;

pub struct ConnectionHandler {
    framed: Framed<TcpStream, LinesCodec>,
    service: LeaderboardService,
    client_addr: String,
}

impl ConnectionHandler {
    pub fn new(stream: TcpStream, service: LeaderboardService, client_addr: String) -> Self {
        ConnectionHandler {
            framed: Framed::new(stream, LinesCodec::new_with_max_length(REQUEST_LINE_MAX)),
            service,
            client_addr,
        }
    }

    pub async fn run(mut self, cancel: CancellationToken) {
        info!("Client connected: {}", self.client_addr);

        loop {
            let frame = tokio::select! {
                _ = cancel.cancelled() => break,
                frame = self.framed.next() => frame,
            };

            let mut close = false;
            let reply = match frame {
                None => break,
                Some(Ok(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    self.handle_line(&line)
                }
                Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                    // The codec yields nothing after an error, so close once answered
                    warn!("Oversized request from {}", self.client_addr);
                    close = true;
                    Reply::error(format!("request line exceeds {} bytes", REQUEST_LINE_MAX))
                }
                Some(Err(LinesCodecError::Io(e))) => {
                    error!("Error reading from client {}: {}", self.client_addr, e);
                    break;
                }
            };

            if let Err(e) = self.framed.send(reply.encode()).await {
                error!("Failed to write response to {}: {}", self.client_addr, e);
                break;
            }
            if close {
                break;
            }
        }

        info!("Client disconnected: {}", self.client_addr);
    }

    fn handle_line(&self, line: &str) -> Reply {
        match Command::parse(line) {
            Ok(cmd) => {
                debug!(client = %self.client_addr, ?cmd, "executing command");
                let reply = cmd.execute(&self.service);
                if let Reply::Error { error } = &reply {
                    warn!("Rejected command from {}: {}", self.client_addr, error);
                }
                reply
            }
            Err(e) => {
                warn!("Invalid command from {}: {}", self.client_addr, e);
                Reply::error(e)
            }
        }
    }
}
