use super::connection::ConnectionHandler;
use crate::error::Result;
use crate::leaderboard::LeaderboardService;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

pub struct LeaderboardServer {
    listener: TcpListener,
    service: LeaderboardService,
}

impl LeaderboardServer {
    pub async fn bind(addr: &str, service: LeaderboardService) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(LeaderboardServer { listener, service })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until `cancel` fires; each one gets its own task.
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        info!("Leaderboard server listening on {}", self.local_addr()?);

        loop {
            let accepted = tokio::select! {
                _ = cancel.cancelled() => break,
                accepted = self.listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, addr)) => {
                    let handler = ConnectionHandler::new(stream, self.service.clone(), addr.to_string());
                    tokio::spawn(handler.run(cancel.child_token()));
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            }
        }

        info!("Leaderboard server stopped accepting connections");
        Ok(())
    }
}
