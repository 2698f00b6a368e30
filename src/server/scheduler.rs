//! Connection scheduler
//!
//! `Cooperative` spawns every accepted connection as its own task; on a
//! current-thread runtime those tasks interleave only at I/O and at the
//! capture bridge's yield point. `Sequential` handles one connection at a
//! time, so a stream occupies the server until its client disconnects or
//! shutdown is signalled.

use super::session::{handle_connection, shutdown_signalled, SessionContext};
use crate::config::ServerMode;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// How long open sessions get to finish after shutdown is signalled
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Server {
    listener: TcpListener,
    mode: ServerMode,
    ctx: SessionContext,
}

impl Server {
    pub async fn bind<A: ToSocketAddrs>(
        addr: A,
        mode: ServerMode,
        ctx: SessionContext,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self::new(listener, mode, ctx))
    }

    pub fn new(listener: TcpListener, mode: ServerMode, ctx: SessionContext) -> Self {
        Self { listener, mode, ctx }
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until shutdown is signalled
    pub async fn run(self) -> io::Result<()> {
        info!(addr = %self.local_addr()?, mode = ?self.mode, "Listening");
        match self.mode {
            ServerMode::Cooperative => self.run_cooperative().await,
            ServerMode::Sequential => self.run_sequential().await,
        }
        info!("Server stopped");
        Ok(())
    }

    async fn run_cooperative(self) {
        let mut shutdown = self.ctx.shutdown.clone();
        let mut sessions = JoinSet::new();

        loop {
            tokio::select! {
                _ = shutdown_signalled(&mut shutdown) => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((socket, peer)) => {
                        debug!(peer = %peer, active = sessions.len(), "Accepted connection");
                        socket.set_nodelay(true).ok();
                        sessions.spawn(handle_connection(socket, peer, self.ctx.clone()));
                    }
                    Err(e) => warn!(error = %e, "Accept failed"),
                },
                Some(joined) = sessions.join_next(), if !sessions.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "Session task failed");
                    }
                }
            }
        }

        if !sessions.is_empty() {
            info!(sessions = sessions.len(), "Waiting for open sessions");
            let drain = async { while sessions.join_next().await.is_some() {} };
            if tokio::time::timeout(DRAIN_TIMEOUT, drain).await.is_err() {
                warn!(sessions = sessions.len(), "Aborting sessions that did not finish");
                sessions.shutdown().await;
            }
        }
    }

    async fn run_sequential(self) {
        let mut shutdown = self.ctx.shutdown.clone();

        loop {
            let (socket, peer) = tokio::select! {
                _ = shutdown_signalled(&mut shutdown) => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!(error = %e, "Accept failed");
                        continue;
                    }
                },
            };

            debug!(peer = %peer, "Accepted connection");
            socket.set_nodelay(true).ok();
            tokio::select! {
                _ = handle_connection(socket, peer, self.ctx.clone()) => {}
                _ = shutdown_signalled(&mut shutdown) => {
                    info!(peer = %peer, "Shutdown requested, dropping open session");
                    break;
                }
            }
        }
    }
}
