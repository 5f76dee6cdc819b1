use crate::error::{NodeError, Result};
use crate::sync::SyncCoordinator;
use log::{error, info, warn};
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;

/// TCP accept loop for inbound peer connections. Accepted connections are
/// handed to the coordinator, which owns all peer state.
pub struct Server {
    coordinator: Arc<SyncCoordinator>,
    listener: TcpListener,
}

impl Server {
    /// Bind the listening socket. Binding is separate from running so callers
    /// can learn the actual address when binding to an ephemeral port.
    pub fn bind(coordinator: Arc<SyncCoordinator>, addr: &str) -> Result<Server> {
        let listener = TcpListener::bind(addr)
            .map_err(|e| NodeError::Network(format!("Failed to bind to {addr}: {e}")))?;
        Ok(Server {
            coordinator,
            listener,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| NodeError::Network(format!("Failed to read local address: {e}")))
    }

    /// Accept connections until the process exits. A failed accept or a
    /// rejected peer is logged and skipped; it never stops the loop.
    pub fn run(&self) -> Result<()> {
        info!("listening for peers on {}", self.local_addr()?);

        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => {
                    let peer_addr = match stream.peer_addr() {
                        Ok(addr) => addr.to_string(),
                        Err(e) => {
                            error!("Failed to get peer address: {e}");
                            continue;
                        }
                    };

                    if let Err(e) = self.coordinator.accept_peer(stream, peer_addr.clone()) {
                        warn!("Rejected inbound connection from {peer_addr}: {e}");
                    }
                }
                Err(e) => {
                    error!("Error accepting connection: {e}");
                }
            }
        }

        Ok(())
    }
}
