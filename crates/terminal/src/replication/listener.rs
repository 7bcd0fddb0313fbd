//! Inbound replication loop

use std::net::SocketAddr;

use smartpos_core::{CoreError, DecodeError, ReplicationCodec, Result, MAX_DATAGRAM_SIZE};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::catalog_service::{CatalogHandle, MergeOutcome};

/// What happened to one received datagram
#[derive(Debug)]
pub enum DatagramOutcome {
    /// Payload could not be decoded and was dropped
    Discarded(DecodeError),
    /// Payload was handed to the catalog
    Processed(MergeOutcome),
}

/// Receives peer broadcasts and merges them into the catalog
pub struct Listener {
    socket: UdpSocket,
    catalog: CatalogHandle,
}

impl Listener {
    /// Bind the replication socket with broadcast enabled
    pub async fn bind(addr: SocketAddr, catalog: CatalogHandle) -> Result<Self> {
        let std_socket = std::net::UdpSocket::bind(addr)
            .map_err(|e| CoreError::NetworkError(format!("Failed to bind {}: {}", addr, e)))?;
        std_socket.set_broadcast(true)?;
        std_socket.set_nonblocking(true)?;
        let socket = UdpSocket::from_std(std_socket)?;

        Ok(Self { socket, catalog })
    }

    #[cfg(test)]
    fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Run the loop on its own task
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    /// Receive until `cancel` fires
    ///
    /// No single datagram or receive error stops the loop.
    pub async fn run(self, cancel: CancellationToken) {
        match self.socket.local_addr() {
            Ok(addr) => info!("Replication listener on {}", addr),
            Err(_) => info!("Replication listener started"),
        }

        // One byte of headroom so oversized payloads are seen as such
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE + 1];
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Replication listener stopping");
                    break;
                }
                received = self.socket.recv_from(&mut buf) => {
                    match received {
                        Ok((len, peer)) => {
                            let outcome = self.handle_datagram(&buf[..len]).await;
                            log_outcome(peer, &outcome);
                        }
                        Err(e) => warn!("Receive failed: {}", e),
                    }
                }
            }
        }
    }

    /// Decode one payload and offer it to the catalog
    pub async fn handle_datagram(&self, data: &[u8]) -> DatagramOutcome {
        let message = match ReplicationCodec::decode(data) {
            Ok(message) => message,
            Err(e) => return DatagramOutcome::Discarded(e),
        };

        match self.catalog.merge_remote(message).await {
            Ok(outcome) => DatagramOutcome::Processed(outcome),
            Err(e) => DatagramOutcome::Processed(MergeOutcome::NotPersisted(e.to_string())),
        }
    }
}

fn log_outcome(peer: SocketAddr, outcome: &DatagramOutcome) {
    match outcome {
        DatagramOutcome::Discarded(e) => debug!("Discarded datagram from {}: {}", peer, e),
        DatagramOutcome::Processed(MergeOutcome::OwnBroadcast) => {}
        DatagramOutcome::Processed(MergeOutcome::NotPersisted(e)) => {
            warn!("Product from {} not saved: {}", peer, e)
        }
        DatagramOutcome::Processed(outcome) => debug!("Datagram from {}: {:?}", peer, outcome),
    }
}
