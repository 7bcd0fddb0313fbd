//! Outbound product broadcasts

use std::net::{Ipv4Addr, SocketAddr};

use smartpos_core::{CoreError, ReplicationCodec, ReplicationMessage, Result};
use tokio::net::UdpSocket;
use tracing::debug;

/// Sends replication messages as single UDP datagrams
#[derive(Debug, Clone)]
pub struct Broadcaster {
    target: SocketAddr,
}

impl Broadcaster {
    pub fn new(target: SocketAddr) -> Self {
        Self { target }
    }

    /// Encode and send `msg`, returning the payload size
    ///
    /// Each call uses a fresh ephemeral socket. Oversized messages fail with
    /// `MessageTooLarge` before anything is sent.
    pub async fn send(&self, msg: &ReplicationMessage) -> Result<usize> {
        let payload = ReplicationCodec::encode(msg)?;

        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
            .await
            .map_err(|e| CoreError::NetworkError(format!("Failed to bind socket: {}", e)))?;
        socket
            .set_broadcast(true)
            .map_err(|e| CoreError::NetworkError(format!("Broadcast not permitted: {}", e)))?;

        let sent = socket
            .send_to(&payload, self.target)
            .await
            .map_err(|e| CoreError::NetworkError(format!("Send to {} failed: {}", self.target, e)))?;

        debug!("Broadcast {} bytes to {}", sent, self.target);
        Ok(sent)
    }
}
