//! JSON datagram codec for replication messages
//!
//! There is no framing: one datagram is one UTF-8 JSON object. The whole
//! message, inline image included, has to fit in a single IPv4 UDP payload.

use thiserror::Error;

use crate::error::{CoreError, Result};
use crate::types::ReplicationMessage;
use crate::MAX_DATAGRAM_SIZE;

/// Why an inbound datagram was rejected
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Empty datagram")]
    Empty,

    #[error("Datagram too large: {size} bytes (max: {max})")]
    TooLarge { size: usize, max: usize },

    #[error("Payload is not UTF-8")]
    NotUtf8,

    #[error("Malformed payload: {0}")]
    Malformed(String),

    #[error("Missing or invalid instance id")]
    MissingInstanceId,

    #[error("Negative price")]
    NegativePrice,

    #[error("Invalid image payload: {0}")]
    InvalidImage(String),

    #[error("Unsafe image file name: {0}")]
    UnsafeFileName(String),
}

/// Codec for replication datagrams
pub struct ReplicationCodec;

impl ReplicationCodec {
    /// Encode message to a datagram payload
    ///
    /// Fails with `MessageTooLarge` when the payload would not fit one datagram.
    pub fn encode(msg: &ReplicationMessage) -> Result<Vec<u8>> {
        let payload = serde_json::to_vec(msg).map_err(CoreError::from)?;

        if payload.len() > MAX_DATAGRAM_SIZE {
            return Err(CoreError::MessageTooLarge {
                size: payload.len(),
                max: MAX_DATAGRAM_SIZE,
            });
        }

        Ok(payload)
    }

    /// Decode a datagram payload
    pub fn decode(buf: &[u8]) -> std::result::Result<ReplicationMessage, DecodeError> {
        if buf.is_empty() {
            return Err(DecodeError::Empty);
        }

        if buf.len() > MAX_DATAGRAM_SIZE {
            return Err(DecodeError::TooLarge {
                size: buf.len(),
                max: MAX_DATAGRAM_SIZE,
            });
        }

        let text = std::str::from_utf8(buf).map_err(|_| DecodeError::NotUtf8)?;
        let msg: ReplicationMessage =
            serde_json::from_str(text).map_err(|e| DecodeError::Malformed(e.to_string()))?;

        if msg.instance_id.is_nil() {
            return Err(DecodeError::MissingInstanceId);
        }

        if msg.price.is_sign_negative() && !msg.price.is_zero() {
            return Err(DecodeError::NegativePrice);
        }

        Ok(msg)
    }
}
