//! Product replication protocol
//!
//! - `codec`: one JSON document per UDP datagram
//! - `replication`: what a listener does with a decoded message

pub mod codec;
pub mod replication;

pub use codec::{DecodeError, ReplicationCodec};
pub use replication::{plan_merge, ImagePayload, IncomingProduct, MergeDecision};
