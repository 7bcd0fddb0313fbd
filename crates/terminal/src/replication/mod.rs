//! LAN product replication over UDP broadcast
//!
//! - [`Broadcaster`] sends one datagram per locally entered product
//! - [`Listener`] receives peer datagrams and merges them into the catalog

mod broadcaster;
mod listener;

pub use broadcaster::Broadcaster;
pub use listener::Listener;
