//! Origin instance identifier for replication
//!
//! Every running terminal generates one `InstanceId` at startup and stamps it on
//! each product it broadcasts. The listener compares the stamp with its own id
//! to drop its own broadcasts when they loop back through the LAN.
//!
//! ## Derives
//! - `Copy`: 16 bytes, cheap to copy by value
//! - `Hash`/`Eq`: usable as a map key
//! - `Serialize/Deserialize`: hyphenated UUID string on the wire

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::protocol::DecodeError;

/// Opaque per-process identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(Uuid);

impl InstanceId {
    /// Generate a fresh random identifier
    ///
    /// # Example
    /// ```
    /// # use smartpos_core::InstanceId;
    /// let a = InstanceId::generate();
    /// let b = InstanceId::generate();
    /// assert_ne!(a, b);
    /// ```
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Whether this is the all-zero id (an unset field on the wire)
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for InstanceId {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| DecodeError::MissingInstanceId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_id_generation() {
        let id1 = InstanceId::generate();
        let id2 = InstanceId::generate();
        assert_ne!(id1, id2, "Instance ids should be unique");
        assert!(!id1.is_nil());
    }

    #[test]
    fn test_instance_id_display_is_hyphenated() {
        let id = InstanceId::generate();
        let text = id.to_string();
        assert_eq!(text.len(), 36);
        assert_eq!(text.chars().filter(|c| *c == '-').count(), 4);
    }

    #[test]
    fn test_instance_id_parse() {
        let id = InstanceId::generate();
        let parsed: InstanceId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-uuid".parse::<InstanceId>().is_err());
    }

    #[test]
    fn test_instance_id_serializes_as_string() {
        let id = InstanceId::generate();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
    }

    #[test]
    fn test_instance_id_copy() {
        let id1 = InstanceId::generate();
        let id2 = id1;
        assert_eq!(id1, id2);
    }
}
