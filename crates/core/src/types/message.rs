//! Product replication message

use base64::{engine::general_purpose::STANDARD, Engine};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::InstanceId;

/// Broadcast payload announcing a newly entered product
///
/// Only exists on the wire. One datagram carries exactly one message;
/// the image, if any, travels inline as base64.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicationMessage {
    /// Sending process
    #[serde(alias = "InstanceId")]
    pub instance_id: InstanceId,

    #[serde(default, alias = "Name")]
    pub name: Option<String>,

    #[serde(default, alias = "Barcode")]
    pub barcode: Option<String>,

    #[serde(with = "rust_decimal::serde::float", alias = "Price")]
    pub price: Decimal,

    /// VAT percentage
    #[serde(
        default = "default_vat",
        with = "rust_decimal::serde::float",
        alias = "VAT"
    )]
    pub vat: Decimal,

    #[serde(default, alias = "Description")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none", alias = "ImageFileName")]
    pub image_file_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none", alias = "ImageBase64")]
    pub image_base64: Option<String>,
}

fn default_vat() -> Decimal {
    Decimal::from(crate::DEFAULT_VAT_PERCENT)
}

impl ReplicationMessage {
    /// Create message without image
    pub fn new(instance_id: InstanceId, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            instance_id,
            name: Some(name.into()),
            barcode: None,
            price,
            vat: default_vat(),
            description: None,
            image_file_name: None,
            image_base64: None,
        }
    }

    /// Set barcode
    pub fn with_barcode(mut self, barcode: impl Into<String>) -> Self {
        self.barcode = Some(barcode.into());
        self
    }

    /// Set VAT percentage
    pub fn with_vat(mut self, vat: Decimal) -> Self {
        self.vat = vat;
        self
    }

    /// Set description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attach image bytes, base64-encoded inline
    pub fn with_image(mut self, file_name: impl Into<String>, bytes: &[u8]) -> Self {
        self.image_file_name = Some(file_name.into());
        self.image_base64 = Some(STANDARD.encode(bytes));
        self
    }

    /// Whether this message was sent by `instance_id`
    pub fn is_from(&self, instance_id: &InstanceId) -> bool {
        self.instance_id == *instance_id
    }
}
