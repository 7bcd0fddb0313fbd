//! Product entry form validation

use std::path::PathBuf;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::error::{CoreError, Result};
use crate::types::{Product, ReplicationMessage};
use crate::{InstanceId, DEFAULT_VAT_PERCENT};

/// Raw fields captured by the product entry form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductDraft {
    pub name: String,
    pub barcode: String,
    pub price: String,
    pub vat: String,
    pub description: String,
    pub image_path: Option<PathBuf>,
}

/// Draft that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedEntry {
    pub name: String,
    pub barcode: String,
    pub price: Decimal,
    /// VAT percentage
    pub vat: Decimal,
    pub description: String,
    pub image_path: Option<PathBuf>,
}

impl ProductDraft {
    /// Check required fields and parse numbers
    ///
    /// Name is required and price must be a non-negative number. A blank or
    /// unreadable VAT falls back to the default percentage.
    pub fn validate(&self) -> Result<ValidatedEntry> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(CoreError::validation("Please enter product name."));
        }

        let price = Decimal::from_str(self.price.trim())
            .ok()
            .filter(|p| !p.is_sign_negative() || p.is_zero())
            .ok_or_else(|| CoreError::validation("Please enter a valid price."))?;

        let vat = Decimal::from_str(self.vat.trim())
            .unwrap_or_else(|_| Decimal::from(DEFAULT_VAT_PERCENT));

        let image_path = self
            .image_path
            .as_ref()
            .filter(|p| !p.as_os_str().is_empty())
            .cloned();

        Ok(ValidatedEntry {
            name: name.to_string(),
            barcode: self.barcode.trim().to_string(),
            price,
            vat,
            description: self.description.trim().to_string(),
            image_path,
        })
    }
}

impl ValidatedEntry {
    /// Catalog record; `image_path` is the stored copy relative to the data dir
    pub fn to_product(&self, image_path: Option<&str>) -> Product {
        Product::new(&self.name, self.price)
            .with_barcode(&self.barcode)
            .with_image_path(image_path.unwrap_or_default())
    }

    /// Broadcast payload, without image
    pub fn to_message(&self, instance_id: InstanceId) -> ReplicationMessage {
        ReplicationMessage::new(instance_id, &self.name, self.price)
            .with_barcode(&self.barcode)
            .with_vat(self.vat)
            .with_description(&self.description)
    }
}
