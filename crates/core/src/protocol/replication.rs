//! Merge rules for inbound replication messages
//!
//! Checked in order:
//! 1. messages stamped with our own instance id are ignored
//! 2. a product whose name is already in the catalog is ignored (first arrival wins)
//! 3. the image, if any, is decoded and its file name checked; a file name
//!    sent without image data is only a reference, left for the receiver to
//!    resolve against images it already has
//! 4. everything else becomes a new local product

use base64::{engine::general_purpose::STANDARD, Engine};
use std::path::Path;

use crate::catalog::Catalog;
use crate::types::{Product, ReplicationMessage};
use crate::{InstanceId, IMAGES_DIR};

use super::codec::DecodeError;

/// Name given to products that arrive without one
pub const UNKNOWN_PRODUCT_NAME: &str = "Unknown";

/// Image bytes to materialize under `Images/<file_name>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Product ready to be merged into the local catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingProduct {
    pub product: Product,
    pub image: Option<ImagePayload>,
    /// Image named by the sender without data; `product.image_path` is left empty
    pub image_reference: Option<String>,
}

/// What the listener should do with a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeDecision {
    /// Our own broadcast looped back
    OwnBroadcast,
    /// Catalog already has a product with this name
    Duplicate { name: String },
    /// New product
    Accept(IncomingProduct),
}

/// Decide how a decoded message affects the catalog
pub fn plan_merge(
    msg: &ReplicationMessage,
    own_id: &InstanceId,
    catalog: &Catalog,
) -> Result<MergeDecision, DecodeError> {
    if msg.is_from(own_id) {
        return Ok(MergeDecision::OwnBroadcast);
    }

    let name = msg
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(UNKNOWN_PRODUCT_NAME);

    if catalog.contains(name) {
        return Ok(MergeDecision::Duplicate {
            name: name.to_string(),
        });
    }

    let mut product = Product::new(name, msg.price)
        .with_barcode(msg.barcode.as_deref().map(str::trim).unwrap_or_default());

    let mut image = None;
    let mut image_reference = None;
    if let Some(file_name) = msg.image_file_name.as_deref().filter(|f| !f.is_empty()) {
        let file_name = checked_file_name(file_name)?;

        match msg.image_base64.as_deref().filter(|b| !b.is_empty()) {
            Some(encoded) => {
                let bytes = STANDARD
                    .decode(encoded)
                    .map_err(|e| DecodeError::InvalidImage(e.to_string()))?;
                product.image_path = format!("{IMAGES_DIR}/{file_name}");
                image = Some(ImagePayload {
                    file_name: file_name.to_string(),
                    bytes,
                });
            }
            None => image_reference = Some(file_name.to_string()),
        }
    }

    Ok(MergeDecision::Accept(IncomingProduct {
        product,
        image,
        image_reference,
    }))
}

/// Accept only a bare file name: no directories, no drive prefixes, no `..`
fn checked_file_name(name: &str) -> Result<&str, DecodeError> {
    let bare = Path::new(name).file_name().and_then(|f| f.to_str());
    let suspicious = name.contains(['/', '\\', ':']) || name == "." || name == "..";
    match bare {
        Some(bare) if bare == name && !suspicious => Ok(name),
        _ => Err(DecodeError::UnsafeFileName(name.to_string())),
    }
}
