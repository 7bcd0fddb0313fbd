//! Product entry: validate, store, then announce to peers

use smartpos_core::{CoreError, InstanceId, Product, ProductDraft, Result};
use tracing::{info, warn};

use crate::catalog_service::CatalogHandle;
use crate::images::{ImageStore, StoredImage};
use crate::replication::Broadcaster;

/// A product that was saved locally
#[derive(Debug)]
pub struct EntrySaved {
    pub product: Product,
    /// Set when the product was saved but peers were not told
    pub broadcast_error: Option<CoreError>,
}

pub struct ProductEntry {
    catalog: CatalogHandle,
    images: ImageStore,
    broadcaster: Broadcaster,
    instance_id: InstanceId,
}

impl ProductEntry {
    pub fn new(
        catalog: CatalogHandle,
        images: ImageStore,
        broadcaster: Broadcaster,
        instance_id: InstanceId,
    ) -> Self {
        Self {
            catalog,
            images,
            broadcaster,
            instance_id,
        }
    }

    /// Save a new product and broadcast it
    ///
    /// Validation, image copy and catalog errors abort the save. A failed
    /// broadcast does not: the product stays saved and the error is returned
    /// in [`EntrySaved::broadcast_error`].
    pub async fn save(&self, draft: &ProductDraft) -> Result<EntrySaved> {
        let entry = draft.validate()?;

        let image = match &entry.image_path {
            Some(path) if path.exists() => Some(self.images.import(path)?),
            Some(path) => {
                warn!("Image {} not found, saving without image", path.display());
                None
            }
            None => None,
        };

        let product = entry.to_product(image.as_ref().map(StoredImage::relative_path).as_deref());
        if let Err(e) = self.catalog.add_local(product.clone()).await {
            if let Some(image) = &image {
                self.images.discard(&image.file_name);
            }
            return Err(e);
        }

        let mut message = entry.to_message(self.instance_id);
        if let Some(image) = &image {
            message = message.with_image(&image.file_name, &image.bytes);
        }

        let broadcast_error = match self.broadcaster.send(&message).await {
            Ok(_) => {
                info!("Broadcast product {}", product.name);
                None
            }
            Err(e) => {
                warn!("Network broadcast failed for {}: {}", product.name, e);
                Some(e)
            }
        };

        Ok(EntrySaved {
            product,
            broadcast_error,
        })
    }
}
