//! Catalog ownership
//!
//! One task owns the in-memory catalog, its store and the image directory.
//! Everything else (the shell, the product entry flow and the replication
//! listener) talks to it through a cloneable [`CatalogHandle`], so local adds
//! and peer merges are applied one at a time and the file on disk always
//! matches what readers see.

use rust_decimal::Decimal;
use smartpos_core::protocol::{plan_merge, IncomingProduct};
use smartpos_core::{
    Catalog, CatalogStore, CoreError, InstanceId, MergeDecision, Product, ReplicationMessage,
    Result,
};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::images::ImageStore;

/// Command queue depth
const COMMAND_BUFFER: usize = 64;
/// Arrival notifications kept for slow subscribers
const EVENT_BUFFER: usize = 32;

/// A peer's product was added to the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductArrived {
    pub name: String,
    pub price: Decimal,
}

/// Result of offering a peer message to the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Added and persisted
    Merged { name: String, image_written: bool },
    /// Our own broadcast looped back
    OwnBroadcast,
    /// A product with this name already exists
    Duplicate { name: String },
    /// Message content was unusable
    Rejected(String),
    /// Save failed; the catalog was left unchanged
    NotPersisted(String),
}

enum Command {
    AddLocal {
        product: Product,
        reply: oneshot::Sender<Result<()>>,
    },
    MergeRemote {
        message: Box<ReplicationMessage>,
        reply: oneshot::Sender<MergeOutcome>,
    },
    Snapshot {
        reply: oneshot::Sender<Vec<Product>>,
    },
    FindByName {
        name: String,
        reply: oneshot::Sender<Option<Product>>,
    },
    FindByBarcode {
        code: String,
        reply: oneshot::Sender<Option<Product>>,
    },
    Search {
        query: String,
        reply: oneshot::Sender<Vec<Product>>,
    },
}

/// Cloneable access to the catalog task
#[derive(Clone)]
pub struct CatalogHandle {
    tx: mpsc::Sender<Command>,
    events: broadcast::Sender<ProductArrived>,
}

impl CatalogHandle {
    /// Add a product entered on this terminal
    ///
    /// Fails with `DuplicateProduct` if the name is taken, or `Persistence` if
    /// the catalog could not be saved (the product is then not kept).
    pub async fn add_local(&self, product: Product) -> Result<()> {
        self.request(|reply| Command::AddLocal { product, reply })
            .await?
    }

    /// Offer a decoded peer message to the catalog
    pub async fn merge_remote(&self, message: ReplicationMessage) -> Result<MergeOutcome> {
        self.request(|reply| Command::MergeRemote {
            message: Box::new(message),
            reply,
        })
        .await
    }

    pub async fn products(&self) -> Result<Vec<Product>> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<Product>> {
        let name = name.to_string();
        self.request(|reply| Command::FindByName { name, reply })
            .await
    }

    pub async fn find_by_barcode(&self, code: &str) -> Result<Option<Product>> {
        let code = code.to_string();
        self.request(|reply| Command::FindByBarcode { code, reply })
            .await
    }

    pub async fn search(&self, query: &str) -> Result<Vec<Product>> {
        let query = query.to_string();
        self.request(|reply| Command::Search { query, reply })
            .await
    }

    /// Receive a notification for every product merged from a peer
    pub fn subscribe(&self) -> broadcast::Receiver<ProductArrived> {
        self.events.subscribe()
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| CoreError::CatalogClosed)?;
        rx.await.map_err(|_| CoreError::CatalogClosed)
    }
}

/// Task state behind a [`CatalogHandle`]
pub struct CatalogService {
    catalog: Catalog,
    store: Box<dyn CatalogStore>,
    images: ImageStore,
    instance_id: InstanceId,
    rx: mpsc::Receiver<Command>,
    events: broadcast::Sender<ProductArrived>,
}

impl CatalogService {
    /// Start the catalog task
    ///
    /// The task ends once every handle has been dropped.
    pub fn spawn(
        catalog: Catalog,
        store: Box<dyn CatalogStore>,
        images: ImageStore,
        instance_id: InstanceId,
    ) -> (CatalogHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let (events, _) = broadcast::channel(EVENT_BUFFER);

        let service = Self {
            catalog,
            store,
            images,
            instance_id,
            rx,
            events: events.clone(),
        };
        let task = tokio::spawn(service.run());

        (CatalogHandle { tx, events }, task)
    }

    async fn run(mut self) {
        info!("Catalog service started with {} products", self.catalog.len());
        while let Some(command) = self.rx.recv().await {
            self.handle(command);
        }
        info!("Catalog service stopped");
    }

    fn handle(&mut self, command: Command) {
        // A dropped reply receiver just means the caller stopped waiting
        match command {
            Command::AddLocal { product, reply } => {
                let _ = reply.send(self.add_local(product));
            }
            Command::MergeRemote { message, reply } => {
                let _ = reply.send(self.merge_remote(&message));
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.catalog.products().to_vec());
            }
            Command::FindByName { name, reply } => {
                let _ = reply.send(self.catalog.find_by_name(&name).cloned());
            }
            Command::FindByBarcode { code, reply } => {
                let _ = reply.send(self.catalog.find_by_barcode(&code).cloned());
            }
            Command::Search { query, reply } => {
                let found = self.catalog.search(&query).into_iter().cloned().collect();
                let _ = reply.send(found);
            }
        }
    }

    fn add_local(&mut self, product: Product) -> Result<()> {
        let name = product.name.clone();
        if !self.catalog.insert_if_absent(product) {
            return Err(CoreError::DuplicateProduct(name));
        }
        self.persist_or_revert(&name)?;
        info!("Added product {}", name);
        Ok(())
    }

    fn merge_remote(&mut self, message: &ReplicationMessage) -> MergeOutcome {
        let incoming = match plan_merge(message, &self.instance_id, &self.catalog) {
            Ok(MergeDecision::Accept(incoming)) => incoming,
            Ok(MergeDecision::OwnBroadcast) => return MergeOutcome::OwnBroadcast,
            Ok(MergeDecision::Duplicate { name }) => {
                debug!("Ignoring duplicate product {}", name);
                return MergeOutcome::Duplicate { name };
            }
            Err(e) => {
                debug!("Rejected replication message: {}", e);
                return MergeOutcome::Rejected(e.to_string());
            }
        };

        let IncomingProduct {
            mut product,
            image,
            image_reference,
        } = incoming;
        let mut image_written = false;
        if let Some(image) = image {
            match self.images.materialize(&image.file_name, &image.bytes) {
                Ok(written) => image_written = written,
                Err(e) => {
                    warn!("Image for {} not saved: {}", product.name, e);
                    product.image_path.clear();
                }
            }
        } else if let Some(file_name) = image_reference {
            // Only point at images this terminal actually has
            if self.images.contains(&file_name) {
                product.image_path = ImageStore::relative_path(&file_name);
            } else {
                debug!("{} refers to missing image {}", product.name, file_name);
            }
        }

        let name = product.name.clone();
        let price = product.price;
        // plan_merge already checked the name against this same catalog
        self.catalog.insert_if_absent(product);
        if let Err(e) = self.persist_or_revert(&name) {
            return MergeOutcome::NotPersisted(e.to_string());
        }

        info!("Merged product {} from peer {}", name, message.instance_id);
        let _ = self.events.send(ProductArrived {
            name: name.clone(),
            price,
        });
        MergeOutcome::Merged {
            name,
            image_written,
        }
    }

    /// Save the catalog, removing `name` again if the save fails
    fn persist_or_revert(&mut self, name: &str) -> Result<()> {
        if let Err(e) = self.store.save(self.catalog.products()) {
            warn!("Failed to save catalog, dropping {}: {}", name, e);
            self.catalog.remove(name);
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartpos_core::MemoryCatalogStore;

    fn setup(store: MemoryCatalogStore) -> (CatalogHandle, InstanceId, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let images = ImageStore::new(dir.path()).unwrap();
        let id = InstanceId::generate();
        let catalog = Catalog::from_products(store.load().unwrap());
        let (handle, _task) = CatalogService::spawn(catalog, Box::new(store), images, id);
        (handle, id, dir)
    }

    fn sugar(from: InstanceId) -> ReplicationMessage {
        ReplicationMessage::new(from, "Sugar 1kg", Decimal::from(250))
    }

    #[tokio::test]
    async fn test_add_local_and_query() {
        let (catalog, _, _dir) = setup(MemoryCatalogStore::new());
        catalog
            .add_local(Product::new("Milk 1L", Decimal::from(120)).with_barcode("6001"))
            .await
            .unwrap();

        assert_eq!(catalog.products().await.unwrap().len(), 1);
        assert!(catalog.find_by_name("Milk 1L").await.unwrap().is_some());
        assert!(catalog.find_by_barcode(" 6001 ").await.unwrap().is_some());
        assert_eq!(catalog.search("milk").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_add_local_duplicate() {
        let (catalog, _, _dir) = setup(MemoryCatalogStore::new());
        catalog
            .add_local(Product::new("Milk 1L", Decimal::from(120)))
            .await
            .unwrap();
        let err = catalog
            .add_local(Product::new("Milk 1L", Decimal::from(99)))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateProduct(_)));
    }

    #[tokio::test]
    async fn test_failed_save_keeps_catalog_unchanged() {
        let (catalog, _, _dir) = setup(MemoryCatalogStore::failing());
        let err = catalog
            .add_local(Product::new("Milk 1L", Decimal::from(120)))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Persistence(_)));
        assert!(catalog.products().await.unwrap().is_empty());

        let outcome = catalog
            .merge_remote(sugar(InstanceId::generate()))
            .await
            .unwrap();
        assert!(matches!(outcome, MergeOutcome::NotPersisted(_)));
        assert!(catalog.products().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_merge_remote_notifies() {
        let (catalog, _, _dir) = setup(MemoryCatalogStore::new());
        let mut events = catalog.subscribe();

        let outcome = catalog
            .merge_remote(sugar(InstanceId::generate()))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            MergeOutcome::Merged {
                name: "Sugar 1kg".to_string(),
                image_written: false
            }
        );

        let arrived = events.recv().await.unwrap();
        assert_eq!(arrived.name, "Sugar 1kg");
        assert_eq!(arrived.price, Decimal::from(250));

        let product = catalog.find_by_name("Sugar 1kg").await.unwrap().unwrap();
        assert_eq!(product.stock_qty, 100);
    }

    #[tokio::test]
    async fn test_merge_own_and_duplicate() {
        let (catalog, own, _dir) = setup(MemoryCatalogStore::with_products(vec![Product::new(
            "Sugar 1kg",
            Decimal::from(200),
        )]));

        let outcome = catalog.merge_remote(sugar(own)).await.unwrap();
        assert_eq!(outcome, MergeOutcome::OwnBroadcast);

        let outcome = catalog
            .merge_remote(sugar(InstanceId::generate()))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            MergeOutcome::Duplicate {
                name: "Sugar 1kg".to_string()
            }
        );

        // First arrival wins
        let product = catalog.find_by_name("Sugar 1kg").await.unwrap().unwrap();
        assert_eq!(product.price, Decimal::from(200));
    }

    #[tokio::test]
    async fn test_merge_writes_image_once() {
        let (catalog, _, dir) = setup(MemoryCatalogStore::new());
        let msg = sugar(InstanceId::generate()).with_image("abc.jpg", b"jpeg");

        let outcome = catalog.merge_remote(msg).await.unwrap();
        assert_eq!(
            outcome,
            MergeOutcome::Merged {
                name: "Sugar 1kg".to_string(),
                image_written: true
            }
        );
        let on_disk = std::fs::read(dir.path().join("Images").join("abc.jpg")).unwrap();
        assert_eq!(on_disk, b"jpeg");

        let product = catalog.find_by_name("Sugar 1kg").await.unwrap().unwrap();
        assert_eq!(product.image_path, "Images/abc.jpg");

        let other = ReplicationMessage::new(InstanceId::generate(), "Salt", Decimal::from(50))
            .with_image("abc.jpg", b"other");
        let outcome = catalog.merge_remote(other).await.unwrap();
        assert!(matches!(
            outcome,
            MergeOutcome::Merged {
                image_written: false,
                ..
            }
        ));
        let on_disk = std::fs::read(dir.path().join("Images").join("abc.jpg")).unwrap();
        assert_eq!(on_disk, b"jpeg");
    }

    #[tokio::test]
    async fn test_merge_image_reference_without_data() {
        let (catalog, _, dir) = setup(MemoryCatalogStore::new());
        let mut msg = sugar(InstanceId::generate()).with_image("abc.jpg", b"jpeg");
        msg.image_base64 = None;
        catalog.merge_remote(msg).await.unwrap();
        let product = catalog.find_by_name("Sugar 1kg").await.unwrap().unwrap();
        assert!(product.image_path.is_empty());
        assert!(!dir.path().join("Images").join("abc.jpg").exists());

        // A name this terminal already stores is linked
        std::fs::write(dir.path().join("Images").join("salt.png"), b"png").unwrap();
        let mut msg = ReplicationMessage::new(InstanceId::generate(), "Salt", Decimal::from(50))
            .with_image("salt.png", b"png");
        msg.image_base64 = None;
        catalog.merge_remote(msg).await.unwrap();
        let product = catalog.find_by_name("Salt").await.unwrap().unwrap();
        assert_eq!(product.image_path, "Images/salt.png");
    }

    #[tokio::test]
    async fn test_merge_rejects_path_in_image_name() {
        let (catalog, _, _dir) = setup(MemoryCatalogStore::new());
        let msg = sugar(InstanceId::generate()).with_image("../evil.jpg", b"x");
        let outcome = catalog.merge_remote(msg).await.unwrap();
        assert!(matches!(outcome, MergeOutcome::Rejected(_)));
        assert!(catalog.products().await.unwrap().is_empty());
    }
}
