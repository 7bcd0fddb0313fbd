//! SmartPOS Core - Shared business logic for point-of-sale terminals
//!
//! This crate provides:
//! - Domain types (products, replication messages, sale records)
//! - Cart engine with tax computation and checkout
//! - Receipt formatting
//! - Product replication protocol (JSON datagram codec, merge rules)
//! - Catalog and sales persistence, with unreadable files set aside
//! - Product entry validation and credential hashing
//! - Error types

use rust_decimal::Decimal;

/// Well-known UDP port for product replication broadcasts
pub const REPLICATION_PORT: u16 = 50000;
/// Largest payload a single UDP/IPv4 datagram can carry
pub const MAX_DATAGRAM_SIZE: usize = 65_507;
/// Stock quantity assigned to newly created products
pub const DEFAULT_STOCK_QTY: u32 = 100;
/// VAT percentage used when product entry leaves it blank
pub const DEFAULT_VAT_PERCENT: u32 = 16;
/// Directory (relative to the data dir) holding product images
pub const IMAGES_DIR: &str = "Images";

/// Sales tax applied at checkout (16%)
pub fn default_tax_rate() -> Decimal {
    Decimal::new(16, 2)
}

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod entry;
pub mod error;
pub mod identity;
pub mod money;
pub mod printer;
pub mod protocol;
pub mod receipt;
pub mod sales;
pub mod storage;
pub mod types;

// Re-export common types
pub use cart::{Cart, CartLine, CheckoutOutcome, HoldOutcome};
pub use catalog::{Catalog, CatalogStore, JsonCatalogStore, MemoryCatalogStore};
pub use entry::{ProductDraft, ValidatedEntry};
pub use error::{CoreError, Result};
pub use identity::InstanceId;
pub use printer::{MockPrinter, ReceiptPrinter};
pub use protocol::{DecodeError, MergeDecision, ReplicationCodec};
pub use receipt::{Receipt, ReceiptLayout, ReceiptLine};
pub use sales::{SalesLedger, SalesSummary};
pub use types::{PaymentMethod, Product, ReplicationMessage, SaleRecord};
