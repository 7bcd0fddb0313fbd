//! Domain types for the point-of-sale terminal

mod message;
mod product;
mod sale;

pub use message::ReplicationMessage;
pub use product::Product;
pub use sale::{PaymentMethod, SaleRecord};
