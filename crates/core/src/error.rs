//! Error types for smartpos-core

use thiserror::Error;

use crate::protocol::DecodeError;

/// Core error type
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid message: {0}")]
    Decode(#[from] DecodeError),

    #[error("Message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("{0}")]
    Validation(String),

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Product already exists: {0}")]
    DuplicateProduct(String),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Print failed: {0}")]
    Print(String),

    #[error("Image processing failed: {0}")]
    Image(String),

    #[error("Authentication failed")]
    AuthFailed,

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("Username already taken: {0}")]
    UsernameTaken(String),

    #[error("No data directory found")]
    NoDataDir,

    #[error("Catalog unavailable")]
    CatalogClosed,
}

/// Result type alias
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Shorthand for user input errors
    pub fn validation(msg: impl Into<String>) -> Self {
        CoreError::Validation(msg.into())
    }
}
