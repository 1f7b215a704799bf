//! # Stockroom - Local Product Catalog
//!
//! A single-user inventory manager backed by an embedded SQLite engine.
//!
//! Stockroom provides:
//! - Product records (barcode, name, price, description) with engine-enforced barcode uniqueness
//! - Injection-safe CRUD and search over the product table
//! - Whole-database persistence into a text-only key/value storage slot
//! - Bulk export to, and best-effort import from, plain SQL scripts

pub mod product;
pub mod storage;
pub mod interchange;
pub mod catalog;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use product::{Product, ProductFields};
pub use storage::{FileSlot, MemorySlot, ProductStore, StorageSlot};
pub use interchange::{ImportMode, ImportSummary};
pub use catalog::Catalog;

/// Result type alias for Stockroom operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Stockroom operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Product not found: {0}")]
    NotFound(i64),

    #[error("Storage failure: {0}")]
    StorageFailure(String),

    #[error("Corrupt saved state: {0}")]
    CorruptState(String),

    #[error("Engine error: {0}")]
    Engine(rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(ref code, ref msg)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                let detail = msg.clone().unwrap_or_else(|| code.to_string());
                Error::ConstraintViolation(detail)
            }
            other => Error::Engine(other),
        }
    }
}

impl Error {
    /// Short machine-readable tag, used by the JSON output mode
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation_error",
            Error::ConstraintViolation(_) => "constraint_violation",
            Error::NotFound(_) => "not_found",
            Error::StorageFailure(_) => "storage_failure",
            Error::CorruptState(_) => "corrupt_state",
            Error::Engine(_) => "engine_error",
            Error::Io(_) => "io_error",
        }
    }
}
