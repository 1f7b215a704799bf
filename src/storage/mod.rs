//! Storage Layer - SQLite engine plus text-slot persistence
//!
//! The system of record is an in-memory SQLite database with one table:
//! - products(id, barcode, name, price, description, created_at, updated_at)
//!
//! After every mutation the whole database image is encoded and written to a
//! key/value storage slot, and restored from it on open.

pub mod schema;
pub mod slot;
pub mod persist;
pub mod sqlite;

pub use slot::{StorageSlot, MemorySlot, FileSlot};
pub use sqlite::{ProductStore, CatalogStats};
