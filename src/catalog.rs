//! Catalog context
//!
//! A `Catalog` owns one engine connection together with the storage slot it
//! persists to. There is no process-wide state: any number of catalogs can
//! coexist, each with its own slot.
//!
//! Every successful mutation writes the whole database image through to the
//! slot before returning.

use crate::interchange::{self, ImportMode, ImportSummary};
use crate::product::{Product, ProductFields};
use crate::storage::persist::{self, DEFAULT_KEY};
use crate::storage::{CatalogStats, MemorySlot, ProductStore, StorageSlot};
use crate::{Error, Result};

/// How a catalog came to hold its current data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenState {
    /// Restored from the slot
    Restored,
    /// Nothing was saved yet; started empty
    Fresh,
    /// The saved image could not be decoded; started empty
    Recovered { reason: String },
}

/// The product catalog: repository, persistence and bulk interchange behind
/// one request/response surface.
pub struct Catalog<S: StorageSlot> {
    store: ProductStore,
    slot: S,
    key: String,
    state: OpenState,
}

impl Catalog<MemorySlot> {
    /// Catalog backed by a fresh in-memory slot (for testing)
    pub fn in_memory() -> Result<Self> {
        Self::open(MemorySlot::new(), DEFAULT_KEY)
    }
}

impl<S: StorageSlot> Catalog<S> {
    /// Open the catalog saved in `slot` under `key`.
    ///
    /// A missing key starts an empty catalog. A corrupt image is logged and
    /// also starts an empty catalog; the slot is overwritten on the next save.
    /// A slot that cannot be read at all is an error, never a fresh start.
    pub fn open(slot: S, key: impl Into<String>) -> Result<Self> {
        let key = key.into();

        let (store, state) = match persist::load(&slot, &key) {
            Ok(Some(conn)) => (ProductStore::from_connection(conn)?, OpenState::Restored),
            Ok(None) => (ProductStore::open_in_memory()?, OpenState::Fresh),
            Err(Error::CorruptState(reason)) => {
                tracing::warn!("Saved catalog under {:?} is corrupt ({}); starting empty", key, reason);
                (ProductStore::open_in_memory()?, OpenState::Recovered { reason })
            }
            Err(e) => return Err(e),
        };

        tracing::info!("Opened catalog {:?}: {:?}, {} products", key, state, store.count()?);
        Ok(Self { store, slot, key, state })
    }

    pub fn open_state(&self) -> &OpenState {
        &self.state
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn slot(&self) -> &S {
        &self.slot
    }

    pub fn store(&self) -> &ProductStore {
        &self.store
    }

    /// Write the current database image to the slot
    pub fn persist(&mut self) -> Result<usize> {
        persist::save(self.store.connection(), &mut self.slot, &self.key)
    }

    // ========== Repository ==========

    pub fn create(&mut self, fields: ProductFields) -> Result<Product> {
        let product = self.store.create(fields)?;
        self.persist()?;
        Ok(product)
    }

    pub fn update(&mut self, id: i64, fields: ProductFields) -> Result<Product> {
        let product = self.store.update(id, fields)?;
        self.persist()?;
        Ok(product)
    }

    pub fn delete(&mut self, id: i64) -> Result<()> {
        self.store.delete(id)?;
        self.persist()?;
        Ok(())
    }

    pub fn get(&self, id: i64) -> Result<Option<Product>> {
        self.store.get(id)
    }

    pub fn list(&self) -> Result<Vec<Product>> {
        self.store.list()
    }

    pub fn search(&self, term: Option<&str>) -> Result<Vec<Product>> {
        self.store.search(term)
    }

    pub fn stats(&self) -> Result<CatalogStats> {
        self.store.stats()
    }

    // ========== Bulk Interchange ==========

    pub fn export_sql(&self) -> Result<String> {
        interchange::export_sql(&self.store)
    }

    /// Import a SQL script, then save exactly once
    pub fn import_sql(&mut self, text: &str, mode: ImportMode) -> Result<ImportSummary> {
        let summary = interchange::import_sql(&mut self.store, text, mode)?;
        self.persist()?;
        Ok(summary)
    }

    /// Drop every product and the saved image, leaving an empty catalog
    pub fn reset(&mut self) -> Result<()> {
        self.slot.remove_item(&self.key)?;
        self.store = ProductStore::open_in_memory()?;
        self.state = OpenState::Fresh;
        tracing::info!("Reset catalog {:?}", self.key);
        Ok(())
    }

    /// Give back the slot, e.g. to reopen the catalog from it
    pub fn into_slot(self) -> S {
        self.slot
    }
}
