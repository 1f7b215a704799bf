//! Persistence adapter
//!
//! Round-trips the engine's whole-database byte image through a text-only
//! storage slot. The image is encoded as a JSON array with one integer per
//! byte and written under a single well-known key. There is no incremental
//! encoding: every save re-serializes the full database.

use rusqlite::{Connection, DatabaseName};
use crate::{Error, Result};
use super::slot::StorageSlot;

/// Slot key used when the caller does not configure one
pub const DEFAULT_KEY: &str = "stockroom.products.db";

/// Encode a byte image as text
pub fn encode(bytes: &[u8]) -> Result<String> {
    serde_json::to_string(bytes)
        .map_err(|e| Error::StorageFailure(format!("cannot encode image: {}", e)))
}

/// Decode text produced by [`encode`]
pub fn decode(text: &str) -> Result<Vec<u8>> {
    serde_json::from_str::<Vec<u8>>(text)
        .map_err(|e| Error::CorruptState(format!("cannot decode saved image: {}", e)))
}

/// Serialize the main database of `conn` into raw bytes
pub fn snapshot(conn: &Connection) -> Result<Vec<u8>> {
    let data = conn.serialize(DatabaseName::Main)?;
    Ok(data.to_vec())
}

/// Write the current engine state to `slot` under `key`.
///
/// Overwrites whatever was stored before. A rejected write is returned as
/// `StorageFailure` and is not retried.
pub fn save<S: StorageSlot + ?Sized>(conn: &Connection, slot: &mut S, key: &str) -> Result<usize> {
    let bytes = snapshot(conn)?;
    let text = encode(&bytes)?;
    slot.set_item(key, &text)?;
    tracing::debug!("Saved {} byte image ({} chars) under {:?}", bytes.len(), text.len(), key);
    Ok(bytes.len())
}

/// Rebuild an engine from `slot`.
///
/// Returns `Ok(None)` when nothing was ever saved under `key`. The image is
/// restored into a new connection that is only handed back once it has been
/// verified, so a bad image can never be half-applied to a live catalog.
pub fn load<S: StorageSlot + ?Sized>(slot: &S, key: &str) -> Result<Option<Connection>> {
    let Some(text) = slot.get_item(key)? else {
        return Ok(None);
    };

    let bytes = decode(&text)?;
    restore(&bytes).map(Some)
}

/// Restore a byte image into a fresh in-memory connection
pub fn restore(bytes: &[u8]) -> Result<Connection> {
    if bytes.is_empty() {
        return Err(Error::CorruptState("saved image is empty".to_string()));
    }

    let mut conn = Connection::open_in_memory()?;
    conn.deserialize_read_exact(DatabaseName::Main, bytes, bytes.len(), false)
        .map_err(|e| Error::CorruptState(format!("engine rejected saved image: {}", e)))?;

    let check: String = conn
        .query_row("PRAGMA quick_check", [], |row| row.get(0))
        .map_err(|e| Error::CorruptState(format!("saved image is not a database: {}", e)))?;
    if check != "ok" {
        return Err(Error::CorruptState(format!("integrity check failed: {}", check)));
    }

    Ok(conn)
}
