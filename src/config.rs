use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::storage::persist::DEFAULT_KEY;
use crate::storage::slot::DEFAULT_QUOTA_BYTES;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StockroomConfig {
    /// Path of the slot file holding the saved catalog
    pub storage: Option<String>,
    /// Slot key the catalog is saved under
    pub key: Option<String>,
    /// Slot quota in bytes; 0 disables the limit
    pub quota_bytes: Option<usize>,
}

impl StockroomConfig {
    /// Config with every default spelled out, as written by `init`
    pub fn with_defaults() -> Self {
        Self {
            storage: Some(default_storage_path().display().to_string()),
            key: Some(DEFAULT_KEY.to_string()),
            quota_bytes: Some(DEFAULT_QUOTA_BYTES),
        }
    }

    pub fn storage_path(&self) -> PathBuf {
        self.storage
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(default_storage_path)
    }

    pub fn key(&self) -> &str {
        self.key.as_deref().unwrap_or(DEFAULT_KEY)
    }

    pub fn quota(&self) -> Option<usize> {
        match self.quota_bytes {
            Some(0) => None,
            Some(n) => Some(n),
            None => Some(DEFAULT_QUOTA_BYTES),
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("stockroom.toml")
}

pub fn default_storage_path() -> PathBuf {
    PathBuf::from(".stockroom").join("storage.json")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<StockroomConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: StockroomConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &StockroomConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}
