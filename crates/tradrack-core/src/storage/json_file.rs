//! Variable store backed by a single JSON object file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use super::VariableStore;
use crate::error::StoreResult;

/// Variables kept in memory and rewritten to disk on every save.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: BTreeMap<String, Value>,
}

impl JsonFileStore {
    /// Open `path`, starting empty if the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let values = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            BTreeMap::new()
        };

        debug!(path = %path.display(), variables = values.len(), "Opened variable store");
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut temp_name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        temp_name.push(".tmp");
        let temp_path = self.path.with_file_name(temp_name);

        let content = serde_json::to_string_pretty(&self.values)?;

        // Atomic write
        fs::write(&temp_path, content)?;
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

impl VariableStore for JsonFileStore {
    fn get_variable(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }

    fn save_variable(&mut self, name: &str, value: Value) -> StoreResult<()> {
        let previous = self.values.insert(name.to_string(), value);
        if let Err(e) = self.persist() {
            // Keep memory consistent with disk
            match previous {
                Some(old) => self.values.insert(name.to_string(), old),
                None => self.values.remove(name),
            };
            return Err(e);
        }
        Ok(())
    }
}
