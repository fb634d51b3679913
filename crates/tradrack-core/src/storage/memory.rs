//! In-memory variable store.

use std::collections::HashMap;

use serde_json::Value;

use super::VariableStore;
use crate::error::StoreResult;

/// Variable store that forgets everything on drop.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl VariableStore for MemoryStore {
    fn get_variable(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }

    fn save_variable(&mut self, name: &str, value: Value) -> StoreResult<()> {
        self.values.insert(name.to_string(), value);
        Ok(())
    }
}
