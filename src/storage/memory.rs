use std::collections::HashMap;
use std::sync::Mutex;
use crate::errors::HarvesterError;
use super::KeyValueStore;

/// Process-local storage; nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(key: &str, value: &str) -> Self {
        let store = Self::new();
        if let Ok(mut values) = store.values.lock() {
            values.insert(key.to_string(), value.to_string());
        }
        store
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, HarvesterError> {
        let values = self.values.lock()
            .map_err(|_| HarvesterError::Storage("Memory store lock poisoned".into()))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), HarvesterError> {
        let mut values = self.values.lock()
            .map_err(|_| HarvesterError::Storage("Memory store lock poisoned".into()))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), HarvesterError> {
        let mut values = self.values.lock()
            .map_err(|_| HarvesterError::Storage("Memory store lock poisoned".into()))?;
        values.remove(key);
        Ok(())
    }
}
