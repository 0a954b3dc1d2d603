use std::collections::HashMap;
use std::sync::Mutex;

use super::StateStore;
use crate::error::{Result, TricklerError};

/// In-process store for tests and the simulator.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every key currently held.
    pub fn snapshot(&self) -> Result<HashMap<String, String>> {
        let values = self
            .values
            .lock()
            .map_err(|_| TricklerError::Store("memory store poisoned".into()))?;
        Ok(values.clone())
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self
            .values
            .lock()
            .map_err(|_| TricklerError::Store("memory store poisoned".into()))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| TricklerError::Store("memory store poisoned".into()))?;
        values.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}
