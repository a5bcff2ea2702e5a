//! A store that keeps nothing. Writes and deletes succeed, reads always miss, so it can be
//! used to measure the engine's own overhead. Note that with a non-zero get percentage every
//! read counts as an error in the report.
//!
//! ## Configuration Format
//!
//! ``` toml
//! [store]
//! name = "null"
//! ```

use crate::stores::Registry;
use crate::{StoreClient, StoreError, StoreHandle};
use std::sync::Arc;

#[derive(Clone)]
pub struct NullStore;

impl NullStore {
    pub fn new() -> Self {
        Self
    }

    pub fn new_store(_opt: &toml::Table) -> Arc<dyn StoreClient> {
        Arc::new(Self::new())
    }
}

impl Default for NullStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreClient for NullStore {
    fn handle(&self) -> Box<dyn StoreHandle> {
        Box::new(self.clone())
    }
}

impl StoreHandle for NullStore {
    fn get(&mut self, _key: &[u8]) -> Result<Box<[u8]>, StoreError> {
        Err(StoreError::NotFound)
    }

    fn set(
        &mut self,
        _key: &[u8],
        _value: &[u8],
        _flags: u32,
        _expiry: u32,
    ) -> Result<(), StoreError> {
        Ok(())
    }

    fn delete(&mut self, _key: &[u8], _expiry: u32) -> Result<(), StoreError> {
        Ok(())
    }
}

inventory::submit! {
    Registry::new("null", NullStore::new_store)
}
