//! Adapter implementation of [`dashmap::DashMap`], a lock-free concurrent map. Miss
//! semantics match the `memory` store.
//!
//! ## Configuration Format
//!
//! ``` toml
//! [store]
//! name = "dashmap"
//! ```

use crate::stores::Registry;
use crate::{StoreClient, StoreError, StoreHandle};
use dashmap::DashMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct DashMapStore {
    map: Arc<DashMap<Box<[u8]>, Box<[u8]>>>,
}

impl DashMapStore {
    pub fn new() -> Self {
        Self {
            map: Arc::new(DashMap::new()),
        }
    }

    pub fn new_store(_opt: &toml::Table) -> Arc<dyn StoreClient> {
        Arc::new(Self::new())
    }
}

impl Default for DashMapStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreClient for DashMapStore {
    fn handle(&self) -> Box<dyn StoreHandle> {
        Box::new(self.clone())
    }
}

impl StoreHandle for DashMapStore {
    fn get(&mut self, key: &[u8]) -> Result<Box<[u8]>, StoreError> {
        match self.map.get(key) {
            Some(r) => Ok(r.value().clone()),
            None => Err(StoreError::NotFound),
        }
    }

    fn set(&mut self, key: &[u8], value: &[u8], _flags: u32, _expiry: u32) -> Result<(), StoreError> {
        self.map.insert(key.into(), value.into());
        Ok(())
    }

    fn delete(&mut self, key: &[u8], _expiry: u32) -> Result<(), StoreError> {
        match self.map.remove(key) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound),
        }
    }
}

inventory::submit! {
    Registry::new("dashmap", DashMapStore::new_store)
}
