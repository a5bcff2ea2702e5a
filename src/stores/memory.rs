//! A sharded in-memory store built on [`hashbrown::HashMap`], with memcached-like miss
//! semantics: a `get` or `delete` of an absent key returns [`StoreError::NotFound`].
//!
//! ## Configuration Format
//!
//! ``` toml
//! [store]
//! name = "memory"
//! shards = ... # number of shards, default 512
//! ```

use crate::stores::Registry;
use crate::{StoreClient, StoreError, StoreHandle};
use hashbrown::HashMap;
use parking_lot::Mutex;
use rustc_hash::FxHasher;
use serde::Deserialize;
use std::hash::Hasher;
use std::sync::Arc;

/// A raw map with variable-sized keys and values, the building block of one shard.
pub type BaseMap = HashMap<Box<[u8]>, Box<[u8]>>;

fn shard(key: &[u8], nr_shards: usize) -> usize {
    let mut hasher = FxHasher::default();
    hasher.write(key);
    usize::try_from(hasher.finish()).unwrap() % nr_shards
}

#[derive(Clone)]
pub struct MemoryStore {
    nr_shards: usize,
    shards: Arc<Vec<Mutex<BaseMap>>>,
}

#[derive(Deserialize)]
pub struct MemoryStoreOpt {
    #[serde(default = "MemoryStoreOpt::default_shards")]
    pub shards: usize,
}

impl MemoryStoreOpt {
    fn default_shards() -> usize {
        512
    }
}

impl MemoryStore {
    pub fn new(opt: &MemoryStoreOpt) -> Self {
        let nr_shards = opt.shards;
        assert!(nr_shards > 0, "shards should be positive");
        let mut shards = Vec::<Mutex<BaseMap>>::with_capacity(nr_shards);
        for _ in 0..nr_shards {
            shards.push(Mutex::new(BaseMap::new()));
        }
        let shards = Arc::new(shards);
        Self { nr_shards, shards }
    }

    pub fn new_store(opt: &toml::Table) -> Arc<dyn StoreClient> {
        let opt: MemoryStoreOpt = opt.clone().try_into().unwrap();
        Arc::new(Self::new(&opt))
    }
}

impl StoreClient for MemoryStore {
    fn handle(&self) -> Box<dyn StoreHandle> {
        Box::new(self.clone())
    }
}

impl StoreHandle for MemoryStore {
    fn get(&mut self, key: &[u8]) -> Result<Box<[u8]>, StoreError> {
        let sid = shard(key, self.nr_shards);
        match self.shards[sid].lock().get(key) {
            Some(v) => Ok(v.clone()),
            None => Err(StoreError::NotFound),
        }
    }

    fn set(&mut self, key: &[u8], value: &[u8], _flags: u32, _expiry: u32) -> Result<(), StoreError> {
        let sid = shard(key, self.nr_shards);
        self.shards[sid].lock().insert(key.into(), value.into());
        Ok(())
    }

    fn delete(&mut self, key: &[u8], _expiry: u32) -> Result<(), StoreError> {
        let sid = shard(key, self.nr_shards);
        match self.shards[sid].lock().remove(key) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound),
        }
    }
}

inventory::submit! {
    Registry::new("memory", MemoryStore::new_store)
}
