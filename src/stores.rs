//! Adapters for built-in and external key-value stores.
//!
//! ## Built-in Stores
//!
//! The usage of each built-in store can be found in its module-level documentation. The
//! `dashmap` store needs the crate feature of the same name.
//!
//! ## Registering New Stores
//!
//! To drive a store that lives in another crate, implement [`StoreClient`] and
//! [`crate::StoreHandle`] for it, then create a constructor function with a signature of
//! `fn(&toml::Table) -> Arc<dyn StoreClient>` and register it (along with a name) using
//! [`inventory`]: `inventory::submit! { Registry::new("name", constructor_fn) };`.
//!
//! The source code of the built-in stores provides good examples of this process.

use crate::StoreClient;
use figment::providers::{Env, Format, Toml};
use figment::Figment;
use hashbrown::HashMap;
use log::debug;
use serde::Deserialize;
use std::sync::Arc;
use toml::Table;

/// The centralized registry that maps the name of a key-value store to its constructor
/// function.
///
/// A store defined outside this crate can use the [`inventory::submit!`] macro to register
/// itself for use with the default command line interface.
pub struct Registry<'a> {
    pub(crate) name: &'a str,
    constructor: fn(&Table) -> Arc<dyn StoreClient>,
}

impl<'a> Registry<'a> {
    pub const fn new(name: &'a str, constructor: fn(&Table) -> Arc<dyn StoreClient>) -> Self {
        Self { name, constructor }
    }
}

inventory::collect!(Registry<'static>);

/// The store section of a configuration file: a name that selects the constructor, plus
/// whatever extra keys that constructor understands.
#[derive(Deserialize, Clone, Debug)]
pub struct StoreOpt {
    name: String,
    #[serde(flatten)]
    opt: Table,
}

#[derive(Deserialize, Clone, Debug)]
struct StoreConfig {
    store: StoreOpt,
}

/// Construct a store from a parsed [`StoreOpt`]. An unknown name is a configuration error
/// and panics before any worker starts.
pub fn build(opt: &StoreOpt) -> Arc<dyn StoreClient> {
    let mut registered: HashMap<&'static str, fn(&Table) -> Arc<dyn StoreClient>> = HashMap::new();
    for r in inventory::iter::<Registry> {
        debug!("adding registered store: {}", r.name);
        assert!(registered.insert(r.name, r.constructor).is_none()); // no duplicate names
    }
    let f = registered.get(opt.name.as_str()).unwrap_or_else(|| {
        panic!("store {} not found in registry", opt.name);
    });
    f(&opt.opt)
}

/// Parse a TOML string with a `[store]` section and construct the store it describes.
/// Options can be overridden via environment variables without editing the file.
pub fn init(text: &str) -> Arc<dyn StoreClient> {
    let config: StoreConfig = Figment::new()
        .merge(Toml::string(text))
        .merge(Env::raw())
        .extract()
        .unwrap();
    build(&config.store)
}

#[cfg(feature = "dashmap")]
pub mod dashmap;
pub mod memory;
pub mod null;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreError;

    fn _store_test(client: &impl StoreClient) {
        let mut handle = client.handle();
        // insert + get
        assert!(handle.set(b"foo", b"bar", 0, 0).is_ok());
        assert_eq!(handle.get(b"foo"), Ok((*b"bar").into()));
        assert_eq!(handle.get(b"f00"), Err(StoreError::NotFound));

        // update
        assert!(handle.set(b"foo", b"0ar", 0, 0).is_ok());
        assert_eq!(handle.get(b"foo"), Ok((*b"0ar").into()));

        // delete, then a miss on both delete and get
        assert_eq!(handle.delete(b"foo", 0), Ok(()));
        assert_eq!(handle.delete(b"foo", 0), Err(StoreError::NotFound));
        assert_eq!(handle.get(b"foo"), Err(StoreError::NotFound));
    }

    #[test]
    fn memory() {
        let opt = memory::MemoryStoreOpt { shards: 512 };
        let client = memory::MemoryStore::new(&opt);
        _store_test(&client);
    }

    #[test]
    fn memory_handles_share_data() {
        let opt = memory::MemoryStoreOpt { shards: 4 };
        let client = memory::MemoryStore::new(&opt);
        let mut a = client.handle();
        let mut b = client.handle();
        assert!(a.set(b"shared", b"value", 0, 0).is_ok());
        assert_eq!(b.get(b"shared"), Ok((*b"value").into()));
    }

    #[test]
    fn null() {
        let client = null::NullStore::new();
        let mut handle = client.handle();
        assert!(handle.set(b"foo", b"bar", 0, 0).is_ok());
        assert_eq!(handle.get(b"foo"), Err(StoreError::NotFound));
        assert_eq!(handle.delete(b"foo", 0), Ok(()));
    }

    #[test]
    #[cfg(feature = "dashmap")]
    fn dashmap() {
        let client = dashmap::DashMapStore::new();
        _store_test(&client);
    }

    #[test]
    fn init_memory_from_toml() {
        let client = init(
            r#"
            [store]
            name = "memory"
            shards = 8
            "#,
        );
        let mut handle = client.handle();
        assert!(handle.set(b"k", b"v", 0, 0).is_ok());
        assert_eq!(handle.get(b"k"), Ok((*b"v").into()));
    }

    #[test]
    #[should_panic(expected = "not found in registry")]
    fn init_unknown_store() {
        let _ = init(
            r#"
            [store]
            name = "no-such-store"
            "#,
        );
    }
}
