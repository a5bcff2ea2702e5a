#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! A multi-threaded load generator that drives a key-value store with a reproducible,
//! weighted mix of operations and reports aggregate throughput, bandwidth and error
//! statistics.
//!
//! `kvload` synthesizes its whole workload from a single seed: every worker owns a private
//! random generator derived from the global seed and its worker id, so a run can be replayed
//! bit-for-bit. The operation mix (get/set/create/remove percentages), value sizes, key-space
//! cardinality, per-worker operation quota and concurrency level are all configurable.
//!
//! The store under test is a black box behind the [`StoreClient`] capability. A store is
//! created dynamically from a TOML file and dispatched through a registry, so external crates
//! can register their own store adapters without touching this crate: implement [`StoreClient`]
//! and [`StoreHandle`], register a constructor with [`stores::Registry`], then reuse the
//! exported [`cmdline()`] in a `main` function.
//!
//! A few key design choices:
//!
//! - Keys and values are variable-sized byte arrays represented as [`u8`] slices. No generics
//!   over the key's type.
//! - All shared state (the value pool and the operation mix table) is built once before any
//!   worker starts and is immutable afterwards, so the hot path takes no locks.
//! - Workers never coordinate during a run. Their counters are merged only after every worker
//!   has been joined.
//!
//! More detailed usage can be found in the module-level rustdocs:
//!
//! - [`mod@bench`] for the run engine and the report format.
//! - [`mod@stores`] for the config format of a built-in store.
//! - [`cmdline()`] for the usage of the default command line interface.

use thiserror::Error;

/// An error returned by a store for a single operation.
///
/// The run engine does not distinguish between the variants: any error is counted once on the
/// issuing worker and the loop continues with the next operation. A missed `get` or `delete`
/// is an error like any other, matching memcached semantics.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("key not found")]
    NotFound,

    #[error("operation timed out")]
    Timeout,

    #[error("connection failure: {0}")]
    Connection(String),

    #[error("rejected by store: {0}")]
    Rejected(String),
}

/// A connected, thread-safe key-value store client.
///
/// This is the shared handle that the run engine receives. Before a worker enters its
/// operation loop it calls [`StoreClient::handle`] once to obtain an exclusive per-worker
/// handle that inherits the shared client's configuration (server list, connection policy).
pub trait StoreClient: Send + Sync + 'static {
    /// Create a handle for exclusive use by one worker. For most in-process stores this can
    /// just be a clone of an inner `Arc`.
    fn handle(&self) -> Box<dyn StoreHandle>;

    /// The spawn-join implementation used to run workers against this store. The default
    /// [`std::thread`]-based implementation fits almost all stores.
    fn thread(&self) -> Box<dyn crate::thread::Thread> {
        Box::new(self::thread::DefaultThread)
    }
}

/// A per-worker handle that references a [`StoreClient`].
///
/// The handle is the object that exposes the key-value interface. It is owned by exactly one
/// worker and never shared.
pub trait StoreHandle {
    /// Retrieve the value of a key.
    fn get(&mut self, key: &[u8]) -> Result<Box<[u8]>, StoreError>;

    /// Add a new key-value pair or blindly update an existing key's value.
    ///
    /// `flags` and `expiry` are passed through to stores that understand them (memcached
    /// does); the built-in stores ignore them.
    fn set(&mut self, key: &[u8], value: &[u8], flags: u32, expiry: u32) -> Result<(), StoreError>;

    /// Remove a key.
    fn delete(&mut self, key: &[u8], expiry: u32) -> Result<(), StoreError>;
}

pub mod bench;
mod cmdline;
pub mod stores;
pub mod thread;
pub mod workload;

pub use cmdline::cmdline;

pub extern crate inventory;
pub extern crate toml;
