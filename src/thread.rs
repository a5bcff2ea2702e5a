//! Spawn-join functionality.
//!
//! **You may not need to check this if it is OK to run workers with [`std::thread`].**
//!
//! A key-value store is generally passive, but some stores ship their own runtime and need
//! workers to be created through it. Such a store can return its own implementation of
//! [`Thread`] from [`crate::StoreClient::thread`]; its join handle (like
//! [`std::thread::JoinHandle`]) should implement [`JoinHandle`].
//!
//! The spawned closure has no return value, and so does [`JoinHandle::join`]. Workers report
//! their results through shared counters that are read only after the join, so return values
//! are never needed.

/// A join handle returned by a spawn function.
pub trait JoinHandle {
    /// Join the worker, consuming the boxed self. A worker that panicked is a fatal error:
    /// the run's statistics would be meaningless, so this must not return normally.
    fn join(self: Box<Self>);
}

/// A thread management abstraction.
pub trait Thread {
    /// Spawn a new worker from a boxed closure. Failure to create the underlying thread
    /// (resource exhaustion) aborts the whole run.
    fn spawn(&self, f: Box<dyn FnOnce() + Send>) -> Box<dyn JoinHandle>;

    /// Yield the current worker.
    fn yield_now(&self);

    /// Pin the current worker to a certain CPU core.
    fn pin(&self, core: usize);
}

/// A zero-sized wrapper for [`std::thread`] functions.
#[derive(Clone)]
pub struct DefaultThread;

/// A wrapper for [`std::thread::JoinHandle`].
pub struct DefaultJoinHandle(std::thread::JoinHandle<()>);

impl JoinHandle for DefaultJoinHandle {
    fn join(self: Box<Self>) {
        let handle = self.0;
        assert!(handle.join().is_ok());
    }
}

impl Thread for DefaultThread {
    fn spawn(&self, f: Box<dyn FnOnce() + Send>) -> Box<dyn JoinHandle> {
        let handle = std::thread::spawn(f);
        Box::new(DefaultJoinHandle(handle))
    }

    fn yield_now(&self) {
        std::thread::yield_now();
    }

    fn pin(&self, core: usize) {
        let cores = core_affinity::get_core_ids().unwrap();
        core_affinity::set_for_current(cores[core % cores.len()]);
    }
}
