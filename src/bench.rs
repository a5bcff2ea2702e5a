//! The core run engine: worker orchestration, counters, and the final report.
//!
//! A run drives a fixed pool of worker threads, one per configured concurrency level. Each
//! worker owns a private random generator seeded from `(global_seed + worker_id)`, a private
//! store handle cloned from the shared [`StoreClient`], and four private counters (bytes
//! sent, bytes received, requests, errors). Workers never coordinate during a run; the only
//! synchronization points are the start barrier and the final join, after which the main
//! thread may safely read every worker's counters.
//!
//! ## Output Format
//!
//! The report is plain text, one run per invocation, in a fixed field order so existing
//! result-scraping scripts keep working:
//!
//! ```txt
//! Time: 1520 us
//! Data sent: 733570 bytes
//! Data received: 516646 bytes
//! Number of requests: 1000
//! Number of errors: 392
//!
//!
//! Bandwidth: 784.25 MB/s
//! Rate: 657894.74 requests/s
//! ReqSize: 1250.22 bytes
//! ```
//!
//! `Time` is the wall-clock duration in microseconds between the instant right before the
//! first worker starts issuing operations and the instant right after the last worker is
//! joined. `Bandwidth` counts both directions, `ReqSize` is the mean number of bytes moved
//! per request.

use crate::workload::{Op, ValuePool, Workload, WorkloadOpt, KEY_LEN};
use crate::StoreClient;
use log::debug;
use quanta::Instant;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Barrier};
use std::time::Duration;

/// The configuration of a run.
#[derive(Clone, Debug)]
pub struct RunnerOpt {
    /// Number of concurrent workers.
    pub workers: usize,

    /// Number of operations each worker issues before terminating. There is no timeout or
    /// cancellation: a worker runs until its quota is met.
    pub quota: u64,

    /// Seed for the value pool and, offset by the worker id, for each worker's private
    /// generator. Two runs with the same seed and worker count issue identical operation
    /// sequences.
    pub seed: u64,

    /// Seconds to sleep before the run starts, e.g. to let the store warm up.
    pub delay: u64,

    /// The workload definition.
    pub workload: WorkloadOpt,
}

impl RunnerOpt {
    fn sanity(&self) {
        assert!(self.workers > 0, "workers should be positive");
        assert!(self.quota > 0, "quota should be positive");
    }
}

/// A per-worker counter. Using [`AtomicU64`] here makes the stats `Sync` + `Send` so the
/// aggregating thread can read them after the join, while the owning worker updates the
/// value through a plain reference during the run.
struct Counter(AtomicU64);

impl Counter {
    fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    fn read(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    fn reference(&self) -> &mut u64 {
        // SAFETY: only the owning worker calls this, and the aggregator reads the value
        // after the worker has been joined
        unsafe { &mut *self.0.as_ptr() }
    }
}

/// The counters of one worker. Mutated only by that worker; read by the aggregator after the
/// join barrier establishes the happens-before edge.
struct WorkerStats {
    sent: Counter,
    received: Counter,
    requests: Counter,
    errors: Counter,
}

impl WorkerStats {
    fn new() -> Self {
        Self {
            sent: Counter::new(),
            received: Counter::new(),
            requests: Counter::new(),
            errors: Counter::new(),
        }
    }
}

struct WorkerContext {
    /// Shared, immutable workload context (mix table, generators, value pool).
    workload: Arc<Workload>,

    /// This worker's counters.
    stats: Arc<WorkerStats>,

    /// Syncs all workers plus the main thread right before the measured section.
    barrier: Arc<Barrier>,

    /// Operations this worker must issue.
    quota: u64,

    /// Global seed; the worker offsets it by its id.
    seed: u64,

    /// This worker's id in `[0, workers)`.
    id: usize,
}

fn run_worker(client: Arc<dyn StoreClient>, context: WorkerContext) {
    let WorkerContext {
        workload,
        stats,
        barrier,
        quota,
        seed,
        id,
    } = context;

    client.thread().pin(id);

    let mut handle = client.handle();
    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(id as u64));

    let sent = stats.sent.reference();
    let received = stats.received.reference();
    let requests = stats.requests.reference();
    let errors = stats.errors.reference();

    debug!("worker {} ready", id);
    barrier.wait();

    while *requests < quota {
        match workload.next(&mut rng) {
            Op::Get { key } => {
                match handle.get(key.as_bytes()) {
                    Ok(value) => *received += value.len() as u64,
                    Err(_) => *errors += 1,
                }
                *sent += KEY_LEN as u64;
                *requests += 1;
            }
            Op::Set { key, value } | Op::Create { key, value } => {
                if handle.set(key.as_bytes(), value, 0, 0).is_err() {
                    *errors += 1;
                }
                *sent += (KEY_LEN + value.len()) as u64;
                *requests += 1;
            }
            Op::Remove { key } => {
                if handle.delete(key.as_bytes(), 0).is_err() {
                    *errors += 1;
                }
                *sent += KEY_LEN as u64;
                *requests += 1;
            }
        }
    }

    debug!("worker {} done, {} errors", id, *errors);
}

/// The aggregate statistics of a completed run. Computed once from the summed worker
/// counters plus the start/end timestamps, then printed and discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub elapsed: Duration,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub requests: u64,
    pub errors: u64,
}

impl Report {
    /// Bytes moved in both directions per second, in MB (1048576 bytes).
    pub fn bandwidth_mbps(&self) -> f64 {
        (self.bytes_sent + self.bytes_received) as f64
            / self.elapsed.as_secs_f64()
            / (1024.0 * 1024.0)
    }

    /// Requests issued per second.
    pub fn rate(&self) -> f64 {
        self.requests as f64 / self.elapsed.as_secs_f64()
    }

    /// Mean bytes moved per request.
    pub fn mean_request_size(&self) -> f64 {
        (self.bytes_sent + self.bytes_received) as f64 / self.requests as f64
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Time: {} us", self.elapsed.as_micros())?;
        writeln!(f, "Data sent: {} bytes", self.bytes_sent)?;
        writeln!(f, "Data received: {} bytes", self.bytes_received)?;
        writeln!(f, "Number of requests: {}", self.requests)?;
        writeln!(f, "Number of errors: {}", self.errors)?;
        writeln!(f)?;
        writeln!(f)?;
        writeln!(f, "Bandwidth: {:.2} MB/s", self.bandwidth_mbps())?;
        writeln!(f, "Rate: {:.2} requests/s", self.rate())?;
        write!(f, "ReqSize: {:.2} bytes", self.mean_request_size())
    }
}

/// Run a full load generation cycle against a store and return the aggregate report.
///
/// Builds the shared immutable state (value pool, mix table), sleeps the configured delay,
/// spawns one worker per configured concurrency level, releases them through a barrier,
/// joins them all, and merges the counters. Configuration errors panic here, before any
/// worker is spawned.
pub fn run(client: Arc<dyn StoreClient>, opt: &RunnerOpt) -> Report {
    opt.sanity();
    let pool = Arc::new(ValuePool::new(opt.seed, 2 * opt.workload.vmax));
    let workload = Arc::new(Workload::new(&opt.workload, pool));
    let stats: Vec<Arc<WorkerStats>> = (0..opt.workers)
        .map(|_| Arc::new(WorkerStats::new()))
        .collect();
    debug!(
        "starting run: {} worker(s), quota {}, seed {}",
        opt.workers, opt.quota, opt.seed
    );

    if opt.delay > 0 {
        std::thread::sleep(Duration::from_secs(opt.delay));
    }

    let thread = client.thread();
    let barrier = Arc::new(Barrier::new(opt.workers + 1));
    let mut handles = Vec::with_capacity(opt.workers);
    for id in 0..opt.workers {
        let context = WorkerContext {
            workload: workload.clone(),
            stats: stats[id].clone(),
            barrier: barrier.clone(),
            quota: opt.quota,
            seed: opt.seed,
            id,
        };
        let client = client.clone();
        handles.push(thread.spawn(Box::new(move || run_worker(client, context))));
    }

    // all workers are blocked on the barrier until the timestamp is taken
    let start = Instant::now();
    barrier.wait();
    for handle in handles {
        handle.join();
    }
    let end = Instant::now();

    let mut report = Report {
        elapsed: end - start,
        bytes_sent: 0,
        bytes_received: 0,
        requests: 0,
        errors: 0,
    };
    for s in stats.iter() {
        report.bytes_sent += s.sent.read();
        report.bytes_received += s.received.read();
        report.requests += s.requests.read();
        report.errors += s.errors.read();
    }
    debug!("run finished: {:?}", report);
    report
}
