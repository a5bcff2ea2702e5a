//! Deterministic workload synthesis: the shared value pool, the operation mix table, and the
//! per-worker key/value generators.
//!
//! Everything in this module is built once, before any worker starts, and is immutable
//! afterwards. Workers draw from their own private [`Rng`] state, so the sequence of
//! operations produced by a worker is exactly reproducible for a fixed seed and worker id.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::sync::Arc;

/// The fixed width of every synthesized key, in bytes.
pub const KEY_LEN: usize = 6;

/// The number of slots in an operation mix table. Mix percentages index into this directly.
pub const MIX_SLOTS: usize = 100;

/// The kind of a single operation, without its generated key/value. Kinds are drawn from a
/// [`Mix`] and materialized into an [`Op`] by [`Workload::next`].
///
/// `Create` is semantically identical to `Set`; the distinction exists only so that a mix can
/// account newly created keys separately from blind updates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpKind {
    Get,
    Set,
    Create,
    Remove,
}

/// A fully materialized operation, ready to be issued against a store. Values borrow from the
/// shared [`ValuePool`], no bytes are copied during generation.
#[derive(Debug, PartialEq, Eq)]
pub enum Op<'a> {
    Get { key: Key },
    Set { key: Key, value: &'a [u8] },
    Create { key: Key, value: &'a [u8] },
    Remove { key: Key },
}

/// A fixed-width textual key encoding an integer drawn from the key space.
///
/// The integer's low 36 bits are encoded as 6 characters, 6 bits each, least-significant
/// chunk first, each chunk mapped to `chunk + b'0'`. The alphabet is therefore the 64
/// printable characters starting at `'0'`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Key([u8; KEY_LEN]);

impl Key {
    fn encode(n: u64) -> Self {
        let mut k = [0u8; KEY_LEN];
        for (i, c) in k.iter_mut().enumerate() {
            *c = ((n >> (6 * i)) & 0x3f) as u8 + b'0';
        }
        Self(k)
    }

    /// The integer this key encodes.
    pub fn decode(&self) -> u64 {
        self.0
            .iter()
            .enumerate()
            .map(|(i, c)| (((*c - b'0') & 0x3f) as u64) << (6 * i))
            .sum()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for Key {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// The operation mix: a 100-slot table mapping a uniform index to an [`OpKind`].
///
/// The table lays out `get` Get slots, then `set` Set slots, then `create` Create slots, then
/// `remove` Remove slots, in that fixed order. Building it twice from the same percentages
/// yields an identical table.
#[derive(Debug, PartialEq, Eq)]
pub struct Mix {
    slots: [OpKind; MIX_SLOTS],
}

impl Mix {
    /// Build a mix table from the four percentages. Panics unless they sum to exactly 100;
    /// that is a configuration error and must be fatal before any worker starts.
    pub fn new(get: u8, set: u8, create: u8, remove: u8) -> Self {
        assert_eq!(
            get as u32 + set as u32 + create as u32 + remove as u32,
            100,
            "sum of ops in a mix should be 100"
        );
        let mut slots = [OpKind::Get; MIX_SLOTS];
        let mut next = 0;
        for (kind, perc) in [
            (OpKind::Get, get),
            (OpKind::Set, set),
            (OpKind::Create, create),
            (OpKind::Remove, remove),
        ] {
            for slot in slots.iter_mut().skip(next).take(perc as usize) {
                *slot = kind;
            }
            next += perc as usize;
        }
        Self { slots }
    }

    /// Map a uniform index in `[0, 100)` to an operation kind. Pure and O(1).
    pub fn lookup(&self, index: usize) -> OpKind {
        self.slots[index]
    }

    /// Draw one operation kind using the given generator.
    pub fn next(&self, rng: &mut impl Rng) -> OpKind {
        self.lookup(rng.random_range(0..MIX_SLOTS))
    }
}

/// A large immutable buffer of pseudo-random bytes, generated once at startup and shared
/// read-only by all workers. Every synthesized value is a contiguous sub-slice of this pool.
///
/// The bytes only need to be random enough to defeat store-side compression; the pool is
/// filled from a seeded [`StdRng`] so that runs are reproducible.
pub struct ValuePool {
    data: Box<[u8]>,
}

impl ValuePool {
    pub fn new(seed: u64, size: usize) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut data = vec![0u8; size];
        rng.fill_bytes(&mut data);
        Self {
            data: data.into_boxed_slice(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// A `len`-byte view of the pool starting at a random offset. The caller must guarantee
    /// `len < self.len()`; violating that is a contract bug, not a runtime error.
    pub fn sample(&self, rng: &mut impl Rng, len: usize) -> &[u8] {
        debug_assert!(len < self.data.len());
        let start = rng.random_range(0..self.data.len() - len - 1);
        &self.data[start..start + len]
    }
}

/// Maps a worker's random draw to a key within the configured key space.
///
/// The draw is reduced modulo the key-space size, so every synthesized key decodes to an
/// integer in `[0, key_space)`. Known limitation: the 6-character encoding distinguishes at
/// most 2^36 integers, so a key space larger than that aliases distinct integers onto the
/// same key.
#[derive(Debug)]
pub struct KeyGenerator {
    key_space: u64,
}

impl KeyGenerator {
    pub fn new(key_space: u64) -> Self {
        assert!(key_space > 0, "key space should be positive");
        Self { key_space }
    }

    pub fn next(&self, rng: &mut impl Rng) -> Key {
        Key::encode(rng.random::<u64>() % self.key_space)
    }
}

/// Draws a value length uniformly from `[vmin, vmax)` and slices the pool accordingly.
#[derive(Debug)]
pub struct ValueGenerator {
    vmin: usize,
    vmax: usize,
}

impl ValueGenerator {
    pub fn new(vmin: usize, vmax: usize) -> Self {
        assert!(vmax > vmin, "vmax should be greater than vmin");
        Self { vmin, vmax }
    }

    pub fn next<'a>(&self, rng: &mut impl Rng, pool: &'a ValuePool) -> &'a [u8] {
        let len = rng.random_range(self.vmin..self.vmax);
        pool.sample(rng, len)
    }
}

/// The parameters of a workload. Assembled from command line flags by [`crate::cmdline()`],
/// or directly in code when embedding the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkloadOpt {
    /// Mix percentages, must sum to 100.
    pub get_perc: u8,
    pub set_perc: u8,
    pub create_perc: u8,
    pub remove_perc: u8,

    /// Value length bounds: lengths are drawn from `[vmin, vmax)`.
    pub vmin: usize,
    pub vmax: usize,

    /// Number of distinct keys the workload addresses.
    pub keys: u64,
}

/// A workload context: the mix plus the key/value generators, bound to the shared pool.
///
/// `Workload` itself is stateless and shared by all workers; each worker passes its own
/// private generator state into [`Workload::next`].
pub struct Workload {
    mix: Mix,
    kgen: KeyGenerator,
    vgen: ValueGenerator,
    pool: Arc<ValuePool>,
}

impl Workload {
    /// Build a workload. All preconditions (mix sum, value bounds, pool size) are checked
    /// here and are fatal, as no worker has started yet.
    pub fn new(opt: &WorkloadOpt, pool: Arc<ValuePool>) -> Self {
        let mix = Mix::new(opt.get_perc, opt.set_perc, opt.create_perc, opt.remove_perc);
        let kgen = KeyGenerator::new(opt.keys);
        let vgen = ValueGenerator::new(opt.vmin, opt.vmax);
        assert!(
            pool.len() > opt.vmax,
            "value pool should be larger than vmax"
        );
        Self {
            mix,
            kgen,
            vgen,
            pool,
        }
    }

    /// Synthesize the next operation: one draw for the kind, one for the key, and for
    /// write operations two more for the value length and pool offset.
    pub fn next(&self, rng: &mut impl Rng) -> Op<'_> {
        match self.mix.next(rng) {
            OpKind::Get => Op::Get {
                key: self.kgen.next(rng),
            },
            OpKind::Set => Op::Set {
                key: self.kgen.next(rng),
                value: self.vgen.next(rng, &self.pool),
            },
            OpKind::Create => Op::Create {
                key: self.kgen.next(rng),
                value: self.vgen.next(rng, &self.pool),
            },
            OpKind::Remove => Op::Remove {
                key: self.kgen.next(rng),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mix_layout_is_ordered() {
        let mix = Mix::new(60, 30, 5, 5);
        for i in 0..60 {
            assert_eq!(mix.lookup(i), OpKind::Get);
        }
        for i in 60..90 {
            assert_eq!(mix.lookup(i), OpKind::Set);
        }
        for i in 90..95 {
            assert_eq!(mix.lookup(i), OpKind::Create);
        }
        for i in 95..100 {
            assert_eq!(mix.lookup(i), OpKind::Remove);
        }
    }

    #[test]
    fn mix_one_type_only() {
        let mut rng = rand::rng();
        let mix = Mix::new(100, 0, 0, 0);
        for _ in 0..100 {
            assert!(matches!(mix.next(&mut rng), OpKind::Get));
        }
        let mix = Mix::new(0, 0, 0, 100);
        for _ in 0..100 {
            assert!(matches!(mix.next(&mut rng), OpKind::Remove));
        }
    }

    #[test]
    fn mix_is_idempotent() {
        assert_eq!(Mix::new(60, 30, 5, 5), Mix::new(60, 30, 5, 5));
        assert_eq!(Mix::new(25, 25, 25, 25), Mix::new(25, 25, 25, 25));
    }

    #[test]
    fn mix_small_write() {
        let mut rng = rand::rng();
        let mix = Mix::new(95, 5, 0, 0);
        let mut set = 0;
        for _ in 0..1000000 {
            if matches!(mix.next(&mut rng), OpKind::Set) {
                set += 1;
            }
        }
        assert!(set > 35000 && set < 65000);
    }

    #[test]
    #[should_panic(expected = "should be 100")]
    fn mix_sum_over_100() {
        let _ = Mix::new(50, 50, 0, 1);
    }

    #[test]
    #[should_panic(expected = "should be 100")]
    fn mix_sum_under_100() {
        let _ = Mix::new(50, 40, 5, 4);
    }

    #[test]
    fn key_roundtrip() {
        for n in [0u64, 1, 63, 64, 1023, (1 << 36) - 1] {
            assert_eq!(Key::encode(n).decode(), n);
        }
    }

    #[test]
    fn key_alphabet_and_width() {
        let mut rng = StdRng::seed_from_u64(42);
        let kgen = KeyGenerator::new(1024);
        for _ in 0..10000 {
            let key = kgen.next(&mut rng);
            assert_eq!(key.as_bytes().len(), KEY_LEN);
            for c in key.as_bytes() {
                assert!(*c >= b'0' && *c < b'0' + 64);
            }
            assert!(key.decode() < 1024);
        }
    }

    #[test]
    fn key_sequence_is_reproducible() {
        let kgen = KeyGenerator::new(1 << 20);
        let mut rng0 = StdRng::seed_from_u64(7);
        let mut rng1 = StdRng::seed_from_u64(7);
        for _ in 0..10000 {
            assert_eq!(kgen.next(&mut rng0), kgen.next(&mut rng1));
        }
    }

    #[test]
    fn key_distribution_is_uniform() {
        use hashbrown::HashMap;
        let mut rng = StdRng::seed_from_u64(1);
        let kgen = KeyGenerator::new(100);
        let mut dist: HashMap<Key, u64> = HashMap::new();
        // 100 keys, 1m draws, ~10k occurrences each, bound to [9k, 11k]
        for _ in 0..1000000 {
            *dist.entry(kgen.next(&mut rng)).or_insert(0) += 1;
        }
        assert_eq!(dist.len(), 100);
        for c in dist.values() {
            assert!(*c > 9000 && *c < 11000);
        }
    }

    #[test]
    fn value_length_in_range_and_from_pool() {
        let pool = ValuePool::new(1, 4096);
        let vgen = ValueGenerator::new(10, 20);
        let mut rng = StdRng::seed_from_u64(3);
        let base = pool.data.as_ptr() as usize;
        for _ in 0..10000 {
            let v = vgen.next(&mut rng, &pool);
            assert!(v.len() >= 10 && v.len() < 20);
            let start = v.as_ptr() as usize - base;
            assert!(start + v.len() <= pool.len());
            assert_eq!(v, &pool.data[start..start + v.len()]);
        }
    }

    #[test]
    fn pool_is_deterministic_per_seed() {
        let a = ValuePool::new(9, 1024);
        let b = ValuePool::new(9, 1024);
        let c = ValuePool::new(10, 1024);
        assert_eq!(a.data, b.data);
        assert_ne!(a.data, c.data);
    }

    #[test]
    #[should_panic(expected = "greater than vmin")]
    fn value_bounds_inverted() {
        let _ = ValueGenerator::new(20, 20);
    }

    #[test]
    fn workload_sequence_is_reproducible() {
        let opt = WorkloadOpt {
            get_perc: 60,
            set_perc: 30,
            create_perc: 5,
            remove_perc: 5,
            vmin: 16,
            vmax: 64,
            keys: 1 << 16,
        };
        let pool = Arc::new(ValuePool::new(1, 128));
        let workload = Workload::new(&opt, pool);
        let mut rng0 = StdRng::seed_from_u64(5);
        let mut rng1 = StdRng::seed_from_u64(5);
        for _ in 0..10000 {
            assert_eq!(workload.next(&mut rng0), workload.next(&mut rng1));
        }
    }

    #[test]
    #[should_panic(expected = "larger than vmax")]
    fn workload_pool_too_small() {
        let opt = WorkloadOpt {
            get_perc: 100,
            set_perc: 0,
            create_perc: 0,
            remove_perc: 0,
            vmin: 16,
            vmax: 64,
            keys: 1024,
        };
        let pool = Arc::new(ValuePool::new(1, 64));
        let _ = Workload::new(&opt, pool);
    }
}
