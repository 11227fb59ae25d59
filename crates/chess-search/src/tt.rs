//! Transposition table shared by all search threads.
//!
//! Lock-free: each entry is two `AtomicU64` words, `key ^ data` and `data`.
//! A torn write from a racing thread leaves a pair whose XOR no longer
//! matches any hash, so it reads as a miss. Moves read from the table are
//! hints and are validated against the position before use.
//!
//! Data word layout:
//! - bits 0-15: move
//! - bits 16-31: score (i16)
//! - bits 32-39: depth (i8)
//! - bits 40-41: bound (0 = empty slot)
//! - bits 42-47: generation

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use chess_core::Move;
use tracing::{debug, warn};

use crate::score::{is_mate_score, MATE_BOUND};

const BUCKET_SIZE: usize = 4;
const GENERATION_MASK: u8 = 0x3F;
const AGE_WEIGHT: i32 = 8;
const HASHFULL_SAMPLE: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Exact,
    /// Fail high: the true score is at least the stored one.
    Lower,
    /// Fail low: the true score is at most the stored one.
    Upper,
}

impl Bound {
    const fn bits(self) -> u64 {
        match self {
            Bound::Exact => 1,
            Bound::Lower => 2,
            Bound::Upper => 3,
        }
    }

    const fn from_bits(bits: u64) -> Option<Bound> {
        match bits {
            1 => Some(Bound::Exact),
            2 => Some(Bound::Lower),
            3 => Some(Bound::Upper),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtEntry {
    pub mv: Move,
    /// Score relative to the stored node; see [`TtEntry::score_at`].
    pub score: i32,
    pub depth: i32,
    pub bound: Bound,
    generation: u8,
}

impl TtEntry {
    /// Stored score seen from the root when the node is `ply` plies deep.
    #[inline]
    pub fn score_at(&self, ply: u32) -> i32 {
        score_from_tt(self.score, ply)
    }

    /// Whether the entry allows cutting off a search of `[alpha, beta]`.
    pub fn cuts_off(&self, score: i32, alpha: i32, beta: i32) -> bool {
        match self.bound {
            Bound::Exact => true,
            Bound::Lower => score >= beta,
            Bound::Upper => score <= alpha,
        }
    }

    fn pack(&self) -> u64 {
        self.mv.raw() as u64
            | ((self.score as i16 as u16 as u64) << 16)
            | ((self.depth.clamp(i8::MIN as i32, i8::MAX as i32) as i8 as u8 as u64) << 32)
            | (self.bound.bits() << 40)
            | (((self.generation & GENERATION_MASK) as u64) << 42)
    }

    fn unpack(data: u64) -> Option<TtEntry> {
        let bound = Bound::from_bits((data >> 40) & 0x3)?;
        Some(TtEntry {
            mv: Move::from_raw(data as u16).unwrap_or(Move::NULL),
            score: (data >> 16) as u16 as i16 as i32,
            depth: (data >> 32) as u8 as i8 as i32,
            bound,
            generation: ((data >> 42) as u8) & GENERATION_MASK,
        })
    }
}

/// Mate scores are stored as distance from the node, not from the root.
#[inline]
fn score_to_tt(score: i32, ply: u32) -> i32 {
    if score >= MATE_BOUND {
        score + ply as i32
    } else if score <= -MATE_BOUND {
        score - ply as i32
    } else {
        score
    }
}

#[inline]
fn score_from_tt(score: i32, ply: u32) -> i32 {
    if !is_mate_score(score) {
        score
    } else if score > 0 {
        score - ply as i32
    } else {
        score + ply as i32
    }
}

#[derive(Default)]
struct Slot {
    check: AtomicU64,
    data: AtomicU64,
}

impl Slot {
    /// Data word if the slot holds `hash`.
    #[inline]
    fn read(&self, hash: u64) -> Option<u64> {
        let data = self.data.load(Ordering::Relaxed);
        let check = self.check.load(Ordering::Relaxed);
        (data != 0 && check ^ data == hash).then_some(data)
    }

    #[inline]
    fn write(&self, hash: u64, data: u64) {
        self.check.store(hash ^ data, Ordering::Relaxed);
        self.data.store(data, Ordering::Relaxed);
    }

    fn clear(&self) {
        self.check.store(0, Ordering::Relaxed);
        self.data.store(0, Ordering::Relaxed);
    }
}

/// One cache line of entries.
#[derive(Default)]
#[repr(align(64))]
struct Bucket {
    slots: [Slot; BUCKET_SIZE],
}

pub struct TranspositionTable {
    buckets: Vec<Bucket>,
    mask: usize,
    generation: AtomicU8,
}

impl TranspositionTable {
    /// Table of at most `megabytes`, rounded down to a power of two buckets.
    pub fn new(megabytes: usize) -> Self {
        let count = Self::bucket_count(megabytes);
        debug!(
            megabytes,
            buckets = count,
            entries = count * BUCKET_SIZE,
            "allocating transposition table"
        );
        TranspositionTable {
            buckets: (0..count).map(|_| Bucket::default()).collect(),
            mask: count - 1,
            generation: AtomicU8::new(0),
        }
    }

    fn bucket_count(megabytes: usize) -> usize {
        let megabytes = if megabytes == 0 {
            warn!("hash size of 0 MiB requested, using 1 MiB");
            1
        } else {
            megabytes
        };
        let wanted = (megabytes * 1024 * 1024 / std::mem::size_of::<Bucket>()).max(1);
        1 << (usize::BITS - 1 - wanted.leading_zeros())
    }

    pub fn resize(&mut self, megabytes: usize) {
        if Self::bucket_count(megabytes) != self.buckets.len() {
            *self = Self::new(megabytes);
        }
    }

    /// Number of entries the table holds.
    pub fn capacity(&self) -> usize {
        self.buckets.len() * BUCKET_SIZE
    }

    pub fn clear(&self) {
        for bucket in &self.buckets {
            for slot in &bucket.slots {
                slot.clear();
            }
        }
        self.generation.store(0, Ordering::Relaxed);
    }

    /// Starts a new search; older entries become preferred victims.
    pub fn new_search(&self) {
        let next = (self.generation.load(Ordering::Relaxed) + 1) & GENERATION_MASK;
        self.generation.store(next, Ordering::Relaxed);
    }

    #[inline]
    fn generation(&self) -> u8 {
        self.generation.load(Ordering::Relaxed)
    }

    #[inline]
    fn bucket(&self, hash: u64) -> &Bucket {
        &self.buckets[hash as usize & self.mask]
    }

    pub fn probe(&self, hash: u64) -> Option<TtEntry> {
        self.bucket(hash)
            .slots
            .iter()
            .find_map(|slot| slot.read(hash))
            .and_then(TtEntry::unpack)
    }

    /// Stores a search result. `score` is relative to the root and is
    /// converted using the node's `ply`.
    pub fn store(&self, hash: u64, score: i32, depth: i32, bound: Bound, mv: Move, ply: u32) {
        let generation = self.generation();
        let bucket = self.bucket(hash);

        let mut victim = &bucket.slots[0];
        let mut victim_value = i32::MAX;
        let mut previous_move = Move::NULL;
        for slot in &bucket.slots {
            let data = slot.data.load(Ordering::Relaxed);
            if data == 0 {
                victim = slot;
                break;
            }
            if let Some(data) = slot.read(hash) {
                victim = slot;
                previous_move = TtEntry::unpack(data).map_or(Move::NULL, |e| e.mv);
                break;
            }
            let Some(entry) = TtEntry::unpack(data) else {
                victim = slot;
                break;
            };
            let age = (generation.wrapping_sub(entry.generation) & GENERATION_MASK) as i32;
            let value = entry.depth - AGE_WEIGHT * age;
            if value < victim_value {
                victim_value = value;
                victim = slot;
            }
        }

        let entry = TtEntry {
            mv: if mv.is_null() { previous_move } else { mv },
            score: score_to_tt(score, ply),
            depth,
            bound,
            generation,
        };
        victim.write(hash, entry.pack());
    }

    /// Hints the CPU to load the bucket of `hash`.
    #[inline]
    pub fn prefetch(&self, hash: u64) {
        #[cfg(target_arch = "x86_64")]
        unsafe {
            use std::arch::x86_64::{_mm_prefetch, _MM_HINT_T0};
            let ptr = self.bucket(hash) as *const Bucket as *const i8;
            _mm_prefetch::<_MM_HINT_T0>(ptr);
        }
        #[cfg(not(target_arch = "x86_64"))]
        let _ = hash;
    }

    /// Per mille of sampled entries written during the current search.
    pub fn hashfull(&self) -> u32 {
        let generation = self.generation();
        let buckets = (HASHFULL_SAMPLE / BUCKET_SIZE).min(self.buckets.len());
        let mut used = 0;
        for bucket in &self.buckets[..buckets] {
            for slot in &bucket.slots {
                let data = slot.data.load(Ordering::Relaxed);
                if TtEntry::unpack(data).is_some_and(|e| e.generation == generation) {
                    used += 1;
                }
            }
        }
        (used * 1000 / (buckets * BUCKET_SIZE)) as u32
    }
}
