use crate::codec::WORD_SIZE;
use serde::Deserialize;
use xxhash_rust::xxh64::xxh64;

// ─── Hash Directory ─────────────────────────────────────────────────────────
//
//  The hash file is an array of `record_count × hash_multiplier` words.
//  A word of 0 marks an empty bucket; any other value is `ordinal + 1`.
//
//  Lookup starts at `hash(name) mod bucket_count` and, after the i-th
//  collision, moves `2^i − 1` buckets further on from the previous probe:
//
//      p0
//      p1 = p0 + 1
//      p2 = p1 + 3
//      p3 = p2 + 7
//      ...            (all modulo bucket_count)
//
//  The writer placed records with the same walk, so the reader must
//  reproduce it exactly.

/// Maps a record name to its home bucket.
pub trait NameHasher {
    /// Home bucket of `key` in a table of `bucket_count` buckets.
    /// `bucket_count` is never zero.
    fn bucket(&self, key: &[u8], bucket_count: u64) -> u64;
}

impl<F> NameHasher for F
where
    F: Fn(&[u8], u64) -> u64,
{
    #[inline]
    fn bucket(&self, key: &[u8], bucket_count: u64) -> u64 {
        self(key, bucket_count)
    }
}

/// Default hasher: `xxh64(key, seed) mod bucket_count`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Xxh64Hasher {
    pub seed: u64,
}

impl NameHasher for Xxh64Hasher {
    #[inline]
    fn bucket(&self, key: &[u8], bucket_count: u64) -> u64 {
        xxh64(key, self.seed) % bucket_count
    }
}

/// How the probe position is carried between steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeArithmetic {
    /// Position kept as a byte offset into the hash file and reduced modulo
    /// the table size in bytes, exactly as existing hash files were probed.
    #[default]
    ByteOffset,
    /// Position kept as a bucket number and reduced modulo the bucket count.
    Bucket,
}

// ─── Probe ──────────────────────────────────────────────────────────────────

/// The walk over hash-file positions for one lookup.
///
/// Iterating yields byte positions into the hash file, starting with the home
/// bucket. The sequence never ends; the caller stops on a match or an empty
/// bucket.
#[derive(Debug, Clone)]
pub struct Probe {
    arithmetic: ProbeArithmetic,
    bucket_count: u64,
    /// `bucket_count × 8`, saturated. Exact whenever [`table_bytes`] accepts
    /// `bucket_count`.
    table_bytes: u64,
    /// Byte offset for `ByteOffset`, bucket number for `Bucket`.
    position: u64,
    collisions: u32,
    /// `2^collisions mod bucket_count`, only used by `Bucket`.
    pow2: u64,
    started: bool,
}

impl Probe {
    pub fn new(home_bucket: u64, bucket_count: u64, arithmetic: ProbeArithmetic) -> Self {
        debug_assert!(bucket_count > 0);
        let position = match arithmetic {
            ProbeArithmetic::ByteOffset => home_bucket.wrapping_mul(WORD_SIZE),
            ProbeArithmetic::Bucket => home_bucket % bucket_count,
        };
        Self {
            arithmetic,
            bucket_count,
            table_bytes: bucket_count.saturating_mul(WORD_SIZE),
            position,
            collisions: 0,
            pow2: 1 % bucket_count,
            started: false,
        }
    }

    /// Collisions seen so far.
    #[inline]
    pub fn collisions(&self) -> u32 {
        self.collisions
    }

    /// Byte offset of the current probe.
    #[inline]
    pub fn position(&self) -> u64 {
        match self.arithmetic {
            ProbeArithmetic::ByteOffset => self.position,
            ProbeArithmetic::Bucket => self.position * WORD_SIZE,
        }
    }

    /// Record a collision at the current position and move to the next one.
    pub fn advance(&mut self) {
        self.collisions += 1;
        match self.arithmetic {
            ProbeArithmetic::ByteOffset => {
                let step = WORD_SIZE.wrapping_mul(pow2_minus_one(self.collisions));
                self.position = self.position.wrapping_add(step) % self.table_bytes;
            }
            ProbeArithmetic::Bucket => {
                let n = self.bucket_count as u128;
                let pow2 = (self.pow2 as u128 * 2) % n;
                self.pow2 = pow2 as u64;
                let step = (pow2 + n - 1) % n;
                self.position = ((self.position as u128 + step) % n) as u64;
            }
        }
    }
}

impl Iterator for Probe {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        if self.started {
            self.advance();
        }
        self.started = true;
        Some(Probe::position(self))
    }
}

/// Length in bytes of a hash file with `bucket_count` buckets, or `None` when
/// the last byte offset would not fit in a `u64`.
#[inline]
pub fn table_bytes(bucket_count: u64) -> Option<u64> {
    bucket_count.checked_mul(WORD_SIZE)
}

/// `2^n − 1` in `u64`, saturating to all ones once the shift leaves the word.
/// The step keeps doubling past 32 collisions instead of truncating to 32 bits.
#[inline]
fn pow2_minus_one(n: u32) -> u64 {
    1u64.checked_shl(n).unwrap_or(0).wrapping_sub(1)
}
