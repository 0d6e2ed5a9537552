//! Cardinality estimator for counting distinct elements in a stream or dataset.
//!
//! The estimator keeps `m = 2^bucket_bits` one-byte registers. Each added
//! value is hashed to 64 bits; the top `bucket_bits` bits select a register
//! and the register keeps the maximum "rank" (leading-zero run length plus
//! one) ever observed in the remaining `64 - bucket_bits` bits. The count is
//! the bias-corrected harmonic mean of the registers.
//!
//! Registers are append-only: they only ever take an elementwise maximum, so
//! re-adding a value never changes the estimate and registers form a
//! `max`-monoid that merges trivially (see [`CardinalityEstimator::merge`]).
//! For concurrent ingestion, shard one estimator per worker and merge.
//!
//! Expected standard error is roughly `1.04 / sqrt(bucket_bits)` as reported
//! by [`CardinalityEstimator::error`]; this is an informational bound, not an
//! enforced one.

use std::fmt::{self, Debug, Formatter};
use std::hash::{BuildHasher, BuildHasherDefault, Hasher};

use tracing::debug;
use wyhash::WyHash;

use crate::error::Error;
use crate::value::Value;

/// Smallest accepted `bucket_bits`.
pub const MIN_BUCKET_BITS: u32 = 1;
/// Largest accepted `bucket_bits`; anything above this makes the register
/// table unreasonably large and leaves too few remainder bits to rank.
pub const MAX_BUCKET_BITS: u32 = 32;

/// HyperLogLog-style estimator of the number of distinct elements added.
pub struct CardinalityEstimator<H: Hasher + Default = WyHash> {
    /// Number of leading hash bits used to select a register.
    bucket_bits: u32,
    /// `2^bucket_bits` registers, each holding the maximum observed rank.
    registers: Vec<u8>,
    /// Zero-sized build hasher
    build_hasher: BuildHasherDefault<H>,
}

impl CardinalityEstimator {
    /// Create a new estimator with `2^bucket_bits` zeroed registers and the
    /// default `WyHash` hasher.
    ///
    /// Returns [`Error::InvalidBucketBits`] unless `1 <= bucket_bits <= 32`.
    pub fn new(bucket_bits: u32) -> Result<Self, Error> {
        Self::with_hasher(bucket_bits)
    }
}

impl<H: Hasher + Default> CardinalityEstimator<H> {
    /// Create a new estimator using hasher `H` for the 64-bit value hash.
    pub fn with_hasher(bucket_bits: u32) -> Result<Self, Error> {
        if !(MIN_BUCKET_BITS..=MAX_BUCKET_BITS).contains(&bucket_bits) {
            return Err(Error::InvalidBucketBits(bucket_bits));
        }
        let m = 1usize << bucket_bits;
        debug!(bucket_bits, registers = m, "created cardinality estimator");
        Ok(Self {
            bucket_bits,
            registers: vec![0; m],
            build_hasher: BuildHasherDefault::default(),
        })
    }

    /// Add a value to the estimator.
    ///
    /// Hashes the canonical byte form of `value`, selects a register by the
    /// top `bucket_bits` bits and raises it to the rank of the remaining bits
    /// if larger. Never fails and never blocks; adding the same value again
    /// is a no-op on the registers.
    #[inline]
    pub fn add(&mut self, value: Value<'_>) {
        let mut hasher = self.build_hasher.build_hasher();
        value.write_canonical(&mut hasher);
        let hash = hasher.finish();

        let idx = (hash >> (64 - self.bucket_bits)) as usize;
        let remainder = hash & (u64::MAX >> self.bucket_bits);
        let rank = rank(remainder, self.bucket_bits);
        if rank > self.registers[idx] {
            self.registers[idx] = rank;
        }
    }

    /// Add a value that may be absent; `None` is a no-op, not an error.
    #[inline]
    pub fn add_opt(&mut self, value: Option<Value<'_>>) {
        if let Some(value) = value {
            self.add(value);
        }
    }

    /// Estimate the number of distinct elements ever added.
    ///
    /// Computes `alpha(m) * m^2 / sum(2^-register)` - the harmonic mean of
    /// the registers with the standard small-range bias correction table.
    /// This is the base estimator only; large-range and empty-sketch
    /// corrections must be layered externally if needed.
    pub fn count(&self) -> f64 {
        let m = self.registers.len() as f64;
        let harmonic_sum: f64 = self
            .registers
            .iter()
            .map(|&r| (-f64::from(r)).exp2())
            .sum();
        alpha(self.registers.len()) * m * m / harmonic_sum
    }

    /// Theoretical standard error of [`count`](Self::count), roughly
    /// `1.04 / sqrt(bucket_bits)`. Informational only.
    pub fn error(&self) -> f64 {
        1.04 / f64::from(self.bucket_bits).sqrt()
    }

    /// Merge another estimator into this one by elementwise register maximum.
    ///
    /// The result is identical to a single estimator that had seen both input
    /// streams. Returns [`Error::MergeMismatch`] if the precisions differ.
    pub fn merge(&mut self, rhs: &Self) -> Result<(), Error> {
        if self.bucket_bits != rhs.bucket_bits {
            return Err(Error::MergeMismatch {
                lhs: self.bucket_bits,
                rhs: rhs.bucket_bits,
            });
        }
        for (lhs, &r) in self.registers.iter_mut().zip(&rhs.registers) {
            if r > *lhs {
                *lhs = r;
            }
        }
        Ok(())
    }

    /// Number of leading hash bits used for register selection.
    #[inline]
    pub fn bucket_bits(&self) -> u32 {
        self.bucket_bits
    }

    /// Number of registers (`2^bucket_bits`).
    #[inline]
    pub fn num_registers(&self) -> usize {
        self.registers.len()
    }

    /// The raw registers, for inspection and external sharding schemes.
    #[inline]
    pub fn registers(&self) -> &[u8] {
        &self.registers
    }

    /// Rebuild an estimator from raw parts. Callers must pass a register
    /// table of length `2^bucket_bits` with ranks within range.
    #[cfg(feature = "with_serde")]
    pub(crate) fn from_parts(bucket_bits: u32, registers: Vec<u8>) -> Self {
        Self {
            bucket_bits,
            registers,
            build_hasher: BuildHasherDefault::default(),
        }
    }
}

/// Rank of `remainder` within its `64 - bucket_bits`-bit field: the count of
/// leading zero bits plus one.
///
/// The top `bucket_bits` bits of `remainder` are always zero, so
/// `leading_zeros` counts them plus the zero run inside the field. An all-zero
/// remainder falls out as the maximum rank `64 - bucket_bits + 1`; that
/// "no one-bit observed" case deliberately counts as the rarest possible
/// observation rather than no observation, preserved from the original sketch
/// construction.
#[inline]
fn rank(remainder: u64, bucket_bits: u32) -> u8 {
    (remainder.leading_zeros() - bucket_bits + 1) as u8
}

/// Parameter for bias correction
#[inline]
fn alpha(m: usize) -> f64 {
    match m {
        16 => 0.673,
        32 => 0.697,
        64 => 0.709,
        _ => 0.7213 / (1.0 + 1.079 / (m as f64)),
    }
}

impl<H: Hasher + Default> Clone for CardinalityEstimator<H> {
    fn clone(&self) -> Self {
        Self {
            bucket_bits: self.bucket_bits,
            registers: self.registers.clone(),
            build_hasher: BuildHasherDefault::default(),
        }
    }
}

impl<H: Hasher + Default> PartialEq for CardinalityEstimator<H> {
    fn eq(&self, rhs: &Self) -> bool {
        self.bucket_bits == rhs.bucket_bits && self.registers == rhs.registers
    }
}

impl<H: Hasher + Default> Debug for CardinalityEstimator<H> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{ bucket_bits: {}, count: {:.2} }}",
            self.bucket_bits,
            self.count()
        )
    }
}
