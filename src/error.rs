//! Error types for `hash-primitives`.
//!
//! All variants are configuration-time errors surfaced at construction or
//! merge; `add`, `placement` and `target_bucket` never fail on well-formed
//! input. Construction is atomic, so a returned error leaves no partial state.

use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// `bucket_bits` would produce an empty or unboundedly large register table.
    #[error("bucket_bits must be in 1..=32, got {0}")]
    InvalidBucketBits(u32),

    /// The (`buckets`, `replicas`) pair would produce a ring with no entries.
    #[error("ring requires at least one bucket and one replica, got buckets: {buckets}, replicas: {replicas}")]
    EmptyRing {
        /// Requested number of physical buckets.
        buckets: u32,
        /// Requested virtual replicas per bucket.
        replicas: u32,
    },

    /// Estimators with different precision cannot be merged register-wise.
    #[error("cannot merge estimators with bucket_bits {lhs} and {rhs}")]
    MergeMismatch {
        /// `bucket_bits` of the destination estimator.
        lhs: u32,
        /// `bucket_bits` of the source estimator.
        rhs: u32,
    },
}
