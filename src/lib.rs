//! `hash-primitives` provides two hash-driven distribution primitives: a HyperLogLog-style
//! [`CardinalityEstimator`] and a [`ConsistentHashRing`] with virtual-replica placement.
//!
//! Both components hash the canonical byte form of a [`Value`] (raw bytes, UTF-8 text, or an
//! unsigned integer encoded as 8 big-endian bytes) with a pluggable 64-bit hasher, `WyHash` by
//! default. They are independent of each other, single-threaded, and never block; a constructed
//! ring is immutable and safe to share across readers.
//!
//! ```
//! use hash_primitives::{CardinalityEstimator, ConsistentHashRing, Value};
//!
//! let mut estimator = CardinalityEstimator::new(12)?;
//! for i in 0..1000u64 {
//!     estimator.add(Value::Integer(i));
//! }
//! assert!((estimator.count() / 1000.0 - 1.0).abs() < 0.1);
//!
//! let ring = ConsistentHashRing::new(4, 200)?;
//! let primary = ring.target_bucket(Value::Text("some-key"), 0);
//! let fallback = ring.target_bucket(Value::Text("some-key"), 1);
//! assert!(primary < 4 && fallback < 4);
//! # Ok::<(), hash_primitives::Error>(())
//! ```
mod error;
pub mod estimator;
pub mod ring;
pub mod value;

#[cfg(feature = "with_serde")]
mod serde;

pub use crate::error::Error;
pub use crate::estimator::CardinalityEstimator;
pub use crate::ring::ConsistentHashRing;
pub use crate::value::Value;
