//! Consistent hash ring with virtual-replica placement.
//!
//! Each of `buckets` physical buckets contributes `replicas` virtual nodes:
//! `(position, bucket)` pairs whose positions are derived by hashing the
//! bucket id with the replica index as the rehash count. The full cross
//! product is built eagerly at construction, sorted ascending by position
//! (ties broken by bucket id through plain tuple ordering), and never mutated
//! afterwards - lookups are pure reads, so a constructed ring is safe to
//! share across any number of readers.
//!
//! A key maps to the bucket of the first ring entry at or after the key's
//! hashed position, wrapping past the end of the keyspace back to the first
//! entry. With enough replicas per bucket the arcs between entries even out
//! and load spreads uniformly; when the bucket count changes, only keys whose
//! nearest successor belonged to the changed bucket move.

use std::fmt::{self, Debug, Formatter};
use std::hash::{BuildHasher, BuildHasherDefault, Hasher};

use tracing::debug;
use wyhash::WyHash;

use crate::error::Error;
use crate::value::Value;

/// Replica count that smooths load well for typical bucket counts.
pub const DEFAULT_REPLICAS: u32 = 200;

/// Immutable ring mapping hashed keys to physical bucket ids.
pub struct ConsistentHashRing<H: Hasher + Default = WyHash> {
    /// `(position, bucket)` virtual nodes, sorted ascending.
    ring: Vec<(u64, u32)>,
    /// Number of physical buckets, addressed as `0..buckets`.
    buckets: u32,
    /// Virtual nodes per physical bucket.
    replicas: u32,
    /// Zero-sized build hasher
    build_hasher: BuildHasherDefault<H>,
}

impl ConsistentHashRing {
    /// Build a ring of `buckets * replicas` virtual nodes with the default
    /// `WyHash` hasher.
    ///
    /// Returns [`Error::EmptyRing`] if either argument is zero; otherwise the
    /// fully sorted ring is built before returning.
    pub fn new(buckets: u32, replicas: u32) -> Result<Self, Error> {
        Self::with_hasher(buckets, replicas)
    }
}

impl<H: Hasher + Default> ConsistentHashRing<H> {
    /// Build a ring using hasher `H` for all position derivation.
    pub fn with_hasher(buckets: u32, replicas: u32) -> Result<Self, Error> {
        if buckets == 0 || replicas == 0 {
            return Err(Error::EmptyRing { buckets, replicas });
        }

        let build_hasher = BuildHasherDefault::<H>::default();
        let mut ring = Vec::with_capacity(buckets as usize * replicas as usize);
        for b in 0..buckets {
            for x in 0..replicas {
                let position = placement_in(&build_hasher, Value::Integer(u64::from(b)), x);
                ring.push((position, b));
            }
        }
        ring.sort_unstable();
        debug!(buckets, replicas, entries = ring.len(), "built consistent hash ring");

        Ok(Self {
            ring,
            buckets,
            replicas,
            build_hasher,
        })
    }

    /// Derive the ring position for a value.
    ///
    /// With `k == 0` this is the hash of the value's canonical bytes. Each
    /// increment of `k` rehashes the previous position offset by the step
    /// index, giving a stable sequence of pseudo-independent positions for
    /// one logical key - used to pick multiple distinct target buckets (e.g.
    /// replica owners) without independent hash functions.
    #[inline]
    pub fn placement(&self, value: Value<'_>, k: u32) -> u64 {
        placement_in(&self.build_hasher, value, k)
    }

    /// Bucket id of the first ring entry at or after `position`, wrapping to
    /// the first entry past the end of the keyspace.
    ///
    /// Binary search seeded with the expected index for a uniform ring
    /// (`position * len / 2^64`); the seed only saves probes and cannot
    /// change the result.
    pub fn next_object(&self, position: u64) -> u32 {
        let ring = &self.ring;
        if position > ring[ring.len() - 1].0 {
            return ring[0].1;
        }

        let mut lo = 0;
        let mut hi = ring.len();
        let mut probe = ((u128::from(position) * ring.len() as u128) >> 64) as usize;
        while lo < hi {
            if ring[probe].0 < position {
                lo = probe + 1;
            } else {
                hi = probe;
            }
            probe = lo + (hi - lo) / 2;
        }
        ring[lo].1
    }

    /// Map a value to its target bucket; `k` selects the k-th alternate
    /// landing for the same key (see [`placement`](Self::placement)).
    #[inline]
    pub fn target_bucket(&self, value: Value<'_>, k: u32) -> u32 {
        self.next_object(self.placement(value, k))
    }

    /// Theoretical fraction of keys expected to change buckets when resizing
    /// this ring to `new_buckets` buckets.
    pub fn expected_move_rate(&self, new_buckets: u32) -> f64 {
        let old = f64::from(self.buckets) + 1.0;
        let new = f64::from(new_buckets) + 1.0;
        (new - old).abs() / old
    }

    /// Number of physical buckets.
    #[inline]
    pub fn buckets(&self) -> u32 {
        self.buckets
    }

    /// Virtual nodes per physical bucket.
    #[inline]
    pub fn replicas(&self) -> u32 {
        self.replicas
    }

    /// Total number of virtual nodes (`buckets * replicas`).
    #[inline]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// A constructed ring always has at least one entry.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Sorted `(position, bucket)` entries, for inspection.
    #[inline]
    pub fn entries(&self) -> &[(u64, u32)] {
        &self.ring
    }
}

/// Position derivation shared by construction and lookup: hash the canonical
/// bytes, then fold in `k` rehash steps of `hash(position + step)` with the
/// position re-encoded as 8 big-endian bytes each round. The addition wraps
/// at the keyspace boundary.
fn placement_in<H: Hasher + Default>(
    build_hasher: &BuildHasherDefault<H>,
    value: Value<'_>,
    k: u32,
) -> u64 {
    let mut hasher = build_hasher.build_hasher();
    value.write_canonical(&mut hasher);
    let mut position = hasher.finish();

    for step in 1..=k {
        let mut hasher = build_hasher.build_hasher();
        Value::Integer(position.wrapping_add(u64::from(step))).write_canonical(&mut hasher);
        position = hasher.finish();
    }

    position
}

impl<H: Hasher + Default> Clone for ConsistentHashRing<H> {
    fn clone(&self) -> Self {
        Self {
            ring: self.ring.clone(),
            buckets: self.buckets,
            replicas: self.replicas,
            build_hasher: BuildHasherDefault::default(),
        }
    }
}

impl<H: Hasher + Default> PartialEq for ConsistentHashRing<H> {
    fn eq(&self, rhs: &Self) -> bool {
        self.buckets == rhs.buckets && self.replicas == rhs.replicas
    }
}

impl<H: Hasher + Default> Debug for ConsistentHashRing<H> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{ buckets: {}, replicas: {}, entries: {} }}",
            self.buckets,
            self.replicas,
            self.ring.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use test_case::test_case;

    /// Plain linear scan for the nearest successor, used as the reference
    /// implementation for the seeded binary search.
    fn reference_successor(entries: &[(u64, u32)], position: u64) -> u32 {
        entries
            .iter()
            .find(|e| e.0 >= position)
            .map_or(entries[0].1, |e| e.1)
    }

    #[test_case(1, 1)]
    #[test_case(1, 200)]
    #[test_case(4, 50)]
    #[test_case(7, 100)]
    #[test_case(10, 200)]
    fn test_ring_size_and_order(buckets: u32, replicas: u32) {
        let ring = ConsistentHashRing::new(buckets, replicas).unwrap();
        assert_eq!(ring.len(), buckets as usize * replicas as usize);
        assert!(!ring.is_empty());
        assert!(ring.entries().windows(2).all(|w| w[0] <= w[1]));
        assert!(ring.entries().iter().all(|e| e.1 < buckets));
    }

    #[test_case(0, 200)]
    #[test_case(4, 0)]
    #[test_case(0, 0)]
    fn test_degenerate_ring_rejected(buckets: u32, replicas: u32) {
        assert_eq!(
            ConsistentHashRing::new(buckets, replicas).unwrap_err(),
            Error::EmptyRing { buckets, replicas }
        );
    }

    #[test]
    fn test_target_bucket_deterministic() {
        let ring = ConsistentHashRing::new(4, 50).unwrap();
        let first = ring.target_bucket(Value::Text("a"), 0);
        let second = ring.target_bucket(Value::Text("a"), 0);
        assert_eq!(first, second);
        assert!(first < 4);
        // alternate landings for the same key are allowed to differ
        let _ = ring.target_bucket(Value::Text("a"), 1);
    }

    #[test]
    fn test_placement_deterministic_and_distinct_per_k() {
        let ring = ConsistentHashRing::new(4, 50).unwrap();
        let positions: Vec<u64> = (0..8)
            .map(|k| ring.placement(Value::Text("design"), k))
            .collect();
        let replay: Vec<u64> = (0..8)
            .map(|k| ring.placement(Value::Text("design"), k))
            .collect();
        assert_eq!(positions, replay);

        let mut unique = positions.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), positions.len(), "rehash sequence collided");
    }

    #[test]
    fn test_placement_matches_rehash_recurrence() {
        let ring = ConsistentHashRing::new(2, 10).unwrap();
        let p0 = ring.placement(Value::Text("robin"), 0);
        let p1 = ring.placement(Value::Text("robin"), 1);
        let p2 = ring.placement(Value::Text("robin"), 2);
        assert_eq!(p1, Value::Integer(p0.wrapping_add(1)).hash64::<WyHash>());
        assert_eq!(p2, Value::Integer(p1.wrapping_add(2)).hash64::<WyHash>());
    }

    #[test]
    fn test_next_object_full_coverage() {
        let ring = ConsistentHashRing::new(5, 100).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10_000 {
            let position: u64 = rng.gen();
            assert!(ring.next_object(position) < 5);
        }
        assert!(ring.next_object(0) < 5);
        assert!(ring.next_object(u64::MAX) < 5);
    }

    #[test]
    fn test_next_object_matches_linear_scan() {
        let ring = ConsistentHashRing::new(6, 80).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..10_000 {
            let position: u64 = rng.gen();
            assert_eq!(
                ring.next_object(position),
                reference_successor(ring.entries(), position),
                "seeded search diverged at position {position}"
            );
        }
        // exact entry positions and their neighbors
        for &(position, _) in ring.entries().iter().take(64) {
            for p in [position.wrapping_sub(1), position, position.wrapping_add(1)] {
                assert_eq!(ring.next_object(p), reference_successor(ring.entries(), p));
            }
        }
    }

    #[test]
    fn test_wraps_past_last_entry() {
        let ring = ConsistentHashRing::new(3, 40).unwrap();
        let entries = ring.entries();
        let last = entries[entries.len() - 1].0;
        if last < u64::MAX {
            assert_eq!(ring.next_object(last + 1), entries[0].1);
        }
        assert_eq!(ring.next_object(entries[0].0), entries[0].1);
    }

    #[test]
    fn test_single_bucket_takes_everything() {
        let ring = ConsistentHashRing::new(1, 16).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..1000 {
            assert_eq!(ring.next_object(rng.gen()), 0);
        }
    }

    #[test]
    fn test_same_config_same_ring() {
        let a = ConsistentHashRing::new(8, 64).unwrap();
        let b = ConsistentHashRing::new(8, 64).unwrap();
        assert_eq!(a.entries(), b.entries());
    }

    #[test_case(10, 9 => 0.09090909090909091)]
    #[test_case(10, 11 => 0.09090909090909091)]
    #[test_case(10, 10 => 0.0)]
    fn test_expected_move_rate(buckets: u32, new_buckets: u32) -> f64 {
        let ring = ConsistentHashRing::new(buckets, 10).unwrap();
        ring.expected_move_rate(new_buckets)
    }

    #[test]
    fn test_accessors() {
        let ring = ConsistentHashRing::new(4, DEFAULT_REPLICAS).unwrap();
        assert_eq!(ring.buckets(), 4);
        assert_eq!(ring.replicas(), DEFAULT_REPLICAS);
        assert_eq!(ring.len(), 800);
    }
}
