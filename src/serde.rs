//! # Serde support (feature `with_serde`)
//!
//! `CardinalityEstimator` serializes as the tuple `(bucket_bits, registers)`;
//! deserialization validates that the register table has exactly
//! `2^bucket_bits` entries with ranks that the sketch could actually produce.
//!
//! `ConsistentHashRing` is a pure function of its configuration, so it
//! serializes as `(buckets, replicas)` and is rebuilt on deserialization -
//! there is no way to smuggle in an unsorted or wrongly sized ring.

use std::hash::Hasher;

use serde::de::Error as DeError;
use serde::ser::SerializeTuple;
use serde::{Deserialize, Serialize};

use crate::estimator::{CardinalityEstimator, MAX_BUCKET_BITS, MIN_BUCKET_BITS};
use crate::ring::ConsistentHashRing;

impl<H: Hasher + Default> Serialize for CardinalityEstimator<H> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut tup = serializer.serialize_tuple(2)?;
        tup.serialize_element(&self.bucket_bits())?;
        tup.serialize_element(self.registers())?;
        tup.end()
    }
}

impl<'de, H: Hasher + Default> Deserialize<'de> for CardinalityEstimator<H> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let (bucket_bits, registers): (u32, Vec<u8>) = Deserialize::deserialize(deserializer)?;

        if !(MIN_BUCKET_BITS..=MAX_BUCKET_BITS).contains(&bucket_bits) {
            return Err(D::Error::custom(format!(
                "bucket_bits out of range: {bucket_bits}"
            )));
        }
        if registers.len() != 1usize << bucket_bits {
            return Err(D::Error::custom(format!(
                "expected {} registers, got {}",
                1usize << bucket_bits,
                registers.len()
            )));
        }
        let max_rank = 64 - bucket_bits + 1;
        if registers.iter().any(|&r| u32::from(r) > max_rank) {
            return Err(D::Error::custom("register rank out of range"));
        }

        Ok(CardinalityEstimator::<H>::from_parts(bucket_bits, registers))
    }
}

impl<H: Hasher + Default> Serialize for ConsistentHashRing<H> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut tup = serializer.serialize_tuple(2)?;
        tup.serialize_element(&self.buckets())?;
        tup.serialize_element(&self.replicas())?;
        tup.end()
    }
}

impl<'de, H: Hasher + Default> Deserialize<'de> for ConsistentHashRing<H> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let (buckets, replicas): (u32, u32) = Deserialize::deserialize(deserializer)?;
        ConsistentHashRing::<H>::with_hasher(buckets, replicas)
            .map_err(|e| D::Error::custom(e.to_string()))
    }
}
