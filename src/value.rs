//! Canonical byte encoding of input values.
//!
//! Both the cardinality estimator and the hash ring accept raw bytes, UTF-8
//! text, or unsigned 64-bit integers. Each variant has exactly one canonical
//! byte form which is what gets hashed:
//! - `Bytes`   - the bytes as-is
//! - `Text`    - the UTF-8 bytes of the string
//! - `Integer` - fixed-width 8-byte big-endian
//!
//! The integer encoding is fixed: `Integer(n)` and the 8-byte big-endian form
//! of `n` passed as `Bytes` hash identically, which is what makes placements
//! reproducible across implementations sharing the same hash function.

use std::hash::Hasher;

/// An input value with a defined canonical byte encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value<'a> {
    /// Raw byte sequence, hashed as-is.
    Bytes(&'a [u8]),
    /// UTF-8 text, hashed as its UTF-8 bytes.
    Text(&'a str),
    /// Unsigned 64-bit integer, hashed as 8 big-endian bytes.
    Integer(u64),
}

impl Value<'_> {
    /// Feed the canonical byte form of this value into `hasher`.
    #[inline]
    pub fn write_canonical<H: Hasher>(&self, hasher: &mut H) {
        match *self {
            Value::Bytes(bytes) => hasher.write(bytes),
            Value::Text(text) => hasher.write(text.as_bytes()),
            Value::Integer(n) => hasher.write(&n.to_be_bytes()),
        }
    }

    /// Hash the canonical byte form of this value to a 64-bit position
    /// using a fresh instance of `H`.
    #[inline]
    pub fn hash64<H: Hasher + Default>(&self) -> u64 {
        let mut hasher = H::default();
        self.write_canonical(&mut hasher);
        hasher.finish()
    }
}

impl<'a> From<&'a [u8]> for Value<'a> {
    #[inline]
    fn from(bytes: &'a [u8]) -> Self {
        Value::Bytes(bytes)
    }
}

impl<'a> From<&'a str> for Value<'a> {
    #[inline]
    fn from(text: &'a str) -> Self {
        Value::Text(text)
    }
}

impl From<u64> for Value<'_> {
    #[inline]
    fn from(n: u64) -> Self {
        Value::Integer(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;
    use wyhash::WyHash;

    #[test_case(0)]
    #[test_case(1)]
    #[test_case(0x0102_0304_0506_0708)]
    #[test_case(u64::MAX)]
    fn test_integer_encoding_is_big_endian(n: u64) {
        let be = n.to_be_bytes();
        assert_eq!(
            Value::Integer(n).hash64::<WyHash>(),
            Value::Bytes(&be).hash64::<WyHash>(),
        );
    }

    #[test]
    fn test_text_hashes_as_utf8_bytes() {
        assert_eq!(
            Value::Text("spiffy").hash64::<WyHash>(),
            Value::Bytes(b"spiffy").hash64::<WyHash>(),
        );
    }

    #[test]
    fn test_hash_is_deterministic() {
        let v = Value::Text("check");
        assert_eq!(v.hash64::<WyHash>(), v.hash64::<WyHash>());
    }

    #[test]
    fn test_from_conversions() {
        assert_eq!(Value::from("peace"), Value::Text("peace"));
        assert_eq!(Value::from(&b"milk"[..]), Value::Bytes(b"milk"));
        assert_eq!(Value::from(42u64), Value::Integer(42));
    }
}
