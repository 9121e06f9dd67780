//! Opaque byte-string keys addressed by the multi-version memory map.
//!
//! The external contract is byte-identity (`spec.md` §3: "equality by byte
//! content"); internally a [`Key`] wraps an [`Arc<[u8]>`] so that cloning a
//! key into a read or write descriptor is cheap regardless of its length.

use std::fmt;
use std::sync::Arc;

/// A byte-string key into the multi-version memory map.
///
/// Two keys are equal iff their byte contents are equal; the crate never
/// interprets key bytes beyond hashing and comparing them.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(Arc<[u8]>);

impl Key {
    /// Builds a key from any byte-convertible value.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Key(bytes.into().into())
    }

    /// Returns the key's byte content.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Key {
    fn from(bytes: Vec<u8>) -> Self {
        Key(bytes.into())
    }
}

impl From<&[u8]> for Key {
    fn from(bytes: &[u8]) -> Self {
        Key(bytes.into())
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key(s.as_bytes().into())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key(s.into_bytes().into())
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(&self.0) {
            Ok(s) => write!(f, "Key({s:?})"),
            Err(_) => write!(f, "Key({:?})", self.0),
        }
    }
}

/// A value stored in the multi-version memory map: an opaque byte string.
pub type Value = Arc<[u8]>;

/// Builds a [`Value`] from any byte-convertible input.
pub fn value_of(bytes: impl Into<Vec<u8>>) -> Value {
    bytes.into().into()
}
