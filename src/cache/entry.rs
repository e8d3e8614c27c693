//! Cache Entry Module
//!
//! Defines the structure for individual cached blobs.

// == Cache Entry ==
/// A single cached blob. The store owns the payload exclusively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// The stored payload
    payload: Vec<u8>,
}

impl CacheEntry {
    // == Constructor ==
    /// Wraps a payload into an entry.
    pub fn new(payload: Vec<u8>) -> Self {
        Self { payload }
    }

    // == Size ==
    /// Payload size in bytes, the unit the capacity is accounted in.
    pub fn size(&self) -> u64 {
        self.payload.len() as u64
    }

    // == Copy Payload ==
    /// Returns a private copy of the payload.
    ///
    /// The internally owned buffer never leaves the store, so callers cannot
    /// mutate cached state through what they receive.
    pub fn copy_payload(&self) -> Vec<u8> {
        self.payload.clone()
    }

    /// Borrows the payload.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}
