#![forbid(unsafe_code)]

//! Vector store contract.
//!
//! The visualization never mutates vectors itself; it asks a store and then
//! re-reads a snapshot. Every request either succeeds or fails with a
//! [`StoreError`] the caller can recover from.

mod memory;

use std::fmt;

pub use memory::MemoryStore;

use crate::error::StoreError;
use crate::snapshot::RawSnapshot;

/// Handle of a vector inside a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VectorId(pub u64);

impl fmt::Display for VectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vec{}", self.0)
    }
}

pub trait VectorStore {
    /// Create a vector holding `initial_size` elements (empty when `None`).
    fn create_vector(&mut self, initial_size: Option<usize>) -> Result<VectorId, StoreError>;

    /// Serialized tree of `id`.
    fn snapshot(&self, id: VectorId) -> Result<RawSnapshot, StoreError>;

    /// Number of elements in `id`.
    fn len(&self, id: VectorId) -> Result<usize, StoreError>;

    /// Grow or shrink `id` to `size` elements.
    fn resize(&mut self, id: VectorId, size: usize) -> Result<(), StoreError>;

    /// Move elements `index..` of `id` into a new vector and return it.
    fn split_at(&mut self, id: VectorId, index: usize) -> Result<VectorId, StoreError>;

    /// Append `other` to `id`; `other` is consumed.
    fn concatenate(&mut self, id: VectorId, other: VectorId) -> Result<(), StoreError>;

    /// Fold every vector into the first one, in id order. Returns the survivor.
    fn concatenate_all(&mut self) -> Result<Option<VectorId>, StoreError>;

    fn vector_count(&self) -> usize;

    /// Live vectors, in id order.
    fn vector_ids(&self) -> Vec<VectorId>;
}
