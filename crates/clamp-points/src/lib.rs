//! Data-plane adapter for Clamp.
//!
//! Wraps an external vector store behind the [`PointStore`] trait: batch
//! upsert with injected version metadata, batch activate/deactivate by
//! `(group, version)`, and counting. The store itself (similarity search,
//! collection schemas) stays external; this crate only manages the three
//! reserved payload keys that carry version state.
//!
//! Backends:
//! - [`MemoryPointStore`]: reference implementation for tests and demos.
//! - `QdrantPointStore` (feature `qdrant`): Qdrant over its REST API.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod filter;
mod memory;
#[cfg(feature = "qdrant")]
mod qdrant;
mod traits;

pub use filter::{FieldCondition, MatchValue, PointFilter};
pub use memory::MemoryPointStore;
#[cfg(feature = "qdrant")]
pub use qdrant::QdrantPointStore;
pub use traits::{PointStore, StoredPoint};
