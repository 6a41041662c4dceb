//! Control-plane ledger for Clamp.
//!
//! The ledger is the durable store of two entity types: immutable,
//! append-only `Commit` records and one mutable `Deployment` pointer per
//! group. Every write is visible to subsequent reads before the call
//! returns; there is no asynchronous flush window observable to callers.
//!
//! Backends:
//! - [`MemoryLedger`]: deterministic, test-friendly reference implementation.
//! - `SqliteLedger` (feature `sqlite`): durable backend for real deployments.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;
mod traits;

pub use memory::MemoryLedger;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteLedger;
pub use traits::Ledger;
