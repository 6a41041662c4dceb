//! Version orchestrator for Clamp.
//!
//! [`ClampClient`] is the client-facing engine: it implements ingest,
//! rollback, status, history, and group purge by composing the
//! control-plane ledger and the data-plane point store under a fixed-order
//! consistency protocol. The two stores cannot be committed as one
//! transaction; step ordering is chosen so the worst observable
//! intermediate state is "extra version active", never "zero versions
//! active" or an orphaned pointer.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod client;
mod locks;

pub use client::ClampClient;
