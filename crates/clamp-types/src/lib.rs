//! Core types for Clamp, a version control layer over vector databases.
//!
//! This crate defines the shared vocabulary of the system:
//! - the control-plane records (`Commit`, `Deployment`)
//! - the caller-facing document model (`Document`, `PointId`)
//! - the error taxonomy (`ClampError`)
//! - deterministic content addressing for commits (`hash`)
//!
//! Design stance:
//! - Commits are immutable and content-addressed; the ledger is the system
//!   of record for which commit is deployed per group.
//! - The data-plane store only ever sees version metadata through three
//!   reserved payload keys, so caller payloads can never corrupt it.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod error;
pub mod hash;
mod model;

pub use error::{ClampError, ClampResult, RollbackStage};
pub use model::{
    Commit, Deployment, DeploymentStatus, Document, PointId, ACTIVE_KEY, COMMIT_HASH_LEN,
    GROUP_KEY, SHORT_HASH_LEN, VERSION_KEY,
};
