//! The hoard batch pipeline.
//!
//! Streams source records from `hoard-sources` through identity resolution
//! and the merge engine into any [`RecordStore`](hoard_core::store::RecordStore),
//! plus the maintenance operations (missing-record scans, consistency
//! repair, visibility verification) run by the `hoard` binary.

pub mod config;
pub mod error;
pub mod ops;
pub mod pipeline;
pub mod probe;

pub use config::{BatchConfig, ProbeConfig};
pub use error::{Error, Result};
pub use pipeline::{Batch, BatchOptions, BatchSummary, Outcome, run_batch};
