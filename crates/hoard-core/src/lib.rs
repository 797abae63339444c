//! Core types and the merge policy for the hoard repository catalogue.
//!
//! This crate has no database, network, or file-format dependencies.
//! Storage backends implement [`store::RecordStore`] and source extractors
//! produce [`source::SourceRecord`]s. The identity resolver and the merge
//! engine in between live here.

pub mod error;
pub mod field;
pub mod memory;
pub mod merge;
pub mod record;
pub mod resolve;
pub mod source;
pub mod store;
pub mod update;

pub use error::{Error, Result};
