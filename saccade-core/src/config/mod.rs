//! Configuration types
//!
//! The persisted servo configuration record and its compiled defaults.

pub mod record;

pub use record::*;
