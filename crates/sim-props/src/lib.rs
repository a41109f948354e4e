//! Stage-scoped, validated property storage.
//!
//! Every mutable value attached to a simulated asset lives in a
//! [`ValueStore`]: versioned per stage, resolved between a shared and a
//! per-stage local slot, and run through a validator pipeline before any
//! write commits. [`PropertyDefinition`] binds a store to a name and gives
//! owners a uniform, non-generic way to read and write it.

pub mod definition;
pub mod error;
pub mod store;

pub use definition::{PropertyDefinition, PropertyState, StageEntryState};
pub use error::{PropertyError, Result};
pub use store::{StageEntry, Validation, ValidatorId, ValueCommit, ValueStore};
