//! Core type definitions for patchsmith.
//!
//! This crate defines the fundamental, merger-agnostic types used throughout
//! the patch engine:
//! - Plugin names (case-insensitive, as the game treats them)
//! - Record identifiers ("FormIDs": originating plugin + object id)
//! - Record type signatures
//! - Capability tags applied to plugins, and the rules tying them together
//!
//! Record contents and merge semantics belong in `patchsmith-model` and
//! `patchsmith-merge`, not here.

mod ids;
mod record_type;
mod tags;

pub use ids::{PluginName, RecordId};
pub use record_type::RecordType;
pub use tags::{Tag, TagSet, TagViolation};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid record id: {0}")]
    InvalidRecordId(String),

    #[error("unknown record type: {0}")]
    UnknownRecordType(String),

    #[error("unknown tag: {0}")]
    UnknownTag(String),
}
