//! Record and plugin model for patchsmith.
//!
//! Defines the read-only view the mergers work against:
//! - [`Entry`]: an element of a mergeable field, with a comparison key
//! - [`Record`]: a parsed record with id, type, editor id and typed fields
//! - [`FieldAccess`]: typed accessor pairs selected from the capability table
//! - [`Plugin`] / [`LoadOrder`]: plugin metadata (masters, tags, load order)
//! - [`RecordSource`] / [`RecordStore`]: parsed input records and the
//!   patch's own record set
//!
//! Parsing and writing plugin files is not part of this crate; callers hand
//! over already-parsed records.

mod entry;
mod plugin;
mod record;
mod schema;
mod store;

pub use entry::{Entry, FactionRelation, InventoryEntry, LeveledEntry};
pub use plugin::{LoadOrder, Plugin};
pub use record::{FieldName, FieldValue, LeveledList, Record};
pub use schema::{FieldAccess, supported_fields, supports};
pub use store::{PatchFile, RecordSource, RecordStore};

use patchsmith_types::PluginName;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while building the model.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("plugin appears more than once in the load order: {0}")]
    DuplicatePlugin(PluginName),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
