use patchsmith_model::FieldName;
use patchsmith_types::{PluginName, RecordType, Tag};

/// Result type for merge operations.
pub type MergeResult<T> = Result<T, MergeError>;

/// Errors that stop a patch build.
///
/// Schema mismatches and missing masters are not errors; they are counted
/// into the [`MergeReport`](crate::MergeReport) instead.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("{plugin} is tagged {tag} without {requires}")]
    TagContradiction {
        plugin: PluginName,
        tag: Tag,
        requires: Tag,
    },

    #[error("{merger}: record type {record_type} has no {field} field")]
    UnsupportedField {
        merger: String,
        record_type: RecordType,
        field: FieldName,
    },

    #[error("patch build aborted after scanning {0}")]
    Aborted(PluginName),

    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),
}
