//! The interface every merger implements, and what the engine hands it.

use crate::config::MergeConfig;
use crate::report::MergeReport;
use crate::{MergeError, MergeResult};
use patchsmith_model::{FieldName, LoadOrder, Plugin, Record, RecordSource, RecordStore, supports};
use patchsmith_types::{PluginName, RecordId, RecordType, Tag};

/// Read-only view of the build a strategy is initialized for.
#[derive(Clone, Copy)]
pub struct PatchContext<'a> {
    pub load_order: &'a LoadOrder,
    pub records: &'a dyn RecordSource,
    pub config: &'a MergeConfig,
}

impl PatchContext<'_> {
    /// Records of `plugin`, or an empty slice when its data is unavailable.
    #[must_use]
    pub fn records_of(&self, plugin: &PluginName) -> &[Record] {
        self.records.records(plugin).unwrap_or(&[])
    }
}

/// Outcome of [`MergeStrategy::initialize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    Active,
    /// The strategy has nothing to do this build and will not be scanned.
    Inactive { reason: String },
}

impl Activation {
    pub(crate) fn inactive(reason: impl Into<String>) -> Self {
        Self::Inactive {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// A two-pass merger: scan every relevant plugin in load order, then build.
///
/// All working state belongs to the strategy instance and lives for one
/// build only. The engine runs strategies one after another, never
/// interleaving two build passes.
pub trait MergeStrategy {
    /// Display name, also the key of [`MergeConfig::sources`].
    fn name(&self) -> &str;

    /// Tags that make a plugin a source of this strategy.
    fn source_tags(&self) -> &[Tag];

    /// Prepares a build over `sources`, which are in load order.
    fn initialize(
        &mut self,
        sources: &[PluginName],
        ctx: &PatchContext<'_>,
    ) -> MergeResult<Activation>;

    /// Consumes one plugin's records. Called in load order.
    fn scan(&mut self, plugin: &Plugin, records: &[Record]);

    /// Writes merged records into the patch and reports every record that
    /// must be kept. Clears the working state.
    fn build(
        &mut self,
        patch: &mut dyn RecordStore,
        keep: &mut dyn FnMut(&RecordId),
    ) -> MergeReport;

    /// Drops all working state without building.
    fn reset(&mut self);
}

/// Fails unless every record type carries `field`.
pub(crate) fn check_capabilities(
    merger: &str,
    record_types: &[RecordType],
    field: FieldName,
) -> MergeResult<()> {
    match record_types.iter().find(|t| !supports(**t, field)) {
        Some(&record_type) => Err(MergeError::UnsupportedField {
            merger: merger.to_string(),
            record_type,
            field,
        }),
        None => Ok(()),
    }
}
