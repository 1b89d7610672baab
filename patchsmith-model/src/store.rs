//! Record collaborators: where parsed plugin records come from, and where
//! the patch keeps its own copies.

use crate::record::Record;
use patchsmith_types::{PluginName, RecordId, RecordType};
use std::collections::{BTreeMap, BTreeSet};

/// Supplies the parsed records of each plugin.
///
/// Implemented by whatever loads plugin files; the engine only reads.
pub trait RecordSource {
    /// Returns the active records of a plugin, or `None` if the plugin's data
    /// is unavailable.
    fn records(&self, plugin: &PluginName) -> Option<&[Record]>;
}

impl RecordSource for BTreeMap<PluginName, Vec<Record>> {
    fn records(&self, plugin: &PluginName) -> Option<&[Record]> {
        self.get(plugin).map(Vec::as_slice)
    }
}

/// The patch's record set.
///
/// Every merger may mutate it during its own build pass; the engine never
/// lets two mergers build at once.
pub trait RecordStore {
    /// Returns the patch copy of a record.
    fn get(&self, id: &RecordId) -> Option<&Record>;

    /// Returns the patch copy of a record mutably.
    fn get_mut(&mut self, id: &RecordId) -> Option<&mut Record>;

    /// Inserts or replaces the patch copy of a record.
    fn set(&mut self, record: Record);

    /// Returns the ids of all patch records of one type, in id order.
    fn ids_of_type(&self, record_type: RecordType) -> Vec<RecordId>;

    /// Returns true if the patch holds a copy of the record.
    fn contains(&self, id: &RecordId) -> bool {
        self.get(id).is_some()
    }
}

/// In-memory patch: record copies plus the set of records kept for output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatchFile {
    records: BTreeMap<RecordId, Record>,
    kept: BTreeSet<RecordId>,
}

impl PatchFile {
    /// Creates an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a record for inclusion in the patch output.
    pub fn keep(&mut self, id: RecordId) {
        self.kept.insert(id);
    }

    /// Returns true if the record is marked for output.
    #[must_use]
    pub fn is_kept(&self, id: &RecordId) -> bool {
        self.kept.contains(id)
    }

    /// Returns the ids marked for output.
    #[must_use]
    pub fn kept(&self) -> &BTreeSet<RecordId> {
        &self.kept
    }

    /// Iterates the records that will be written, in id order.
    pub fn kept_records(&self) -> impl Iterator<Item = &Record> {
        self.kept.iter().filter_map(|id| self.records.get(id))
    }

    /// Returns the number of record copies held (kept or not).
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the patch holds no record copies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordStore for PatchFile {
    fn get(&self, id: &RecordId) -> Option<&Record> {
        self.records.get(id)
    }

    fn get_mut(&mut self, id: &RecordId) -> Option<&mut Record> {
        self.records.get_mut(id)
    }

    fn set(&mut self, record: Record) {
        self.records.insert(record.id.clone(), record);
    }

    fn ids_of_type(&self, record_type: RecordType) -> Vec<RecordId> {
        self.records
            .values()
            .filter(|r| r.record_type == record_type)
            .map(|r| r.id.clone())
            .collect()
    }
}
