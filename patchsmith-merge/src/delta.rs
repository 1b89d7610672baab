//! Tag-gated set deltas for keyed list fields (inventories, outfits,
//! faction relations).
//!
//! Every source plugin's list is compared against the list its masters
//! declare (the last declared master defining the record wins). What it
//! added, changed or removed is kept as a [`Delta`] if the plugin carries
//! the matching tag, and the deltas of all sources are replayed in load
//! order on top of the patch's copy of the record.

use crate::report::MergeReport;
use crate::strategy::{Activation, MergeStrategy, PatchContext, check_capabilities};
use crate::MergeResult;
use patchsmith_model::{
    Entry, FactionRelation, FieldAccess, InventoryEntry, Plugin, Record, RecordStore,
};
use patchsmith_types::{PluginName, RecordId, RecordType, Tag, TagSet};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::mem;
use tracing::{debug, info, warn};

/// The add/change/remove tags of one delta merger. A merger without e.g. a
/// change operation leaves that slot empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeltaTags {
    pub add: Option<Tag>,
    pub change: Option<Tag>,
    pub remove: Option<Tag>,
}

impl DeltaTags {
    /// What a plugin with `tags` may contribute.
    #[must_use]
    pub fn permissions(&self, tags: &TagSet) -> Permissions {
        Permissions {
            add: tags.has(self.add),
            change: tags.has(self.change),
            remove: tags.has(self.remove),
        }
    }

    fn all(&self) -> Vec<Tag> {
        [self.add, self.change, self.remove]
            .into_iter()
            .flatten()
            .collect()
    }
}

/// Operations a plugin is allowed to contribute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Permissions {
    pub add: bool,
    pub change: bool,
    pub remove: bool,
}

impl Permissions {
    pub const ALL: Self = Self {
        add: true,
        change: true,
        remove: true,
    };
}

/// One plugin's contribution to one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delta<E: Entry> {
    pub remove_keys: BTreeSet<E::Key>,
    pub add_entries: Vec<E>,
    pub change_entries: Vec<E>,
}

impl<E: Entry> Default for Delta<E> {
    fn default() -> Self {
        Self {
            remove_keys: BTreeSet::new(),
            add_entries: Vec::new(),
            change_entries: Vec::new(),
        }
    }
}

impl<E: Entry> Delta<E> {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.remove_keys.is_empty() && self.add_entries.is_empty() && self.change_entries.is_empty()
    }
}

/// Compares a plugin's entries against the baseline inherited from its
/// masters.
///
/// Added keys are always computed so that new entries are never mistaken
/// for changed ones, even when the plugin may not add.
#[must_use]
pub fn compute_delta<E: Entry>(master: &[E], modded: &[E], perms: Permissions) -> Delta<E> {
    let master_keys: BTreeSet<E::Key> = master.iter().map(Entry::key).collect();
    let mod_keys: BTreeSet<E::Key> = modded.iter().map(Entry::key).collect();

    let remove_keys = if perms.remove {
        master_keys.difference(&mod_keys).cloned().collect()
    } else {
        BTreeSet::new()
    };

    let add_keys: BTreeSet<E::Key> = mod_keys.difference(&master_keys).cloned().collect();
    let added: Vec<E> = modded
        .iter()
        .filter(|e| add_keys.contains(&e.key()))
        .cloned()
        .collect();

    let change_entries = if perms.change {
        let master_values: HashSet<&E> = master.iter().collect();
        modded
            .iter()
            .filter(|e| !master_values.contains(e) && !add_keys.contains(&e.key()))
            .cloned()
            .collect()
    } else {
        Vec::new()
    };

    Delta {
        remove_keys,
        add_entries: if perms.add { added } else { Vec::new() },
        change_entries,
    }
}

/// Applies one delta in place: removals, then changes, then additions.
///
/// A changed entry replaces every entry value-equal to the one it matched
/// and moves to the end of the list.
pub fn apply_delta<E: Entry>(entries: &mut Vec<E>, delta: &Delta<E>) {
    if !delta.remove_keys.is_empty() {
        entries.retain(|e| !delta.remove_keys.contains(&e.key()));
    }

    if !delta.change_entries.is_empty() {
        let mut replaced: HashSet<E> = HashSet::new();
        let mut appended = Vec::new();
        for change in &delta.change_entries {
            let key = change.key();
            if let Some(current) = entries.iter().find(|e| e.key() == key) {
                replaced.insert(current.clone());
                appended.push(change.clone());
            }
        }
        if !replaced.is_empty() {
            entries.retain(|e| !replaced.contains(e));
            entries.extend(appended);
        }
    }

    if !delta.add_entries.is_empty() {
        let mut present: BTreeSet<E::Key> = entries.iter().map(Entry::key).collect();
        for entry in &delta.add_entries {
            if present.insert(entry.key()) {
                entries.push(entry.clone());
            }
        }
    }
}

/// Folds a sequence of deltas, left to right, over `base`.
#[must_use]
pub fn apply_deltas<'a, E, I>(base: &[E], deltas: I) -> Vec<E>
where
    E: Entry + 'a,
    I: IntoIterator<Item = &'a Delta<E>>,
{
    let mut entries = base.to_vec();
    for delta in deltas {
        apply_delta(&mut entries, delta);
    }
    entries
}

/// Order-insensitive view used to decide whether a record changed.
fn sorted_by_key<E: Entry>(entries: &[E]) -> Vec<E> {
    let mut sorted = entries.to_vec();
    sorted.sort_by_key(Entry::key);
    sorted
}

/// Strategy (a): replays tag-gated deltas over keyed list fields.
pub struct DeltaMerger<E: Entry> {
    name: &'static str,
    label: &'static str,
    tags: DeltaTags,
    source_tags: Vec<Tag>,
    record_types: Vec<RecordType>,
    access: FieldAccess<Vec<E>>,
    run: DeltaRun<E>,
}

/// Working state of one build.
struct DeltaRun<E: Entry> {
    active: bool,
    sources: BTreeSet<PluginName>,
    masters: BTreeSet<PluginName>,
    touched: BTreeSet<RecordId>,
    present_types: BTreeSet<RecordType>,
    /// Each scanned source or master's own entries, per record.
    plugin_entries: HashMap<PluginName, BTreeMap<RecordId, Vec<E>>>,
    deltas: BTreeMap<RecordId, Vec<(PluginName, Delta<E>)>>,
    first_versions: BTreeMap<RecordId, Record>,
    schema_mismatches: usize,
    missing_masters: BTreeSet<PluginName>,
}

impl<E: Entry> Default for DeltaRun<E> {
    fn default() -> Self {
        Self {
            active: false,
            sources: BTreeSet::new(),
            masters: BTreeSet::new(),
            touched: BTreeSet::new(),
            present_types: BTreeSet::new(),
            plugin_entries: HashMap::new(),
            deltas: BTreeMap::new(),
            first_versions: BTreeMap::new(),
            schema_mismatches: 0,
            missing_masters: BTreeSet::new(),
        }
    }
}

impl<E: Entry> DeltaMerger<E> {
    pub fn new(
        name: &'static str,
        label: &'static str,
        tags: DeltaTags,
        record_types: Vec<RecordType>,
        access: FieldAccess<Vec<E>>,
    ) -> Self {
        Self {
            name,
            label,
            source_tags: tags.all(),
            tags,
            record_types,
            access,
            run: DeltaRun::default(),
        }
    }

    /// Replaces the record types this merger handles.
    #[must_use]
    pub fn with_record_types(mut self, record_types: Vec<RecordType>) -> Self {
        self.record_types = record_types;
        self
    }

    fn is_relevant(&self, record: &Record) -> bool {
        self.run.present_types.contains(&record.record_type) && self.run.touched.contains(&record.id)
    }
}

impl DeltaMerger<InventoryEntry> {
    /// Merges container, creature and NPC inventories.
    #[must_use]
    pub fn inventory() -> Self {
        Self::new(
            "Import Inventory",
            "Inventories Changed",
            DeltaTags {
                add: Some(Tag::InventAdd),
                change: Some(Tag::InventChange),
                remove: Some(Tag::InventRemove),
            },
            vec![RecordType::Container, RecordType::Creature, RecordType::Npc],
            FieldAccess::ITEMS,
        )
    }
}

impl DeltaMerger<RecordId> {
    /// Merges outfit membership.
    #[must_use]
    pub fn outfits() -> Self {
        Self::new(
            "Import Outfits",
            "Outfits Changed",
            DeltaTags {
                add: Some(Tag::OutfitsAdd),
                change: None,
                remove: Some(Tag::OutfitsRemove),
            },
            vec![RecordType::Outfit],
            FieldAccess::OUTFIT_ITEMS,
        )
    }
}

impl DeltaMerger<FactionRelation> {
    /// Merges faction relations.
    #[must_use]
    pub fn relations() -> Self {
        Self::new(
            "Import Relations",
            "Modified Factions",
            DeltaTags {
                add: Some(Tag::RelationsAdd),
                change: Some(Tag::RelationsChange),
                remove: Some(Tag::RelationsRemove),
            },
            vec![RecordType::Faction],
            FieldAccess::RELATIONS,
        )
    }
}

impl<E: Entry> MergeStrategy for DeltaMerger<E> {
    fn name(&self) -> &str {
        self.name
    }

    fn source_tags(&self) -> &[Tag] {
        &self.source_tags
    }

    fn initialize(
        &mut self,
        sources: &[PluginName],
        ctx: &PatchContext<'_>,
    ) -> MergeResult<Activation> {
        check_capabilities(self.name, &self.record_types, self.access.field())?;
        self.reset();

        let run = &mut self.run;
        for source in sources.iter().filter(|s| ctx.load_order.contains(s)) {
            run.sources.insert(source.clone());
            run.masters.extend(ctx.load_order.recursive_masters(source));
            for record in ctx.records_of(source) {
                if self.record_types.contains(&record.record_type) {
                    run.touched.insert(record.id.clone());
                    run.present_types.insert(record.record_type);
                }
            }
        }

        if run.sources.is_empty() {
            return Ok(Activation::inactive("no source plugins"));
        }
        if run.present_types.is_empty() {
            return Ok(Activation::inactive("sources define no targeted records"));
        }
        run.active = true;
        debug!(
            merger = self.name,
            sources = run.sources.len(),
            records = run.touched.len(),
            "delta merger initialized"
        );
        Ok(Activation::Active)
    }

    fn scan(&mut self, plugin: &Plugin, records: &[Record]) {
        if !self.run.active {
            return;
        }
        let name = &plugin.name;
        let is_source = self.run.sources.contains(name);

        if is_source || self.run.masters.contains(name) {
            let mut entries = BTreeMap::new();
            let mut mismatches = 0;
            for record in records.iter().filter(|r| self.is_relevant(r)) {
                match self.access.read(record) {
                    Some(list) => {
                        entries.insert(record.id.clone(), list.clone());
                    }
                    None => {
                        warn!(merger = self.name, plugin = %name, record = %record.id, "record lacks merged field, skipped");
                        mismatches += 1;
                    }
                }
            }
            self.run.schema_mismatches += mismatches;
            self.run.plugin_entries.insert(name.clone(), entries);
        }

        if is_source {
            let perms = self.tags.permissions(&plugin.tags);
            let run = &mut self.run;

            // A later declared master's list replaces an earlier one's.
            let mut baseline: HashMap<&RecordId, &Vec<E>> = HashMap::new();
            for master in &plugin.masters {
                match run.plugin_entries.get(master) {
                    Some(master_entries) => baseline.extend(master_entries),
                    None => {
                        warn!(merger = self.name, plugin = %name, master = %master, "master not available");
                        run.missing_masters.insert(master.clone());
                    }
                }
            }

            let own = run.plugin_entries.get(name);
            let mut found = 0usize;
            for (id, entries) in own.into_iter().flatten() {
                let Some(master_entries) = baseline.get(id) else {
                    continue;
                };
                let delta = compute_delta(master_entries, entries, perms);
                if !delta.is_empty() {
                    run.deltas
                        .entry(id.clone())
                        .or_default()
                        .push((name.clone(), delta));
                    found += 1;
                }
            }
            debug!(merger = self.name, plugin = %name, deltas = found, "source scanned");
        }

        for record in records {
            if self.is_relevant(record) && !self.run.first_versions.contains_key(&record.id) {
                self.run
                    .first_versions
                    .insert(record.id.clone(), record.clone());
            }
        }
    }

    fn build(
        &mut self,
        patch: &mut dyn RecordStore,
        keep: &mut dyn FnMut(&RecordId),
    ) -> MergeReport {
        let mut report = MergeReport::new(self.name);
        let mut run = mem::take(&mut self.run);

        for (id, record) in mem::take(&mut run.first_versions) {
            if !patch.contains(&id) {
                patch.set(record);
            }
        }

        for (id, deltas) in &run.deltas {
            let Some(record) = patch.get_mut(id) else {
                continue;
            };
            let Some(entries) = self.access.write(record) else {
                warn!(merger = self.name, record = %id, "patch record lacks merged field, skipped");
                run.schema_mismatches += 1;
                continue;
            };
            let before = sorted_by_key(entries);
            for (_, delta) in deltas {
                apply_delta(entries, delta);
            }
            if sorted_by_key(entries) != before {
                keep(id);
                report.count_change(&id.plugin);
            }
        }

        report.push_counts(self.label);
        report.schema_mismatches = run.schema_mismatches;
        report.missing_masters = run.missing_masters;
        info!(merger = self.name, changed = report.changed, "build complete");
        report
    }

    fn reset(&mut self) {
        self.run = DeltaRun::default();
    }
}
