//! Order-preserving merge of actor spell and AI package lists.
//!
//! Each source plugin's list is compared against every master that defines
//! the record, newest master first. What the plugin dropped is recorded as
//! deleted. What it kept, added or moved is folded into a per-record
//! [`MergeAccumulator`] using anchor insertion: a new or moved entry goes
//! right after the nearest preceding entry that the accumulated list already
//! holds, or right before the nearest following one.

use crate::report::MergeReport;
use crate::strategy::{Activation, MergeStrategy, PatchContext, check_capabilities};
use crate::MergeResult;
use patchsmith_model::{FieldAccess, Plugin, Record, RecordStore};
use patchsmith_types::{PluginName, RecordId, RecordType, Tag};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::mem;
use tracing::{debug, info, warn};

/// Merged state of one record's ordered list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeAccumulator<E: Ord> {
    merged: Vec<E>,
    deleted: BTreeSet<E>,
    contributors: BTreeSet<PluginName>,
}

impl<E: Ord> Default for MergeAccumulator<E> {
    fn default() -> Self {
        Self {
            merged: Vec::new(),
            deleted: BTreeSet::new(),
            contributors: BTreeSet::new(),
        }
    }
}

impl<E: Clone + Ord> MergeAccumulator<E> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The merged list so far.
    #[must_use]
    pub fn merged(&self) -> &[E] {
        &self.merged
    }

    /// Entries removed by some plugin. Never shrinks.
    #[must_use]
    pub fn deleted(&self) -> &BTreeSet<E> {
        &self.deleted
    }

    /// Folds one plugin's list into the accumulator.
    ///
    /// `deleted_here` holds the entries a master declared and `source`
    /// dropped. With `force_add`, previously deleted entries are admitted
    /// again. Folding the same plugin a second time applies its deletions
    /// and admissions but does not reorder, so repeating a fold is a no-op.
    pub fn fold(&mut self, plugin: &PluginName, source: &[E], deleted_here: &[E], force_add: bool) {
        let refold = !self.contributors.insert(plugin.clone());
        let merged = &mut self.merged;
        let deleted = &mut self.deleted;

        for entry in deleted_here {
            merged.retain(|m| m != entry);
            deleted.insert(entry.clone());
        }

        let admissible = |entry: &E| force_add || !deleted.contains(entry);

        if merged.is_empty() {
            merged.extend(source.iter().filter(|e| admissible(*e)).cloned());
            return;
        }

        for (index, entry) in source.iter().enumerate() {
            match merged.iter().position(|m| m == entry) {
                None => {
                    if admissible(entry) {
                        insert_anchored(merged, source, index);
                    }
                }
                Some(pos) => {
                    let in_place =
                        index == pos || source.len() - index == merged.len() - pos;
                    if refold || in_place {
                        continue;
                    }
                    merged.remove(pos);
                    insert_anchored(merged, source, index);
                }
            }
        }
    }
}

/// Entries of `master` that `source` no longer declares.
#[must_use]
pub fn deleted_entries<E: PartialEq + Clone>(master: &[E], source: &[E]) -> Vec<E> {
    master
        .iter()
        .filter(|e| !source.contains(e))
        .cloned()
        .collect()
}

/// Inserts `source[index]` into `merged` next to its nearest neighbour in
/// `source` that `merged` already holds.
fn insert_anchored<E: PartialEq + Clone>(merged: &mut Vec<E>, source: &[E], index: usize) {
    let entry = source[index].clone();
    if index == 0 {
        merged.insert(0, entry);
        return;
    }
    if index == source.len() - 1 {
        merged.push(entry);
        return;
    }
    let position_of = |anchor: &E| merged.iter().position(|m| m == anchor);
    if let Some(slot) = source[..index].iter().rev().find_map(position_of) {
        merged.insert(slot + 1, entry);
    } else if let Some(slot) = source[index + 1..].iter().find_map(position_of) {
        merged.insert(slot, entry);
    } else {
        merged.push(entry);
    }
}

/// How a merged list is written and compared against the patch copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputOrder {
    /// Sorted by id; the game does not care about order.
    Sorted,
    /// As merged; order is evaluated at runtime.
    Merged,
}

/// Strategy (b): ordered id lists on actors.
pub struct OrderedListMerger {
    name: &'static str,
    label: &'static str,
    tags: [Tag; 2],
    record_types: Vec<RecordType>,
    access: FieldAccess<Vec<RecordId>>,
    output: OutputOrder,
    run: OrderedRun,
}

#[derive(Default)]
struct OrderedRun {
    active: bool,
    sources: BTreeSet<PluginName>,
    /// Direct masters of the sources; their lists are cached when scanned.
    needed_masters: BTreeSet<PluginName>,
    touched: BTreeSet<RecordId>,
    master_lists: HashMap<PluginName, BTreeMap<RecordId, Vec<RecordId>>>,
    accumulators: BTreeMap<RecordId, MergeAccumulator<RecordId>>,
    /// Last version of each touched record carrying the merged field.
    latest: BTreeMap<RecordId, Record>,
    schema_mismatches: usize,
    missing_masters: BTreeSet<PluginName>,
}

impl OrderedListMerger {
    pub fn new(
        name: &'static str,
        label: &'static str,
        source_tag: Tag,
        force_add_tag: Tag,
        access: FieldAccess<Vec<RecordId>>,
        output: OutputOrder,
    ) -> Self {
        Self {
            name,
            label,
            tags: [source_tag, force_add_tag],
            record_types: vec![RecordType::Creature, RecordType::Npc],
            access,
            output,
            run: OrderedRun::default(),
        }
    }

    /// Merges actor spell lists.
    #[must_use]
    pub fn spells() -> Self {
        Self::new(
            "Import Actors Spells",
            "Spell Lists Changed",
            Tag::ActorsSpells,
            Tag::ActorsSpellsForceAdd,
            FieldAccess::SPELLS,
            OutputOrder::Sorted,
        )
    }

    /// Merges actor AI package lists.
    #[must_use]
    pub fn ai_packages() -> Self {
        Self::new(
            "Import Actors AI Packages",
            "AI Package Lists Changed",
            Tag::ActorsAiPackages,
            Tag::ActorsAiPackagesForceAdd,
            FieldAccess::AI_PACKAGES,
            OutputOrder::Merged,
        )
    }

    fn force_add_tag(&self) -> Tag {
        self.tags[1]
    }

    fn fold_source(&mut self, plugin: &Plugin, lists: &BTreeMap<RecordId, Vec<RecordId>>) {
        let force_add = plugin.tags.contains(self.force_add_tag());
        let mut pending = lists.clone();
        let run = &mut self.run;
        let mut folds = 0usize;

        for master in plugin.masters.iter().rev() {
            let Some(master_lists) = run.master_lists.get(master) else {
                if run.missing_masters.insert(master.clone()) {
                    warn!(merger = self.name, plugin = %plugin.name, master = %master, "master not available");
                }
                continue;
            };
            for (id, master_list) in master_lists {
                let Some(source_list) = pending.get(id) else {
                    continue;
                };
                if master_list == source_list && !force_add {
                    // Older masters add nothing once an override matches.
                    pending.remove(id);
                    continue;
                }
                if run
                    .accumulators
                    .get(id)
                    .is_some_and(|acc| acc.merged() == source_list.as_slice())
                {
                    continue;
                }
                let deleted_here = deleted_entries(master_list, source_list);
                run.accumulators.entry(id.clone()).or_default().fold(
                    &plugin.name,
                    source_list,
                    &deleted_here,
                    force_add,
                );
                folds += 1;
            }
        }
        debug!(merger = self.name, plugin = %plugin.name, folds, "source folded");
    }

    fn normalized(&self, list: &[RecordId]) -> Vec<RecordId> {
        let mut out = list.to_vec();
        if self.output == OutputOrder::Sorted {
            out.sort();
        }
        out
    }
}

impl MergeStrategy for OrderedListMerger {
    fn name(&self) -> &str {
        self.name
    }

    fn source_tags(&self) -> &[Tag] {
        &self.tags[..1]
    }

    fn initialize(
        &mut self,
        sources: &[PluginName],
        ctx: &PatchContext<'_>,
    ) -> MergeResult<Activation> {
        check_capabilities(self.name, &self.record_types, self.access.field())?;
        self.reset();

        let run = &mut self.run;
        for source in sources {
            let Some(plugin) = ctx.load_order.get(source) else {
                continue;
            };
            run.sources.insert(plugin.name.clone());
            run.needed_masters.extend(plugin.masters.iter().cloned());
            for record in ctx.records_of(source) {
                if self.record_types.contains(&record.record_type) {
                    run.touched.insert(record.id.clone());
                }
            }
        }

        if run.touched.is_empty() {
            return Ok(Activation::inactive("sources define no actors"));
        }
        run.active = true;
        debug!(
            merger = self.name,
            tag = %self.tags[0],
            sources = run.sources.len(),
            records = run.touched.len(),
            "ordered merger initialized"
        );
        Ok(Activation::Active)
    }

    fn scan(&mut self, plugin: &Plugin, records: &[Record]) {
        if !self.run.active {
            return;
        }
        let name = &plugin.name;
        let mut lists = BTreeMap::new();
        let mut mismatches = 0;
        for record in records {
            if !self.record_types.contains(&record.record_type)
                || !self.run.touched.contains(&record.id)
            {
                continue;
            }
            match self.access.read(record) {
                Some(list) => {
                    lists.insert(record.id.clone(), list.clone());
                    self.run.latest.insert(record.id.clone(), record.clone());
                }
                None => {
                    warn!(merger = self.name, plugin = %name, record = %record.id, "record lacks merged field, skipped");
                    mismatches += 1;
                }
            }
        }
        self.run.schema_mismatches += mismatches;

        if self.run.sources.contains(name) {
            self.fold_source(plugin, &lists);
        }
        if self.run.needed_masters.contains(name) {
            self.run.master_lists.insert(name.clone(), lists);
        }
    }

    fn build(
        &mut self,
        patch: &mut dyn RecordStore,
        keep: &mut dyn FnMut(&RecordId),
    ) -> MergeReport {
        let mut report = MergeReport::new(self.name);
        let mut run = mem::take(&mut self.run);

        for (id, acc) in &run.accumulators {
            let base = patch.get(id).or_else(|| run.latest.get(id));
            let Some(mut record) = base.cloned() else {
                continue;
            };
            let merged = self.normalized(acc.merged());
            let Some(current) = self.access.write(&mut record) else {
                warn!(merger = self.name, record = %id, "patch record lacks merged field, skipped");
                run.schema_mismatches += 1;
                continue;
            };
            if self.normalized(current) == merged {
                continue;
            }
            *current = merged;
            patch.set(record);
            keep(id);
            report.count_change(&id.plugin);
        }

        report.push_counts(self.label);
        report.schema_mismatches = run.schema_mismatches;
        report.missing_masters = run.missing_masters;
        info!(merger = self.name, changed = report.changed, "build complete");
        report
    }

    fn reset(&mut self) {
        self.run = OrderedRun::default();
    }
}
