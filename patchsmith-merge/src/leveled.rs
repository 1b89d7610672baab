//! Leveled list and FormID list merging with relevel/delevel semantics.
//!
//! Every plugin that touches a list contributes to one [`StoredList`] per
//! list. The defining plugin seeds it; later plugins are folded in with
//! [`StoredList::merge_with`], which unions their entries unless a delevel
//! or relevel tag says their removals count. After all plugins are scanned,
//! lists that ended up with no items can be pruned out of every list that
//! references them.

use crate::compat::{is_unofficial_patch, overhaul_skips};
use crate::report::MergeReport;
use crate::strategy::{Activation, MergeStrategy, PatchContext, check_capabilities};
use crate::MergeResult;
use patchsmith_model::{
    Entry, FieldAccess, FieldValue, LeveledEntry, LeveledList, Plugin, Record, RecordStore,
};
use patchsmith_types::{PluginName, RecordId, RecordType, Tag, TagSet};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::mem;
use tracing::{debug, info, warn};

/// A list body the merger can fold: leveled lists and FormID lists.
pub trait MergeableList: Clone + fmt::Debug {
    type Item: Entry<Key = RecordId>;

    fn entries(&self) -> &[Self::Item];

    fn entries_mut(&mut self) -> &mut Vec<Self::Item>;

    /// Takes over list-level settings of a later version.
    fn merge_settings(&mut self, other: &Self, relevel: bool);

    /// Restores canonical order after entries were appended.
    fn normalize(&mut self);

    /// True if both would be written identically.
    fn same_as(&self, other: &Self) -> bool;

    /// Keys of all entries.
    fn keys(&self) -> BTreeSet<RecordId> {
        self.entries().iter().map(Entry::key).collect()
    }
}

impl MergeableList for LeveledList {
    type Item = LeveledEntry;

    fn entries(&self) -> &[Self::Item] {
        &self.entries
    }

    fn entries_mut(&mut self) -> &mut Vec<Self::Item> {
        &mut self.entries
    }

    fn merge_settings(&mut self, other: &Self, relevel: bool) {
        if relevel {
            self.chance_none = other.chance_none;
            self.flags = other.flags;
            self.global = other.global.clone();
        } else {
            if other.chance_none != 0 {
                self.chance_none = other.chance_none;
            }
            self.flags |= other.flags;
            if other.global.is_some() {
                self.global = other.global.clone();
            }
        }
    }

    fn normalize(&mut self) {
        self.entries.sort();
    }

    fn same_as(&self, other: &Self) -> bool {
        if self.chance_none != other.chance_none
            || self.flags != other.flags
            || self.global != other.global
            || self.entries.len() != other.entries.len()
        {
            return false;
        }
        let mut mine = self.entries.clone();
        let mut theirs = other.entries.clone();
        mine.sort();
        theirs.sort();
        mine == theirs
    }
}

impl MergeableList for Vec<RecordId> {
    type Item = RecordId;

    fn entries(&self) -> &[RecordId] {
        self
    }

    fn entries_mut(&mut self) -> &mut Vec<RecordId> {
        self
    }

    fn merge_settings(&mut self, _other: &Self, _relevel: bool) {}

    fn normalize(&mut self) {}

    fn same_as(&self, other: &Self) -> bool {
        self == other
    }
}

/// One plugin's version of a list, prepared for folding.
#[derive(Debug, Clone)]
pub struct Contribution<L> {
    pub list: L,
    /// Keys of the plugin's entries, plus its delevs.
    pub items: BTreeSet<RecordId>,
    /// Keys whose accumulated entries the plugin replaces.
    pub relevs: BTreeSet<RecordId>,
    /// Keys the plugin removed relative to its masters.
    pub delevs: BTreeSet<RecordId>,
}

impl<L: MergeableList> Contribution<L> {
    /// A contribution without relevel or delevel.
    #[must_use]
    pub fn plain(list: L) -> Self {
        Self {
            items: list.keys(),
            list,
            relevs: BTreeSet::new(),
            delevs: BTreeSet::new(),
        }
    }
}

/// The accumulated state of one list.
#[derive(Debug, Clone)]
pub struct StoredList<L> {
    /// The record the list is written back into.
    pub record: Record,
    pub list: L,
    /// Keys the list holds or blocks.
    pub items: BTreeSet<RecordId>,
    /// Plugins whose versions the current state was merged from.
    pub merge_sources: Vec<PluginName>,
    /// The merged list differs from the last version and must be written.
    pub merge_over_last: bool,
}

impl<L: MergeableList> StoredList<L> {
    /// Seeds a list from the plugin that defines it.
    #[must_use]
    pub fn defined(record: Record, list: L) -> Self {
        Self {
            items: list.keys(),
            record,
            list,
            merge_sources: Vec::new(),
            merge_over_last: false,
        }
    }

    /// Seeds a list from the first non-defining plugin that touches it.
    #[must_use]
    pub fn first_override(record: Record, contribution: Contribution<L>, source: &PluginName) -> Self {
        Self {
            record,
            list: contribution.list,
            items: contribution.items,
            merge_sources: vec![source.clone()],
            merge_over_last: false,
        }
    }

    /// Folds a later plugin's version into this list.
    ///
    /// Relevelled and delevelled keys are stripped first, then every entry of
    /// `other` whose key the list does not hold or block is appended.
    pub fn merge_with(&mut self, other: &Contribution<L>, source: &PluginName) {
        self.list.merge_settings(&other.list, !other.relevs.is_empty());

        if !other.delevs.is_empty() || !other.relevs.is_empty() {
            let remove: BTreeSet<RecordId> = self
                .items
                .iter()
                .filter(|k| other.delevs.contains(*k) || other.relevs.contains(*k))
                .cloned()
                .collect();
            self.list
                .entries_mut()
                .retain(|e| !remove.contains(&e.key()));
            self.items.extend(other.delevs.iter().cloned());
            self.items.retain(|k| !remove.contains(k));
        }

        let mut added = BTreeSet::new();
        for entry in other.list.entries() {
            let key = entry.key();
            if !self.items.contains(&key) {
                self.list.entries_mut().push(entry.clone());
                added.insert(key);
            }
        }
        if !added.is_empty() {
            self.items.extend(added);
            self.list.normalize();
        }

        self.merge_over_last = !self.list.same_as(&other.list);
        if self.merge_over_last {
            self.merge_sources.push(source.clone());
        } else {
            self.merge_sources = vec![source.clone()];
        }
    }

    fn editor_id(&self) -> &str {
        &self.record.editor_id
    }
}

/// Lists touched by the pruning pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneOutcome {
    /// Empty lists whose references were removed somewhere.
    pub removed: BTreeSet<RecordId>,
    /// Lists whose entries actually changed.
    pub cleaned: BTreeSet<RecordId>,
    /// Lists whose item set was edited, changed entries or not.
    pub rewritten: BTreeSet<RecordId>,
}

/// Removes references to lists with no items, repeating for lists that
/// become empty in turn.
///
/// Each list is queued at most once: it is queued when its last item is
/// removed, and removing an item that is already gone does nothing.
pub fn prune_empty_sublists<L: MergeableList>(
    lists: &mut BTreeMap<RecordId, StoredList<L>>,
) -> PruneOutcome {
    let mut sub_supers: BTreeMap<RecordId, Vec<RecordId>> =
        lists.keys().map(|id| (id.clone(), Vec::new())).collect();
    let mut queue = Vec::new();
    for (id, stored) in lists.iter() {
        if stored.items.is_empty() {
            queue.push(id.clone());
            continue;
        }
        for item in &stored.items {
            if let Some(supers) = sub_supers.get_mut(item) {
                supers.push(id.clone());
            }
        }
    }

    let mut outcome = PruneOutcome::default();
    while let Some(empty) = queue.pop() {
        let Some(supers) = sub_supers.get(&empty) else {
            continue;
        };
        for super_id in supers {
            let Some(stored) = lists.get_mut(super_id) else {
                continue;
            };
            if !stored.items.remove(&empty) {
                continue;
            }
            let before = stored.list.entries().len();
            stored.list.entries_mut().retain(|e| e.key() != empty);
            outcome.removed.insert(empty.clone());
            outcome.rewritten.insert(super_id.clone());
            if stored.list.entries().len() != before {
                outcome.cleaned.insert(super_id.clone());
            }
            if stored.items.is_empty() {
                queue.push(super_id.clone());
            }
        }
    }
    outcome
}

/// Report label for a list record type.
#[must_use]
pub fn list_label(record_type: RecordType) -> &'static str {
    match record_type {
        RecordType::LeveledCreature => "Creature",
        RecordType::LeveledActor => "Actor",
        RecordType::LeveledItem => "Item",
        RecordType::LeveledSpell => "Spell",
        RecordType::FormIdList => "FormID",
        _ => "Other",
    }
}

/// Strategy (c): leveled lists and FormID lists.
pub struct LeveledListMerger<L: MergeableList> {
    name: &'static str,
    header: &'static str,
    de_tag: Tag,
    re_tag: Option<Tag>,
    source_tags: Vec<Tag>,
    record_types: Vec<RecordType>,
    access: FieldAccess<L>,
    overhaul_compat: bool,
    run: LeveledRun<L>,
}

struct LeveledRun<L> {
    active: bool,
    levelers: Vec<PluginName>,
    tags: HashMap<PluginName, TagSet>,
    /// Direct masters of the levelers; their item sets are recorded.
    de_masters: BTreeSet<PluginName>,
    master_items: HashMap<RecordId, HashMap<PluginName, BTreeSet<RecordId>>>,
    stored: BTreeMap<RecordType, BTreeMap<RecordId, StoredList<L>>>,
    skips: BTreeSet<RecordId>,
    remove_empty_sublists: bool,
    max_size: Option<usize>,
    schema_mismatches: usize,
}

impl<L> Default for LeveledRun<L> {
    fn default() -> Self {
        Self {
            active: false,
            levelers: Vec::new(),
            tags: HashMap::new(),
            de_masters: BTreeSet::new(),
            master_items: HashMap::new(),
            stored: BTreeMap::new(),
            skips: BTreeSet::new(),
            remove_empty_sublists: true,
            max_size: None,
            schema_mismatches: 0,
        }
    }
}

impl<L: MergeableList> LeveledListMerger<L> {
    pub fn new(
        name: &'static str,
        header: &'static str,
        de_tag: Tag,
        re_tag: Option<Tag>,
        record_types: Vec<RecordType>,
        access: FieldAccess<L>,
    ) -> Self {
        Self {
            name,
            header,
            de_tag,
            re_tag,
            source_tags: std::iter::once(de_tag).chain(re_tag).collect(),
            record_types,
            access,
            overhaul_compat: false,
            run: LeveledRun::default(),
        }
    }

    /// `name [DR]`, listing the first letters of the applied list tags.
    fn annotate(&self, plugin: &PluginName) -> String {
        let mut initials: Vec<char> = self
            .run
            .tags
            .get(plugin)
            .into_iter()
            .flat_map(TagSet::iter)
            .filter(|t| self.source_tags.contains(t))
            .map(Tag::initial)
            .collect();
        initials.sort_unstable();
        if initials.is_empty() {
            plugin.to_string()
        } else {
            format!("{plugin} [{}]", initials.into_iter().collect::<String>())
        }
    }

    fn contribution(&self, plugin: &Plugin, list: &L, id: &RecordId) -> Contribution<L> {
        let mut items = list.keys();
        let relevs = if plugin.tags.has(self.re_tag) {
            items.clone()
        } else {
            BTreeSet::new()
        };
        let mut delevs = BTreeSet::new();
        if plugin.tags.contains(self.de_tag) {
            if let Some(per_master) = self.run.master_items.get(id) {
                for master in &plugin.masters {
                    if let Some(master_items) = per_master.get(master) {
                        delevs.extend(master_items.iter().cloned());
                    }
                }
                delevs.retain(|k| !items.contains(k));
                items.extend(delevs.iter().cloned());
            }
        }
        Contribution {
            list: list.clone(),
            items,
            relevs,
            delevs,
        }
    }

    fn write_record(&self, stored: &StoredList<L>) -> Record
    where
        L: IntoFieldValue,
    {
        let mut record = stored.record.clone();
        record.set_field(self.access.field(), stored.list.clone().into_field_value());
        record
    }
}

/// Converts a list body back into a record field.
pub trait IntoFieldValue {
    fn into_field_value(self) -> FieldValue;
}

impl IntoFieldValue for LeveledList {
    fn into_field_value(self) -> FieldValue {
        FieldValue::Leveled(self)
    }
}

impl IntoFieldValue for Vec<RecordId> {
    fn into_field_value(self) -> FieldValue {
        FieldValue::FormIds(self)
    }
}

impl LeveledListMerger<LeveledList> {
    /// Merges creature, item, actor and spell leveled lists.
    #[must_use]
    pub fn leveled_lists() -> Self {
        let mut merger = Self::new(
            "Leveled Lists",
            "Delevelers/Relevelers",
            Tag::Delev,
            Some(Tag::Relev),
            vec![
                RecordType::LeveledCreature,
                RecordType::LeveledActor,
                RecordType::LeveledItem,
                RecordType::LeveledSpell,
            ],
            FieldAccess::ENTRIES,
        );
        merger.overhaul_compat = true;
        merger
    }
}

impl LeveledListMerger<Vec<RecordId>> {
    /// Merges FormID lists.
    #[must_use]
    pub fn form_id_lists() -> Self {
        Self::new(
            "FormID Lists",
            "Deflsters",
            Tag::Deflst,
            None,
            vec![RecordType::FormIdList],
            FieldAccess::FORM_IDS,
        )
    }
}

impl<L: MergeableList + IntoFieldValue> MergeStrategy for LeveledListMerger<L> {
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

        if ctx.load_order.is_empty() {
            return Ok(Activation::inactive("no plugins loaded"));
        }
        let run = &mut self.run;
        for plugin in ctx.load_order.iter() {
            run.tags.insert(plugin.name.clone(), plugin.tags.clone());
        }
        for source in sources {
            let Some(plugin) = ctx.load_order.get(source) else {
                continue;
            };
            run.levelers.push(plugin.name.clone());
            run.de_masters.extend(plugin.masters.iter().cloned());
        }
        if self.overhaul_compat {
            run.skips = overhaul_skips(ctx.load_order, &ctx.config.game_master);
        }
        run.remove_empty_sublists = ctx.config.remove_empty_sublists;
        run.max_size = ctx.config.max_leveled_list_size;
        run.active = true;
        debug!(
            merger = self.name,
            levelers = run.levelers.len(),
            compat_skips = run.skips.len(),
            "list merger initialized"
        );
        Ok(Activation::Active)
    }

    fn scan(&mut self, plugin: &Plugin, records: &[Record]) {
        if !self.run.active {
            return;
        }
        let name = &plugin.name;
        let relevant = records
            .iter()
            .filter(|r| self.record_types.contains(&r.record_type));

        let mut lists: Vec<(&Record, &L)> = Vec::new();
        for record in relevant {
            match self.access.read(record) {
                Some(list) => lists.push((record, list)),
                None => {
                    warn!(merger = self.name, plugin = %name, record = %record.id, "record lacks merged field, skipped");
                    self.run.schema_mismatches += 1;
                }
            }
        }

        if self.run.de_masters.contains(name) {
            for (record, list) in &lists {
                self.run
                    .master_items
                    .entry(record.id.clone())
                    .or_default()
                    .insert(name.clone(), list.keys());
            }
        }

        let skipping = is_unofficial_patch(name) && !self.run.skips.is_empty();
        for (record, list) in lists {
            let id = &record.id;
            let stored = self.run.stored.entry(record.record_type).or_default();

            if skipping && self.run.skips.contains(id) {
                if let Some(existing) = stored.get_mut(id) {
                    existing.merge_over_last = true;
                }
                continue;
            }

            if id.is_defined_by(name) {
                stored.insert(id.clone(), StoredList::defined(record.clone(), list.clone()));
                continue;
            }

            let contribution = self.contribution(plugin, list, id);
            let stored = self.run.stored.entry(record.record_type).or_default();
            match stored.get_mut(id) {
                Some(existing) => existing.merge_with(&contribution, name),
                None => {
                    stored.insert(
                        id.clone(),
                        StoredList::first_override(record.clone(), contribution, name),
                    );
                }
            }
        }
    }

    fn build(
        &mut self,
        patch: &mut dyn RecordStore,
        keep: &mut dyn FnMut(&RecordId),
    ) -> MergeReport {
        let mut report = MergeReport::new(self.name);

        let levelers: Vec<String> = self
            .run
            .levelers
            .iter()
            .map(|l| format!("* {}", self.annotate(l)))
            .collect();
        report.section(self.header).lines = levelers;

        for &record_type in &self.record_types {
            let label = list_label(record_type);
            let mut lines = Vec::new();
            if let Some(lists) = self.run.stored.get(&record_type) {
                let mut merged: Vec<&StoredList<L>> =
                    lists.values().filter(|s| s.merge_over_last).collect();
                merged.sort_by(|a, b| a.editor_id().cmp(b.editor_id()));
                for stored in merged {
                    let id = &stored.record.id;
                    patch.set(self.write_record(stored));
                    keep(id);
                    report.count_change(&id.plugin);
                    lines.push(format!("* {}", stored.editor_id()));
                    for source in &stored.merge_sources {
                        lines.push(format!("  * {}", self.annotate(source)));
                    }
                    if let Some(max) = self.run.max_size {
                        if stored.list.entries().len() == max {
                            lines.push(format!(
                                "  * __Warning: Now has {max} entries, may have been truncated - check and fix manually!__"
                            ));
                        }
                    }
                }
            }
            report.section(format!("Merged {label} Lists")).lines = lines;
        }

        if self.run.remove_empty_sublists {
            let mut stored = mem::take(&mut self.run.stored);
            for &record_type in &self.record_types {
                let Some(lists) = stored.get_mut(&record_type) else {
                    continue;
                };
                let outcome = prune_empty_sublists(lists);
                for id in &outcome.rewritten {
                    if let Some(list) = lists.get(id) {
                        patch.set(self.write_record(list));
                    }
                }
                for id in &outcome.cleaned {
                    keep(id);
                }
                let label = list_label(record_type);
                report.section(format!("Empty {label} Sublists Removed")).lines =
                    sorted_editor_ids(lists, &outcome.removed);
                report.section(format!("Cleaned {label} Lists")).lines =
                    sorted_editor_ids(lists, &outcome.cleaned);
                debug!(
                    merger = self.name,
                    list_type = %record_type,
                    removed = outcome.removed.len(),
                    cleaned = outcome.cleaned.len(),
                    "empty sublists pruned"
                );
            }
        }

        report.schema_mismatches = self.run.schema_mismatches;
        info!(merger = self.name, merged = report.changed, "build complete");
        self.reset();
        report
    }

    fn reset(&mut self) {
        self.run = LeveledRun::default();
    }
}

/// `* eid` lines for the given lists, sorted case-insensitively.
fn sorted_editor_ids<L: MergeableList>(
    lists: &BTreeMap<RecordId, StoredList<L>>,
    ids: &BTreeSet<RecordId>,
) -> Vec<String> {
    let mut eids: Vec<&str> = ids
        .iter()
        .filter_map(|id| lists.get(id))
        .map(StoredList::editor_id)
        .collect();
    eids.sort_by_key(|eid| eid.to_lowercase());
    eids.into_iter().map(|eid| format!("* {eid}")).collect()
}
