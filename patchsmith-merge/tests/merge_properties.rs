//! Property-based tests for the merge primitives.
//!
//! Covered here:
//! - Deltas: identical lists produce nothing, and each kind of change only
//!   appears when its tag allows it
//! - Ordered merge: no duplicates, deletions stick, refolding is a no-op
//! - Sublist pruning: no list is left referencing an empty list

use patchsmith_merge::{
    MergeAccumulator, Permissions, StoredList, apply_deltas, compute_delta, deleted_entries,
    prune_empty_sublists,
};
use patchsmith_model::{FieldName, FieldValue, LeveledEntry, LeveledList, Record};
use patchsmith_types::{PluginName, RecordId, RecordType};
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// HELPER STRATEGIES
// =============================================================================

fn rid(object_id: u32) -> RecordId {
    RecordId::new("Oblivion.esm", object_id)
}

/// A list of distinct small ids in arbitrary order.
fn id_list_strategy() -> impl Strategy<Value = Vec<u32>> {
    prop::sample::subsequence((0u32..16).collect::<Vec<_>>(), 0..=16).prop_shuffle()
}

fn record_ids(ids: &[u32]) -> Vec<RecordId> {
    ids.iter().map(|&i| rid(i)).collect()
}

fn permissions_strategy() -> impl Strategy<Value = Permissions> {
    any::<(bool, bool, bool)>().prop_map(|(add, change, remove)| Permissions {
        add,
        change,
        remove,
    })
}

/// Item sets for `n` leveled lists with ids `0x100..0x100 + n`. Each list
/// may reference other lists (itself included) and plain items `1..=4`.
fn list_graph_strategy() -> impl Strategy<Value = Vec<Vec<u32>>> {
    (1usize..8).prop_flat_map(|n| {
        let pool: Vec<u32> = (0x100..0x100 + n as u32).chain(1..=4).collect();
        let len = pool.len();
        prop::collection::vec(prop::sample::subsequence(pool, 0..=len), n)
    })
}

fn make_stored(object_id: u32, members: &[u32]) -> StoredList<LeveledList> {
    let list = LeveledList::with_entries(
        members
            .iter()
            .map(|&m| LeveledEntry::new(rid(m), 1, 1))
            .collect(),
    );
    let record = Record::new(rid(object_id), RecordType::LeveledItem)
        .with_editor_id(format!("LL{object_id:X}"))
        .with_field(FieldName::Entries, FieldValue::Leveled(list.clone()));
    StoredList::defined(record, list)
}

// =============================================================================
// DELTA PROPERTIES
// =============================================================================

mod delta_properties {
    use super::*;

    proptest! {
        /// A plugin that repeats its master's list contributes nothing.
        #[test]
        fn identical_lists_give_empty_delta(
            ids in id_list_strategy(),
            perms in permissions_strategy(),
        ) {
            let list = record_ids(&ids);
            prop_assert!(compute_delta(&list, &list, perms).is_empty());
        }

        /// Each part of a delta is empty unless its tag is present.
        #[test]
        fn delta_respects_tags(
            master in id_list_strategy(),
            modded in id_list_strategy(),
            perms in permissions_strategy(),
        ) {
            let delta = compute_delta(&record_ids(&master), &record_ids(&modded), perms);
            if !perms.add {
                prop_assert!(delta.add_entries.is_empty());
            }
            if !perms.change {
                prop_assert!(delta.change_entries.is_empty());
            }
            if !perms.remove {
                prop_assert!(delta.remove_keys.is_empty());
            }
        }

        /// With every tag, applying the delta reproduces the plugin's entries.
        #[test]
        fn full_delta_reproduces_modded_entries(
            master in id_list_strategy(),
            modded in id_list_strategy(),
        ) {
            let master = record_ids(&master);
            let modded = record_ids(&modded);
            let delta = compute_delta(&master, &modded, Permissions::ALL);
            let merged: BTreeSet<RecordId> = apply_deltas(&master, [&delta]).into_iter().collect();
            let expected: BTreeSet<RecordId> = modded.into_iter().collect();
            prop_assert_eq!(merged, expected);
        }
    }
}

// =============================================================================
// ORDERED MERGE PROPERTIES
// =============================================================================

mod ordered_properties {
    use super::*;

    fn fold_all(master: &[u32], sources: &[Vec<u32>]) -> MergeAccumulator<u32> {
        let mut acc = MergeAccumulator::new();
        for (i, source) in sources.iter().enumerate() {
            let plugin = PluginName::new(format!("Mod{i}.esp"));
            acc.fold(&plugin, source, &deleted_entries(master, source), false);
        }
        acc
    }

    proptest! {
        /// The merged list never holds an entry twice.
        #[test]
        fn merged_has_no_duplicates(
            master in id_list_strategy(),
            sources in prop::collection::vec(id_list_strategy(), 1..5),
        ) {
            let acc = fold_all(&master, &sources);
            let unique: BTreeSet<&u32> = acc.merged().iter().collect();
            prop_assert_eq!(unique.len(), acc.merged().len());
        }

        /// Without force-add, nothing deleted comes back.
        #[test]
        fn deleted_entries_stay_out(
            master in id_list_strategy(),
            sources in prop::collection::vec(id_list_strategy(), 1..5),
        ) {
            let acc = fold_all(&master, &sources);
            for entry in acc.merged() {
                prop_assert!(!acc.deleted().contains(entry));
            }
        }

        /// Every merged entry comes from some source.
        #[test]
        fn merged_entries_come_from_sources(
            master in id_list_strategy(),
            sources in prop::collection::vec(id_list_strategy(), 1..5),
        ) {
            let acc = fold_all(&master, &sources);
            for entry in acc.merged() {
                prop_assert!(sources.iter().any(|s| s.contains(entry)));
            }
        }

        /// Folding the same plugin again changes nothing.
        #[test]
        fn refold_is_idempotent(
            master in id_list_strategy(),
            sources in prop::collection::vec(id_list_strategy(), 1..5),
            force_add in any::<bool>(),
        ) {
            let mut acc = fold_all(&master, &sources);
            let last = PluginName::new(format!("Mod{}.esp", sources.len() - 1));
            let source = &sources[sources.len() - 1];
            let deleted = deleted_entries(&master, source);

            acc.fold(&last, source, &deleted, force_add);
            let once = acc.clone();
            acc.fold(&last, source, &deleted, force_add);
            prop_assert_eq!(acc, once);
        }
    }
}

// =============================================================================
// PRUNING PROPERTIES
// =============================================================================

mod pruning_properties {
    use super::*;

    proptest! {
        /// After pruning, no list references a list with no items.
        #[test]
        fn no_reference_to_empty_list_survives(graph in list_graph_strategy()) {
            let mut lists: BTreeMap<RecordId, StoredList<LeveledList>> = graph
                .iter()
                .enumerate()
                .map(|(i, members)| {
                    let object_id = 0x100 + i as u32;
                    (rid(object_id), make_stored(object_id, members))
                })
                .collect();

            let outcome = prune_empty_sublists(&mut lists);

            for stored in lists.values() {
                for item in &stored.items {
                    if let Some(target) = lists.get(item) {
                        prop_assert!(!target.items.is_empty());
                    }
                }
                for entry in &stored.list.entries {
                    if let Some(target) = lists.get(&entry.list_id) {
                        prop_assert!(!target.items.is_empty());
                    }
                }
            }
            for id in &outcome.removed {
                prop_assert!(lists[id].items.is_empty());
            }
            prop_assert!(outcome.cleaned.is_subset(&outcome.rewritten));
        }
    }
}
