use patchsmith_merge::{
    Delta, DeltaMerger, MergeConfig, MergeError, PatchBuilder, Permissions, apply_delta,
    apply_deltas, compute_delta,
};
use patchsmith_model::{
    FactionRelation, FieldAccess, FieldName, FieldValue, InventoryEntry, LoadOrder, Plugin,
    Record, RecordStore,
};
use patchsmith_types::{PluginName, RecordId, RecordType, Tag};
use pretty_assertions::assert_eq;
use std::collections::{BTreeMap, BTreeSet};

fn rid(object_id: u32) -> RecordId {
    RecordId::new("Oblivion.esm", object_id)
}

fn slot(object_id: u32, count: i32) -> InventoryEntry {
    InventoryEntry::new(rid(object_id), count)
}

fn make_container(items: Vec<InventoryEntry>) -> Record {
    Record::new(rid(0xC0), RecordType::Container)
        .with_editor_id("ChestA")
        .with_field(FieldName::Items, FieldValue::Inventory(items))
}

fn make_faction(relations: Vec<FactionRelation>) -> Record {
    Record::new(rid(0xF0), RecordType::Faction)
        .with_editor_id("FightersGuild")
        .with_field(FieldName::Relations, FieldValue::Relations(relations))
}

fn only(perms: &str) -> Permissions {
    Permissions {
        add: perms.contains('a'),
        change: perms.contains('c'),
        remove: perms.contains('r'),
    }
}

fn inventory_builder() -> PatchBuilder {
    let mut builder = PatchBuilder::new(MergeConfig::default());
    builder.add_strategy(Box::new(DeltaMerger::inventory()));
    builder
}

// ── compute_delta ────────────────────────────────────────────────

#[test]
fn remove_tag_yields_removed_keys() {
    let master = vec![rid(0xA), rid(0xB), rid(0xC)];
    let modded = vec![rid(0xA), rid(0xC)];
    let delta = compute_delta(&master, &modded, only("r"));
    assert_eq!(delta.remove_keys, BTreeSet::from([rid(0xB)]));
    assert!(delta.add_entries.is_empty());
    assert_eq!(apply_deltas(&master, [&delta]), vec![rid(0xA), rid(0xC)]);
}

#[test]
fn removal_without_tag_is_dropped() {
    let master = vec![rid(0xA), rid(0xB)];
    let delta = compute_delta(&master, &[rid(0xA)], only("ac"));
    assert!(delta.is_empty());
}

#[test]
fn identical_lists_give_empty_delta() {
    let master = vec![slot(1, 1), slot(2, 5)];
    assert!(compute_delta(&master, &master.clone(), Permissions::ALL).is_empty());
}

#[test]
fn additions_need_add_tag() {
    let master = vec![slot(1, 1)];
    let modded = vec![slot(1, 1), slot(2, 3)];
    assert!(compute_delta(&master, &modded, only("cr")).is_empty());

    let delta = compute_delta(&master, &modded, only("a"));
    assert_eq!(delta.add_entries, vec![slot(2, 3)]);
}

#[test]
fn changed_count_is_a_change() {
    let master = vec![slot(1, 1), slot(2, 1)];
    let modded = vec![slot(1, 1), slot(2, 10)];
    let delta = compute_delta(&master, &modded, only("c"));
    assert_eq!(delta.change_entries, vec![slot(2, 10)]);
    assert!(compute_delta(&master, &modded, only("ar")).is_empty());
}

#[test]
fn new_entry_is_never_a_change() {
    let master = vec![slot(1, 1)];
    let modded = vec![slot(1, 1), slot(2, 1)];
    // Not add-tagged: the new entry is dropped rather than reported changed.
    assert!(compute_delta(&master, &modded, only("c")).is_empty());
}

// ── apply_delta ──────────────────────────────────────────────────

#[test]
fn changed_entries_move_to_end() {
    let mut entries = vec![slot(1, 1), slot(2, 1), slot(3, 1)];
    let delta = Delta {
        change_entries: vec![slot(1, 7)],
        ..Delta::default()
    };
    apply_delta(&mut entries, &delta);
    assert_eq!(entries, vec![slot(2, 1), slot(3, 1), slot(1, 7)]);
}

#[test]
fn change_for_absent_key_is_ignored() {
    let mut entries = vec![slot(1, 1)];
    let delta = Delta {
        change_entries: vec![slot(9, 2)],
        ..Delta::default()
    };
    apply_delta(&mut entries, &delta);
    assert_eq!(entries, vec![slot(1, 1)]);
}

#[test]
fn additions_skip_present_keys() {
    let mut entries = vec![slot(1, 1)];
    let delta = Delta {
        add_entries: vec![slot(1, 4), slot(2, 2), slot(2, 3)],
        ..Delta::default()
    };
    apply_delta(&mut entries, &delta);
    assert_eq!(entries, vec![slot(1, 1), slot(2, 2)]);
}

#[test]
fn deltas_fold_in_order() {
    let base = vec![slot(1, 1), slot(2, 1)];
    let first = Delta {
        remove_keys: BTreeSet::from([rid(1)]),
        ..Delta::default()
    };
    let second = Delta {
        add_entries: vec![slot(1, 3)],
        ..Delta::default()
    };
    assert_eq!(apply_deltas(&base, [&first, &second]), vec![slot(2, 1), slot(1, 3)]);
    assert_eq!(apply_deltas(&base, [&second, &first]), vec![slot(2, 1)]);
}

// ── Merger ───────────────────────────────────────────────────────

fn make_inventory_order() -> (LoadOrder, BTreeMap<PluginName, Vec<Record>>) {
    let order = LoadOrder::new(vec![
        Plugin::new("Oblivion.esm"),
        Plugin::new("Remover.esp")
            .with_masters(["Oblivion.esm"])
            .with_tags([Tag::InventRemove]),
        Plugin::new("Adder.esp")
            .with_masters(["Oblivion.esm"])
            .with_tags([Tag::InventAdd]),
    ])
    .unwrap();
    let mut records = BTreeMap::new();
    records.insert(
        PluginName::new("Oblivion.esm"),
        vec![make_container(vec![slot(0xA, 1), slot(0xB, 1), slot(0xC, 1)])],
    );
    records.insert(
        PluginName::new("Remover.esp"),
        vec![make_container(vec![slot(0xA, 1), slot(0xC, 1)])],
    );
    records.insert(
        PluginName::new("Adder.esp"),
        vec![make_container(vec![
            slot(0xA, 1),
            slot(0xB, 1),
            slot(0xC, 1),
            slot(0xD, 2),
        ])],
    );
    (order, records)
}

#[test]
fn merger_combines_removal_and_addition() {
    let (order, records) = make_inventory_order();
    let (patch, summary) = inventory_builder().build_patch(&order, &records).unwrap();

    let merged = patch.get(&rid(0xC0)).unwrap();
    assert_eq!(
        FieldAccess::ITEMS.read(merged).unwrap(),
        &vec![slot(0xA, 1), slot(0xC, 1), slot(0xD, 2)]
    );
    assert!(patch.is_kept(&rid(0xC0)));

    let report = summary.report("Import Inventory").unwrap();
    assert_eq!(report.changed, 1);
    assert_eq!(report.per_plugin.get(&PluginName::new("Oblivion.esm")), Some(&1));
    let section = report.find_section("Inventories Changed: 1").unwrap();
    assert_eq!(section.lines, vec!["* Oblivion.esm: 1".to_string()]);
}

#[test]
fn merger_keeps_nothing_when_sources_agree_with_master() {
    let (order, mut records) = make_inventory_order();
    let vanilla = records[&PluginName::new("Oblivion.esm")].clone();
    records.insert(PluginName::new("Remover.esp"), vanilla.clone());
    records.insert(PluginName::new("Adder.esp"), vanilla);

    let (patch, summary) = inventory_builder().build_patch(&order, &records).unwrap();
    assert!(summary.kept.is_empty());
    assert!(!patch.is_kept(&rid(0xC0)));
    assert_eq!(summary.report("Import Inventory").unwrap().changed, 0);
}

#[test]
fn untagged_plugins_are_not_sources() {
    let order = LoadOrder::new(vec![
        Plugin::new("Oblivion.esm"),
        Plugin::new("Plain.esp").with_masters(["Oblivion.esm"]),
    ])
    .unwrap();
    let mut records = BTreeMap::new();
    records.insert(PluginName::new("Oblivion.esm"), vec![make_container(vec![slot(1, 1)])]);
    records.insert(PluginName::new("Plain.esp"), vec![make_container(Vec::new())]);

    let summary = inventory_builder()
        .build(&order, &records, &mut patchsmith_model::PatchFile::new())
        .unwrap();
    assert!(summary.reports.is_empty());
    assert!(summary.kept.is_empty());
}

#[test]
fn relations_change_replaces_modifier() {
    let order = LoadOrder::new(vec![
        Plugin::new("Oblivion.esm"),
        Plugin::new("Diplomacy.esp")
            .with_masters(["Oblivion.esm"])
            .with_tags([Tag::RelationsChange]),
    ])
    .unwrap();
    let mages = RecordId::new("Oblivion.esm", 0xF1);
    let thieves = RecordId::new("Oblivion.esm", 0xF2);
    let mut records = BTreeMap::new();
    records.insert(
        PluginName::new("Oblivion.esm"),
        vec![make_faction(vec![
            FactionRelation::new(mages.clone(), 10),
            FactionRelation::new(thieves.clone(), 20),
        ])],
    );
    records.insert(
        PluginName::new("Diplomacy.esp"),
        vec![make_faction(vec![
            FactionRelation::new(mages.clone(), 10),
            FactionRelation::new(thieves.clone(), -50),
        ])],
    );

    let mut builder = PatchBuilder::new(MergeConfig::default());
    builder.add_strategy(Box::new(DeltaMerger::relations()));
    let (patch, summary) = builder.build_patch(&order, &records).unwrap();

    let faction = patch.get(&rid(0xF0)).unwrap();
    assert_eq!(
        FieldAccess::RELATIONS.read(faction).unwrap(),
        &vec![
            FactionRelation::new(mages, 10),
            FactionRelation::new(thieves, -50)
        ]
    );
    assert!(summary.kept.contains(&rid(0xF0)));
    let report = summary.report("Import Relations").unwrap();
    assert_eq!(
        report.find_section("Modified Factions: 1").unwrap().lines,
        vec!["* Oblivion.esm: 1".to_string()]
    );
}

#[test]
fn missing_master_is_reported() {
    let order = LoadOrder::new(vec![
        Plugin::new("Oblivion.esm"),
        Plugin::new("Remover.esp")
            .with_masters(["Oblivion.esm", "Gone.esm"])
            .with_tags([Tag::InventRemove]),
    ])
    .unwrap();
    let mut records = BTreeMap::new();
    records.insert(
        PluginName::new("Oblivion.esm"),
        vec![make_container(vec![slot(1, 1), slot(2, 1)])],
    );
    records.insert(PluginName::new("Remover.esp"), vec![make_container(vec![slot(1, 1)])]);

    let (_, summary) = inventory_builder().build_patch(&order, &records).unwrap();
    let report = summary.report("Import Inventory").unwrap();
    assert!(report.missing_masters.contains(&PluginName::new("Gone.esm")));
    assert_eq!(report.changed, 1);
    assert!(report.lines().contains(&"* Gone.esm".to_string()));
}

#[test]
fn record_without_field_is_a_schema_mismatch() {
    let (order, mut records) = make_inventory_order();
    records.insert(
        PluginName::new("Remover.esp"),
        vec![Record::new(rid(0xC0), RecordType::Container)],
    );

    let (_, summary) = inventory_builder().build_patch(&order, &records).unwrap();
    let report = summary.report("Import Inventory").unwrap();
    assert_eq!(report.schema_mismatches, 1);
    // The adder's contribution still lands.
    assert_eq!(report.changed, 1);
}

#[test]
fn unsupported_record_type_fails_initialization() {
    let (order, records) = make_inventory_order();
    let mut builder = PatchBuilder::new(MergeConfig::default());
    builder.add_strategy(Box::new(
        DeltaMerger::inventory().with_record_types(vec![RecordType::Faction]),
    ));
    let err = builder.build_patch(&order, &records).unwrap_err();
    assert!(matches!(
        err,
        MergeError::UnsupportedField {
            record_type: RecordType::Faction,
            field: FieldName::Items,
            ..
        }
    ));
}
