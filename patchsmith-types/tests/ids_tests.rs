use patchsmith_types::{PluginName, RecordId, RecordType};
use std::collections::{BTreeSet, HashSet};
use std::str::FromStr;

// ── PluginName ────────────────────────────────────────────────────

#[test]
fn plugin_name_equality_ignores_case() {
    assert_eq!(PluginName::new("Oblivion.esm"), PluginName::new("OBLIVION.ESM"));
    assert_ne!(PluginName::new("Oblivion.esm"), PluginName::new("Oblivion.esp"));
}

#[test]
fn plugin_name_keeps_original_spelling() {
    let name = PluginName::new("Oscuro's_Oblivion_Overhaul.esm");
    assert_eq!(name.as_str(), "Oscuro's_Oblivion_Overhaul.esm");
    assert_eq!(name.to_string(), "Oscuro's_Oblivion_Overhaul.esm");
}

#[test]
fn plugin_name_hash_ignores_case() {
    let mut set = HashSet::new();
    set.insert(PluginName::new("TIE.esp"));
    set.insert(PluginName::new("tie.ESP"));
    assert_eq!(set.len(), 1);
}

#[test]
fn plugin_name_ordering_ignores_case() {
    let names: BTreeSet<PluginName> = ["b.esp", "A.esp", "a.ESP", "C.esp"]
        .into_iter()
        .map(PluginName::from)
        .collect();
    let ordered: Vec<&str> = names.iter().map(PluginName::as_str).collect();
    assert_eq!(ordered, vec!["A.esp", "b.esp", "C.esp"]);
}

#[test]
fn plugin_name_serializes_as_string() {
    let name = PluginName::new("Francesco.esp");
    let json = serde_json::to_string(&name).unwrap();
    assert_eq!(json, "\"Francesco.esp\"");
    let parsed: PluginName = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, name);
}

// ── RecordId ──────────────────────────────────────────────────────

#[test]
fn record_id_display_is_hex() {
    let id = RecordId::new("Oblivion.esm", 0x03AB5D);
    assert_eq!(id.to_string(), "Oblivion.esm:03AB5D");
}

#[test]
fn record_id_parse_roundtrip() {
    let id = RecordId::new("Some Mod.esp", 0x000801);
    let parsed = RecordId::from_str(&id.to_string()).unwrap();
    assert_eq!(parsed, id);
}

#[test]
fn record_id_parse_accepts_colon_in_plugin_name() {
    let parsed: RecordId = "weird:name.esp:00ABCD".parse().unwrap();
    assert_eq!(parsed.plugin.as_str(), "weird:name.esp");
    assert_eq!(parsed.object_id, 0xABCD);
}

#[test]
fn record_id_parse_invalid() {
    assert!("no-separator".parse::<RecordId>().is_err());
    assert!(":001234".parse::<RecordId>().is_err());
    assert!("Oblivion.esm:zzzz".parse::<RecordId>().is_err());
}

#[test]
fn record_id_defined_by() {
    let id = RecordId::new("Oblivion.esm", 7);
    assert!(id.is_defined_by(&PluginName::new("oblivion.esm")));
    assert!(!id.is_defined_by(&PluginName::new("Mod.esp")));
}

#[test]
fn record_id_orders_by_plugin_then_object() {
    let a = RecordId::new("A.esp", 9);
    let b = RecordId::new("B.esp", 1);
    let c = RecordId::new("B.esp", 2);
    assert!(a < b);
    assert!(b < c);
}

#[test]
fn record_id_serialization_roundtrip() {
    let id = RecordId::new("Oblivion.esm", 0x0C7615);
    let json = serde_json::to_string(&id).unwrap();
    let parsed: RecordId = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, id);
}

// ── RecordType ────────────────────────────────────────────────────

#[test]
fn record_type_signatures() {
    assert_eq!(RecordType::Npc.signature(), "NPC_");
    assert_eq!(RecordType::LeveledItem.to_string(), "LVLI");
    assert_eq!("FLST".parse::<RecordType>().unwrap(), RecordType::FormIdList);
}

#[test]
fn record_type_parse_unknown() {
    assert!("WEAP".parse::<RecordType>().is_err());
}

#[test]
fn record_type_serializes_as_signature() {
    let json = serde_json::to_string(&RecordType::LeveledSpell).unwrap();
    assert_eq!(json, "\"LVSP\"");
}

#[test]
fn record_type_all_signatures_unique() {
    let sigs: HashSet<&str> = RecordType::ALL.iter().map(|t| t.signature()).collect();
    assert_eq!(sigs.len(), RecordType::ALL.len());
}
