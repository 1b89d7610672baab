use crate::entry::{FactionRelation, InventoryEntry, LeveledEntry};
use patchsmith_types::{RecordId, RecordType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Names of the mergeable subrecord fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    /// Inventory slots (containers, creatures, NPCs).
    Items,
    /// Outfit membership.
    OutfitItems,
    /// Faction relations.
    Relations,
    /// Actor spell list.
    Spells,
    /// Actor AI package list.
    AiPackages,
    /// Leveled list entries.
    Entries,
    /// FormID list members.
    FormIds,
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Items => "items",
            Self::OutfitItems => "outfit_items",
            Self::Relations => "relations",
            Self::Spells => "spells",
            Self::AiPackages => "ai_packages",
            Self::Entries => "entries",
            Self::FormIds => "form_ids",
        };
        f.write_str(name)
    }
}

/// The typed value of a mergeable field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Inventory(Vec<InventoryEntry>),
    Relations(Vec<FactionRelation>),
    FormIds(Vec<RecordId>),
    Leveled(LeveledList),
}

/// Body of a leveled list record (LVLC, LVLI, LVLN, LVSP).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeveledList {
    /// Chance (0-100) that the list yields nothing.
    #[serde(default)]
    pub chance_none: u8,
    /// Combination of the `FLAG_*` constants.
    #[serde(default)]
    pub flags: u8,
    /// Global variable overriding `chance_none`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global: Option<RecordId>,
    #[serde(default)]
    pub entries: Vec<LeveledEntry>,
}

impl LeveledList {
    pub const FLAG_CALC_FROM_ALL_LEVELS: u8 = 0x01;
    pub const FLAG_CALC_FOR_EACH_ITEM: u8 = 0x02;
    pub const FLAG_USE_ALL: u8 = 0x04;

    /// Creates a list with default settings and the given entries.
    #[must_use]
    pub fn with_entries(entries: Vec<LeveledEntry>) -> Self {
        Self {
            entries,
            ..Self::default()
        }
    }
}

/// A parsed record as seen in one plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub record_type: RecordType,
    #[serde(default)]
    pub editor_id: String,
    #[serde(default)]
    pub fields: BTreeMap<FieldName, FieldValue>,
}

impl Record {
    /// Creates a record with no fields.
    #[must_use]
    pub fn new(id: RecordId, record_type: RecordType) -> Self {
        Self {
            id,
            record_type,
            editor_id: String::new(),
            fields: BTreeMap::new(),
        }
    }

    /// Sets the editor id (builder style).
    #[must_use]
    pub fn with_editor_id(mut self, editor_id: impl Into<String>) -> Self {
        self.editor_id = editor_id.into();
        self
    }

    /// Sets a field (builder style).
    #[must_use]
    pub fn with_field(mut self, name: FieldName, value: FieldValue) -> Self {
        self.fields.insert(name, value);
        self
    }

    /// Returns a field, if the record carries it.
    #[must_use]
    pub fn field(&self, name: FieldName) -> Option<&FieldValue> {
        self.fields.get(&name)
    }

    /// Returns a field mutably, if the record carries it.
    pub fn field_mut(&mut self, name: FieldName) -> Option<&mut FieldValue> {
        self.fields.get_mut(&name)
    }

    /// Replaces (or adds) a field.
    pub fn set_field(&mut self, name: FieldName, value: FieldValue) {
        self.fields.insert(name, value);
    }
}
