//! Capability table: which record types carry which mergeable fields, and
//! typed accessor pairs for reading and writing those fields.
//!
//! Mergers pick their [`FieldAccess`] once when they are configured and
//! check it against [`supports`] during initialization, so the scan and
//! build passes never inspect field names at runtime.

use crate::entry::{FactionRelation, InventoryEntry};
use crate::record::{FieldName, FieldValue, LeveledList, Record};
use patchsmith_types::{RecordId, RecordType};
use std::fmt;

const CAPABILITIES: &[(RecordType, &[FieldName])] = &[
    (RecordType::Container, &[FieldName::Items]),
    (
        RecordType::Creature,
        &[FieldName::Items, FieldName::Spells, FieldName::AiPackages],
    ),
    (
        RecordType::Npc,
        &[FieldName::Items, FieldName::Spells, FieldName::AiPackages],
    ),
    (RecordType::Outfit, &[FieldName::OutfitItems]),
    (RecordType::Faction, &[FieldName::Relations]),
    (RecordType::LeveledCreature, &[FieldName::Entries]),
    (RecordType::LeveledItem, &[FieldName::Entries]),
    (RecordType::LeveledActor, &[FieldName::Entries]),
    (RecordType::LeveledSpell, &[FieldName::Entries]),
    (RecordType::FormIdList, &[FieldName::FormIds]),
];

/// Returns the mergeable fields a record type carries.
#[must_use]
pub fn supported_fields(record_type: RecordType) -> &'static [FieldName] {
    CAPABILITIES
        .iter()
        .find(|(t, _)| *t == record_type)
        .map(|(_, fields)| *fields)
        .unwrap_or(&[])
}

/// Returns true if records of `record_type` carry `field`.
#[must_use]
pub fn supports(record_type: RecordType, field: FieldName) -> bool {
    supported_fields(record_type).contains(&field)
}

/// A typed accessor/mutator pair for one field.
pub struct FieldAccess<T> {
    field: FieldName,
    get: fn(&FieldValue) -> Option<&T>,
    get_mut: fn(&mut FieldValue) -> Option<&mut T>,
}

impl<T> Clone for FieldAccess<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for FieldAccess<T> {}

impl<T> fmt::Debug for FieldAccess<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldAccess")
            .field("field", &self.field)
            .finish()
    }
}

impl<T> FieldAccess<T> {
    /// The field this accessor reads.
    #[must_use]
    pub const fn field(&self) -> FieldName {
        self.field
    }

    /// Reads the field. `None` if the record lacks it or stores a value of
    /// another shape (a schema mismatch).
    #[must_use]
    pub fn read<'a>(&self, record: &'a Record) -> Option<&'a T> {
        record.field(self.field).and_then(self.get)
    }

    /// Mutable counterpart of [`read`](Self::read).
    pub fn write<'a>(&self, record: &'a mut Record) -> Option<&'a mut T> {
        record.field_mut(self.field).and_then(self.get_mut)
    }
}

fn inventory(value: &FieldValue) -> Option<&Vec<InventoryEntry>> {
    match value {
        FieldValue::Inventory(entries) => Some(entries),
        _ => None,
    }
}

fn inventory_mut(value: &mut FieldValue) -> Option<&mut Vec<InventoryEntry>> {
    match value {
        FieldValue::Inventory(entries) => Some(entries),
        _ => None,
    }
}

fn relations(value: &FieldValue) -> Option<&Vec<FactionRelation>> {
    match value {
        FieldValue::Relations(entries) => Some(entries),
        _ => None,
    }
}

fn relations_mut(value: &mut FieldValue) -> Option<&mut Vec<FactionRelation>> {
    match value {
        FieldValue::Relations(entries) => Some(entries),
        _ => None,
    }
}

fn form_ids(value: &FieldValue) -> Option<&Vec<RecordId>> {
    match value {
        FieldValue::FormIds(ids) => Some(ids),
        _ => None,
    }
}

fn form_ids_mut(value: &mut FieldValue) -> Option<&mut Vec<RecordId>> {
    match value {
        FieldValue::FormIds(ids) => Some(ids),
        _ => None,
    }
}

fn leveled(value: &FieldValue) -> Option<&LeveledList> {
    match value {
        FieldValue::Leveled(list) => Some(list),
        _ => None,
    }
}

fn leveled_mut(value: &mut FieldValue) -> Option<&mut LeveledList> {
    match value {
        FieldValue::Leveled(list) => Some(list),
        _ => None,
    }
}

impl FieldAccess<Vec<InventoryEntry>> {
    pub const ITEMS: Self = Self {
        field: FieldName::Items,
        get: inventory,
        get_mut: inventory_mut,
    };
}

impl FieldAccess<Vec<FactionRelation>> {
    pub const RELATIONS: Self = Self {
        field: FieldName::Relations,
        get: relations,
        get_mut: relations_mut,
    };
}

impl FieldAccess<Vec<RecordId>> {
    pub const OUTFIT_ITEMS: Self = Self {
        field: FieldName::OutfitItems,
        get: form_ids,
        get_mut: form_ids_mut,
    };

    pub const SPELLS: Self = Self {
        field: FieldName::Spells,
        get: form_ids,
        get_mut: form_ids_mut,
    };

    pub const AI_PACKAGES: Self = Self {
        field: FieldName::AiPackages,
        get: form_ids,
        get_mut: form_ids_mut,
    };

    pub const FORM_IDS: Self = Self {
        field: FieldName::FormIds,
        get: form_ids,
        get_mut: form_ids_mut,
    };
}

impl FieldAccess<LeveledList> {
    pub const ENTRIES: Self = Self {
        field: FieldName::Entries,
        get: leveled,
        get_mut: leveled_mut,
    };
}
