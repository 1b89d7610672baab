//! Entries of mergeable fields.
//!
//! Every entry exposes a key used for membership tests. For plain id lists
//! the key is the entry itself; for composite entries it is the referenced
//! record (the item of an inventory slot, the faction of a relation, the
//! referenced list of a leveled entry). Keys never need outside lookups.

use patchsmith_types::RecordId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

/// An element of a mergeable field.
pub trait Entry: Clone + Eq + Hash + fmt::Debug {
    /// Projection used for equality and membership independent of the full
    /// value.
    type Key: Clone + Eq + Hash + Ord + fmt::Debug;

    /// Returns this entry's key.
    fn key(&self) -> Self::Key;
}

impl Entry for RecordId {
    type Key = RecordId;

    fn key(&self) -> RecordId {
        self.clone()
    }
}

/// One inventory slot of a container, creature or NPC.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub item: RecordId,
    pub count: i32,
}

impl InventoryEntry {
    #[must_use]
    pub fn new(item: RecordId, count: i32) -> Self {
        Self { item, count }
    }
}

impl Entry for InventoryEntry {
    type Key = RecordId;

    fn key(&self) -> RecordId {
        self.item.clone()
    }
}

/// A faction's disposition towards another faction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FactionRelation {
    pub faction: RecordId,
    pub modifier: i32,
    /// Group combat reaction; absent in games that do not record one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combat_reaction: Option<u32>,
}

impl FactionRelation {
    #[must_use]
    pub fn new(faction: RecordId, modifier: i32) -> Self {
        Self {
            faction,
            modifier,
            combat_reaction: None,
        }
    }
}

impl Entry for FactionRelation {
    type Key = RecordId;

    fn key(&self) -> RecordId {
        self.faction.clone()
    }
}

/// One entry of a leveled list.
///
/// Field order matters: the derived ordering sorts by referenced record,
/// then level, then count, which is the canonical leveled-list order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LeveledEntry {
    /// The referenced record, possibly another leveled list.
    pub list_id: RecordId,
    pub level: u16,
    pub count: u16,
}

impl LeveledEntry {
    #[must_use]
    pub fn new(list_id: RecordId, level: u16, count: u16) -> Self {
        Self {
            list_id,
            level,
            count,
        }
    }
}

impl Entry for LeveledEntry {
    type Key = RecordId;

    fn key(&self) -> RecordId {
        self.list_id.clone()
    }
}
