//! Capability tags ("bash tags") applied to plugins.
//!
//! A tag grants a plugin permission to contribute one kind of merge
//! operation for one field: add, change or remove entries of an inventory,
//! relevel or delevel a leveled list, force-add previously deleted spells,
//! and so on. Tags never imply each other; a plugin carries exactly the set
//! its author (or the user) applied.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A single capability tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tag {
    #[serde(rename = "Invent.Add")]
    InventAdd,
    #[serde(rename = "Invent.Change")]
    InventChange,
    #[serde(rename = "Invent.Remove")]
    InventRemove,
    #[serde(rename = "Outfits.Add")]
    OutfitsAdd,
    #[serde(rename = "Outfits.Remove")]
    OutfitsRemove,
    #[serde(rename = "Relations.Add")]
    RelationsAdd,
    #[serde(rename = "Relations.Change")]
    RelationsChange,
    #[serde(rename = "Relations.Remove")]
    RelationsRemove,
    #[serde(rename = "Actors.Spells")]
    ActorsSpells,
    #[serde(rename = "Actors.SpellsForceAdd")]
    ActorsSpellsForceAdd,
    #[serde(rename = "Actors.AIPackages")]
    ActorsAiPackages,
    #[serde(rename = "Actors.AIPackagesForceAdd")]
    ActorsAiPackagesForceAdd,
    #[serde(rename = "Delev")]
    Delev,
    #[serde(rename = "Relev")]
    Relev,
    #[serde(rename = "Deflst")]
    Deflst,
}

/// Tags that are meaningless without a prerequisite tag on the same plugin.
const PREREQUISITES: &[(Tag, Tag)] = &[
    (Tag::ActorsSpellsForceAdd, Tag::ActorsSpells),
    (Tag::ActorsAiPackagesForceAdd, Tag::ActorsAiPackages),
];

impl Tag {
    pub const ALL: [Tag; 15] = [
        Self::InventAdd,
        Self::InventChange,
        Self::InventRemove,
        Self::OutfitsAdd,
        Self::OutfitsRemove,
        Self::RelationsAdd,
        Self::RelationsChange,
        Self::RelationsRemove,
        Self::ActorsSpells,
        Self::ActorsSpellsForceAdd,
        Self::ActorsAiPackages,
        Self::ActorsAiPackagesForceAdd,
        Self::Delev,
        Self::Relev,
        Self::Deflst,
    ];

    /// The canonical tag name as written in plugin descriptions.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::InventAdd => "Invent.Add",
            Self::InventChange => "Invent.Change",
            Self::InventRemove => "Invent.Remove",
            Self::OutfitsAdd => "Outfits.Add",
            Self::OutfitsRemove => "Outfits.Remove",
            Self::RelationsAdd => "Relations.Add",
            Self::RelationsChange => "Relations.Change",
            Self::RelationsRemove => "Relations.Remove",
            Self::ActorsSpells => "Actors.Spells",
            Self::ActorsSpellsForceAdd => "Actors.SpellsForceAdd",
            Self::ActorsAiPackages => "Actors.AIPackages",
            Self::ActorsAiPackagesForceAdd => "Actors.AIPackagesForceAdd",
            Self::Delev => "Delev",
            Self::Relev => "Relev",
            Self::Deflst => "Deflst",
        }
    }

    /// The tag this one cannot be applied without, if any.
    #[must_use]
    pub fn requires(self) -> Option<Tag> {
        PREREQUISITES
            .iter()
            .find(|(tag, _)| *tag == self)
            .map(|(_, required)| *required)
    }

    /// First letter of the tag name, used for compact annotations (`[DR]`).
    #[must_use]
    pub fn initial(self) -> char {
        self.name().chars().next().unwrap_or('?')
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Tag {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| crate::Error::UnknownTag(s.to_string()))
    }
}

/// A tag applied without the tag it depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagViolation {
    pub tag: Tag,
    pub requires: Tag,
}

/// The set of tags applied to one plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet(BTreeSet<Tag>);

impl TagSet {
    /// Creates an empty tag set.
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Returns true if the tag is applied.
    #[must_use]
    pub fn contains(&self, tag: Tag) -> bool {
        self.0.contains(&tag)
    }

    /// Returns true if an optional tag is applied. `None` is never applied,
    /// which lets mergers without e.g. a change tag pass their slot through.
    #[must_use]
    pub fn has(&self, tag: Option<Tag>) -> bool {
        tag.is_some_and(|t| self.contains(t))
    }

    /// Returns true if any of the given tags is applied.
    #[must_use]
    pub fn contains_any(&self, tags: &[Tag]) -> bool {
        tags.iter().any(|t| self.contains(*t))
    }

    /// Applies a tag. Returns false if it was already applied.
    pub fn insert(&mut self, tag: Tag) -> bool {
        self.0.insert(tag)
    }

    /// Returns the number of applied tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no tag is applied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates tags in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = Tag> + '_ {
        self.0.iter().copied()
    }

    /// Returns every applied tag whose prerequisite is missing.
    #[must_use]
    pub fn violations(&self) -> Vec<TagViolation> {
        self.iter()
            .filter_map(|tag| {
                tag.requires()
                    .filter(|required| !self.contains(*required))
                    .map(|requires| TagViolation { tag, requires })
            })
            .collect()
    }

    /// Parses a comma-separated tag list such as `"Delev, Relev"`.
    pub fn parse_list(s: &str) -> crate::Result<Self> {
        s.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(Tag::from_str)
            .collect()
    }
}

impl FromIterator<Tag> for TagSet {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[Tag; N]> for TagSet {
    fn from(tags: [Tag; N]) -> Self {
        tags.into_iter().collect()
    }
}
