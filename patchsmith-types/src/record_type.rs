use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Four-character record type signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecordType {
    #[serde(rename = "CONT")]
    Container,
    #[serde(rename = "CREA")]
    Creature,
    #[serde(rename = "NPC_")]
    Npc,
    #[serde(rename = "OTFT")]
    Outfit,
    #[serde(rename = "FACT")]
    Faction,
    #[serde(rename = "LVLC")]
    LeveledCreature,
    #[serde(rename = "LVLI")]
    LeveledItem,
    #[serde(rename = "LVLN")]
    LeveledActor,
    #[serde(rename = "LVSP")]
    LeveledSpell,
    #[serde(rename = "FLST")]
    FormIdList,
}

impl RecordType {
    /// Every known record type, in signature order used for reports.
    pub const ALL: [RecordType; 10] = [
        Self::Container,
        Self::Creature,
        Self::Npc,
        Self::Outfit,
        Self::Faction,
        Self::LeveledCreature,
        Self::LeveledItem,
        Self::LeveledActor,
        Self::LeveledSpell,
        Self::FormIdList,
    ];

    /// The on-disk signature, e.g. `NPC_`.
    #[must_use]
    pub const fn signature(self) -> &'static str {
        match self {
            Self::Container => "CONT",
            Self::Creature => "CREA",
            Self::Npc => "NPC_",
            Self::Outfit => "OTFT",
            Self::Faction => "FACT",
            Self::LeveledCreature => "LVLC",
            Self::LeveledItem => "LVLI",
            Self::LeveledActor => "LVLN",
            Self::LeveledSpell => "LVSP",
            Self::FormIdList => "FLST",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.signature())
    }
}

impl FromStr for RecordType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.signature() == s)
            .ok_or_else(|| crate::Error::UnknownRecordType(s.to_string()))
    }
}
