//! Patch build configuration.

use crate::MergeResult;
use patchsmith_types::PluginName;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Master file that defines the vanilla records.
pub const DEFAULT_GAME_MASTER: &str = "Oblivion.esm";

/// Settings shared by every merger of one patch build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Strip references to leveled lists that ended up empty.
    pub remove_empty_sublists: bool,
    /// Entry limit of a leveled list in the target file format. A merged list
    /// that hits it exactly is flagged in the report as possibly truncated.
    pub max_leveled_list_size: Option<usize>,
    /// Plugin that defines the records of the compatibility table.
    pub game_master: PluginName,
    /// Explicit source plugins per merger name. Mergers without an entry
    /// use every loaded plugin carrying one of their tags.
    pub sources: BTreeMap<String, Vec<PluginName>>,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            remove_empty_sublists: true,
            max_leveled_list_size: None,
            game_master: PluginName::new(DEFAULT_GAME_MASTER),
            sources: BTreeMap::new(),
        }
    }
}

impl MergeConfig {
    /// Parses a configuration from JSON. Missing keys take their defaults.
    pub fn from_json(json: &str) -> MergeResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Returns the explicit sources configured for a merger, if any.
    #[must_use]
    pub fn sources_for(&self, merger: &str) -> Option<&[PluginName]> {
        self.sources.get(merger).map(Vec::as_slice)
    }
}
