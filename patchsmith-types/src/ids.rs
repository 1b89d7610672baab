//! Identifier types used throughout the patch engine.
//!
//! Plugin names compare case-insensitively (ASCII), matching how the game
//! resolves data files. A [`RecordId`] pairs the plugin that first defined a
//! record with that plugin's local object id.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Name of a plugin (data file), e.g. `Oblivion.esm`.
///
/// Equality, hashing and ordering ignore ASCII case; the original spelling
/// is kept for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginName(String);

impl PluginName {
    /// Creates a plugin name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as originally spelled.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn folded(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.bytes().map(|b| b.to_ascii_lowercase())
    }
}

impl PartialEq for PluginName {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for PluginName {}

impl Hash for PluginName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for b in self.folded() {
            state.write_u8(b);
        }
        state.write_u8(0xff);
    }
}

impl PartialOrd for PluginName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PluginName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.folded().cmp(other.folded())
    }
}

impl fmt::Display for PluginName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PluginName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for PluginName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Globally unique identifier of a record (a "FormID").
///
/// Composed of the plugin that defines the record and the object id local to
/// that plugin. Immutable once assigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId {
    /// The defining plugin.
    pub plugin: PluginName,
    /// Object id local to the defining plugin (24 significant bits).
    pub object_id: u32,
}

impl RecordId {
    /// Creates a record id.
    #[must_use]
    pub fn new(plugin: impl Into<PluginName>, object_id: u32) -> Self {
        Self {
            plugin: plugin.into(),
            object_id,
        }
    }

    /// Returns true if `plugin` is the plugin that defines this record.
    #[must_use]
    pub fn is_defined_by(&self, plugin: &PluginName) -> bool {
        self.plugin == *plugin
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:06X}", self.plugin, self.object_id)
    }
}

impl FromStr for RecordId {
    type Err = crate::Error;

    /// Parses `Plugin.esp:01ABCD` (object id in hex).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (plugin, object_id) = s
            .rsplit_once(':')
            .ok_or_else(|| crate::Error::InvalidRecordId(s.to_string()))?;
        if plugin.is_empty() {
            return Err(crate::Error::InvalidRecordId(s.to_string()));
        }
        let object_id = u32::from_str_radix(object_id, 16)
            .map_err(|_| crate::Error::InvalidRecordId(s.to_string()))?;
        Ok(Self::new(plugin, object_id))
    }
}
