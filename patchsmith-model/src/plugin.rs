//! Plugin metadata: declared masters, applied tags and the load order.

use crate::{ModelError, ModelResult};
use patchsmith_types::{PluginName, Tag, TagSet};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// A plugin as the patch engine sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plugin {
    pub name: PluginName,
    /// Direct masters, in declared order.
    #[serde(default)]
    pub masters: Vec<PluginName>,
    #[serde(default)]
    pub tags: TagSet,
}

impl Plugin {
    /// Creates a plugin with no masters and no tags.
    #[must_use]
    pub fn new(name: impl Into<PluginName>) -> Self {
        Self {
            name: name.into(),
            masters: Vec::new(),
            tags: TagSet::new(),
        }
    }

    /// Sets the declared masters (builder style).
    #[must_use]
    pub fn with_masters<I, N>(mut self, masters: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<PluginName>,
    {
        self.masters = masters.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the applied tags (builder style).
    #[must_use]
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.tags = tags.into_iter().collect();
        self
    }
}

/// The ordered set of active plugins.
///
/// Load order is a strict total order: a plugin appears at most once, and
/// its position is the sole arbitration authority when no tag says
/// otherwise.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<Plugin>", into = "Vec<Plugin>")]
pub struct LoadOrder {
    plugins: Vec<Plugin>,
    index: HashMap<PluginName, usize>,
}

impl LoadOrder {
    /// Builds a load order, rejecting duplicate plugin names.
    pub fn new(plugins: Vec<Plugin>) -> ModelResult<Self> {
        let mut index = HashMap::with_capacity(plugins.len());
        for (position, plugin) in plugins.iter().enumerate() {
            if index.insert(plugin.name.clone(), position).is_some() {
                return Err(ModelError::DuplicatePlugin(plugin.name.clone()));
            }
        }
        Ok(Self { plugins, index })
    }

    /// Parses a load order from its JSON form (an array of plugins).
    pub fn from_json(json: &str) -> ModelResult<Self> {
        let plugins: Vec<Plugin> = serde_json::from_str(json)?;
        Self::new(plugins)
    }

    /// Returns the number of plugins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns true if no plugin is loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Iterates plugins in load order.
    pub fn iter(&self) -> impl Iterator<Item = &Plugin> {
        self.plugins.iter()
    }

    /// Returns the plugin with the given name.
    #[must_use]
    pub fn get(&self, name: &PluginName) -> Option<&Plugin> {
        self.index.get(name).map(|&i| &self.plugins[i])
    }

    /// Returns the load-order position of a plugin.
    #[must_use]
    pub fn position(&self, name: &PluginName) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Returns true if the plugin is loaded.
    #[must_use]
    pub fn contains(&self, name: &PluginName) -> bool {
        self.index.contains_key(name)
    }

    /// Returns the declared masters of a plugin (empty if not loaded).
    #[must_use]
    pub fn masters_of(&self, name: &PluginName) -> &[PluginName] {
        self.get(name)
            .map(|p| p.masters.as_slice())
            .unwrap_or(&[])
    }

    /// Returns the tags applied to a plugin.
    #[must_use]
    pub fn tags_of(&self, name: &PluginName) -> Option<&TagSet> {
        self.get(name).map(|p| &p.tags)
    }

    /// Collects every master reachable from `name` through declared masters.
    ///
    /// Masters that are not loaded still appear in the result, but their own
    /// masters are unknown and cannot be followed.
    #[must_use]
    pub fn recursive_masters(&self, name: &PluginName) -> BTreeSet<PluginName> {
        let mut found = BTreeSet::new();
        let mut pending: Vec<&PluginName> = self.masters_of(name).iter().collect();
        while let Some(master) = pending.pop() {
            if master != name && found.insert(master.clone()) {
                pending.extend(self.masters_of(master));
            }
        }
        found
    }

    /// Returns, in load order, the plugins carrying any of `tags`.
    #[must_use]
    pub fn tagged_with(&self, tags: &[Tag]) -> Vec<PluginName> {
        self.plugins
            .iter()
            .filter(|p| p.tags.contains_any(tags))
            .map(|p| p.name.clone())
            .collect()
    }
}

impl TryFrom<Vec<Plugin>> for LoadOrder {
    type Error = ModelError;

    fn try_from(plugins: Vec<Plugin>) -> Result<Self, Self::Error> {
        Self::new(plugins)
    }
}

impl From<LoadOrder> for Vec<Plugin> {
    fn from(order: LoadOrder) -> Self {
        order.plugins
    }
}
