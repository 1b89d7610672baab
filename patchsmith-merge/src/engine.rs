//! Sequential patch engine.
//!
//! [`PatchBuilder`] owns the configured strategies and drives one build:
//! tag validation, initialization, one scan pass over the load order shared
//! by every active strategy, then each strategy's build pass in turn.

use crate::config::MergeConfig;
use crate::delta::DeltaMerger;
use crate::leveled::LeveledListMerger;
use crate::ordered::OrderedListMerger;
use crate::report::{MergeReport, ReportSink};
use crate::strategy::{MergeStrategy, PatchContext};
use crate::{MergeError, MergeResult};
use patchsmith_model::{LoadOrder, PatchFile, RecordSource, RecordStore};
use patchsmith_types::{PluginName, RecordId};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Result of one patch build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchSummary {
    /// One report per active strategy, in build order.
    pub reports: Vec<MergeReport>,
    /// Records that must be written to the patch.
    pub kept: BTreeSet<RecordId>,
    /// Loaded plugins whose records were not available.
    pub unavailable_plugins: Vec<PluginName>,
}

impl PatchSummary {
    /// Returns the report of a strategy.
    #[must_use]
    pub fn report(&self, merger: &str) -> Option<&MergeReport> {
        self.reports.iter().find(|r| r.merger == merger)
    }

    /// Writes every report, in build order.
    pub fn write_to(&self, sink: &mut dyn ReportSink) {
        for report in &self.reports {
            report.write_to(sink);
        }
        if !self.unavailable_plugins.is_empty() {
            sink.line("=== Unavailable Plugins");
            for plugin in &self.unavailable_plugins {
                sink.line(&format!("* {plugin}"));
            }
        }
    }
}

/// Refuses load orders with contradictory tags.
pub fn validate_tags(load_order: &LoadOrder) -> MergeResult<()> {
    for plugin in load_order.iter() {
        if let Some(violation) = plugin.tags.violations().into_iter().next() {
            return Err(MergeError::TagContradiction {
                plugin: plugin.name.clone(),
                tag: violation.tag,
                requires: violation.requires,
            });
        }
    }
    Ok(())
}

/// Runs merge strategies over a load order.
pub struct PatchBuilder {
    config: MergeConfig,
    strategies: Vec<Box<dyn MergeStrategy>>,
}

impl PatchBuilder {
    /// Creates a builder with no strategies.
    #[must_use]
    pub fn new(config: MergeConfig) -> Self {
        Self {
            config,
            strategies: Vec::new(),
        }
    }

    /// Creates a builder with every built-in merger.
    #[must_use]
    pub fn with_default_mergers(config: MergeConfig) -> Self {
        let mut builder = Self::new(config);
        builder
            .add_strategy(Box::new(DeltaMerger::inventory()))
            .add_strategy(Box::new(DeltaMerger::outfits()))
            .add_strategy(Box::new(DeltaMerger::relations()))
            .add_strategy(Box::new(OrderedListMerger::spells()))
            .add_strategy(Box::new(OrderedListMerger::ai_packages()))
            .add_strategy(Box::new(LeveledListMerger::leveled_lists()))
            .add_strategy(Box::new(LeveledListMerger::form_id_lists()));
        builder
    }

    /// Appends a strategy. Strategies build in the order they were added.
    pub fn add_strategy(&mut self, strategy: Box<dyn MergeStrategy>) -> &mut Self {
        self.strategies.push(strategy);
        self
    }

    #[must_use]
    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Names of the registered strategies, in build order.
    pub fn strategy_names(&self) -> impl Iterator<Item = &str> {
        self.strategies.iter().map(|s| s.name())
    }

    /// Builds into an existing record store.
    pub fn build(
        &mut self,
        load_order: &LoadOrder,
        source: &dyn RecordSource,
        patch: &mut dyn RecordStore,
    ) -> MergeResult<PatchSummary> {
        self.build_with_checkpoint(load_order, source, patch, |_| true)
    }

    /// Builds a fresh [`PatchFile`] with the kept records marked.
    pub fn build_patch(
        &mut self,
        load_order: &LoadOrder,
        source: &dyn RecordSource,
    ) -> MergeResult<(PatchFile, PatchSummary)> {
        let mut patch = PatchFile::new();
        let summary = self.build(load_order, source, &mut patch)?;
        for id in &summary.kept {
            patch.keep(id.clone());
        }
        Ok((patch, summary))
    }

    /// Like [`build`](Self::build), consulting `checkpoint` after each
    /// plugin is scanned. Returning `false` aborts before any record is
    /// built or kept.
    pub fn build_with_checkpoint<F>(
        &mut self,
        load_order: &LoadOrder,
        source: &dyn RecordSource,
        patch: &mut dyn RecordStore,
        mut checkpoint: F,
    ) -> MergeResult<PatchSummary>
    where
        F: FnMut(&PluginName) -> bool,
    {
        validate_tags(load_order)?;

        let ctx = PatchContext {
            load_order,
            records: source,
            config: &self.config,
        };

        let mut active = Vec::new();
        for (index, strategy) in self.strategies.iter_mut().enumerate() {
            let sources = match self.config.sources_for(strategy.name()) {
                Some(explicit) => explicit.to_vec(),
                None => load_order.tagged_with(strategy.source_tags()),
            };
            let activation = strategy.initialize(&sources, &ctx)?;
            if activation.is_active() {
                info!(merger = strategy.name(), sources = sources.len(), "merger active");
                active.push(index);
            } else {
                debug!(merger = strategy.name(), ?activation, "merger inactive");
            }
        }

        let mut summary = PatchSummary::default();
        for plugin in load_order.iter() {
            match source.records(&plugin.name) {
                Some(records) => {
                    for &index in &active {
                        self.strategies[index].scan(plugin, records);
                    }
                    debug!(plugin = %plugin.name, records = records.len(), "plugin scanned");
                }
                None => {
                    warn!(plugin = %plugin.name, "plugin records unavailable");
                    summary.unavailable_plugins.push(plugin.name.clone());
                }
            }
            if !checkpoint(&plugin.name) {
                for strategy in &mut self.strategies {
                    strategy.reset();
                }
                info!(plugin = %plugin.name, "patch build aborted");
                return Err(MergeError::Aborted(plugin.name.clone()));
            }
        }

        let mut kept = BTreeSet::new();
        for &index in &active {
            let strategy = &mut self.strategies[index];
            let report = strategy.build(patch, &mut |id: &RecordId| {
                kept.insert(id.clone());
            });
            strategy.reset();
            summary.reports.push(report);
        }
        summary.kept = kept;
        info!(
            mergers = active.len(),
            kept = summary.kept.len(),
            "patch build complete"
        );
        Ok(summary)
    }
}
