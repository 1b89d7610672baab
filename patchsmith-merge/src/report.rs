//! Human-readable merge reports.

use patchsmith_types::PluginName;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Accepts report lines in order.
pub trait ReportSink {
    fn line(&mut self, line: &str);
}

impl ReportSink for Vec<String> {
    fn line(&mut self, line: &str) {
        self.push(line.to_string());
    }
}

/// A titled block of report lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportSection {
    pub header: String,
    pub lines: Vec<String>,
}

/// What one merger did during a build pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub merger: String,
    /// Records rewritten and kept.
    pub changed: usize,
    /// Changed records counted by the plugin that defines them.
    pub per_plugin: BTreeMap<PluginName, usize>,
    pub sections: Vec<ReportSection>,
    /// Records skipped because they lacked the merged field.
    pub schema_mismatches: usize,
    /// Declared masters whose data was not available.
    pub missing_masters: BTreeSet<PluginName>,
}

impl MergeReport {
    #[must_use]
    pub fn new(merger: impl Into<String>) -> Self {
        Self {
            merger: merger.into(),
            ..Self::default()
        }
    }

    /// Counts one changed record against its defining plugin.
    pub fn count_change(&mut self, plugin: &PluginName) {
        self.changed += 1;
        *self.per_plugin.entry(plugin.clone()).or_insert(0) += 1;
    }

    /// Appends a section and returns it for filling.
    pub fn section(&mut self, header: impl Into<String>) -> &mut ReportSection {
        self.sections.push(ReportSection {
            header: header.into(),
            lines: Vec::new(),
        });
        let last = self.sections.len() - 1;
        &mut self.sections[last]
    }

    /// Returns the section with the given header.
    #[must_use]
    pub fn find_section(&self, header: &str) -> Option<&ReportSection> {
        self.sections.iter().find(|s| s.header == header)
    }

    /// Appends the `label: N` section listing changed records per plugin.
    pub fn push_counts(&mut self, label: &str) {
        let lines = self
            .per_plugin
            .iter()
            .map(|(plugin, count)| format!("* {plugin}: {count}"))
            .collect();
        self.sections.push(ReportSection {
            header: format!("{label}: {}", self.changed),
            lines,
        });
    }

    /// Renders the report as text lines.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        let mut out = vec![format!("= {}", self.merger)];
        for section in &self.sections {
            out.push(format!("=== {}", section.header));
            out.extend(section.lines.iter().cloned());
        }
        if self.schema_mismatches > 0 {
            out.push("=== Schema Mismatches".to_string());
            out.push(format!(
                "* {} record(s) lacked the merged field and were skipped",
                self.schema_mismatches
            ));
        }
        if !self.missing_masters.is_empty() {
            out.push("=== Missing Masters".to_string());
            out.extend(self.missing_masters.iter().map(|m| format!("* {m}")));
        }
        out
    }

    pub fn write_to(&self, sink: &mut dyn ReportSink) {
        for line in self.lines() {
            sink.line(&line);
        }
    }
}
