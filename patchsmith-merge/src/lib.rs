//! Record mergers for patchsmith.
//!
//! Three strategies reconcile the overrides that plugins make to the same
//! record, each gated by the tags applied to the contributing plugin:
//!
//! - [`DeltaMerger`]: add/change/remove deltas on keyed lists
//!   (inventories, outfits, faction relations)
//! - [`OrderedListMerger`]: order-preserving merge of spell and AI package
//!   lists, with permanent deletions unless force-added
//! - [`LeveledListMerger`]: relevel/delevel merge of leveled and FormID
//!   lists, plus pruning of empty sublists
//!
//! Every strategy implements [`MergeStrategy`]: an initialize step, a scan
//! pass over every plugin in load order, and a build pass over the patch.
//! [`PatchBuilder`] runs them one after another; nothing here is shared
//! between threads or kept across builds.

mod compat;
mod config;
mod delta;
mod engine;
mod error;
mod leveled;
mod ordered;
mod report;
mod strategy;

pub use compat::{OVERHAUL_SKIP_IDS, UNOFFICIAL_PATCH, overhaul_compat_active, overhaul_skips};
pub use config::{DEFAULT_GAME_MASTER, MergeConfig};
pub use delta::{Delta, DeltaMerger, DeltaTags, Permissions, apply_delta, apply_deltas, compute_delta};
pub use engine::{PatchBuilder, PatchSummary, validate_tags};
pub use error::{MergeError, MergeResult};
pub use leveled::{
    Contribution, IntoFieldValue, LeveledListMerger, MergeableList, PruneOutcome, StoredList,
    list_label, prune_empty_sublists,
};
pub use ordered::{MergeAccumulator, OrderedListMerger, OutputOrder, deleted_entries};
pub use report::{MergeReport, ReportSection, ReportSink};
pub use strategy::{Activation, MergeStrategy, PatchContext};
