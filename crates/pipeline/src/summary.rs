use debsnap_index::models::{PackageEntry, SnapshotStats};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Totals for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Snapshots processed successfully.
    pub snapshots: usize,
    /// Snapshots skipped after a failure.
    pub failed: usize,
    /// Rows in the final, deduplicated output.
    pub entries: usize,
    /// Per-snapshot counters, summed.
    pub totals: SnapshotStats,
}

impl Display for RunSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "{} snapshots ({} failed), {} entries; {}",
            self.snapshots, self.failed, self.entries, self.totals
        )
    }
}

/// The outcome of [`Pipeline::run`](crate::Pipeline::run): entries ordered by
/// timestamp, deduplicated by the configured identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Run {
    pub entries: Vec<PackageEntry>,
    pub summary: RunSummary,
}
