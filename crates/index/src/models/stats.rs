use std::fmt::{Display, Formatter, Result as FmtResult};
use std::ops::AddAssign;

/// Counters for one snapshot, or (summed) for a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotStats {
    /// Source records found.
    pub sources: usize,
    /// Binary records found.
    pub binaries: usize,
    /// Binary records with no source of the same name and version.
    pub mismatches: usize,
    /// Stanzas skipped because of the package allow-list.
    pub filtered: usize,
    /// Stanzas that could not be parsed or lacked a required field.
    pub malformed: usize,
}

impl AddAssign for SnapshotStats {
    fn add_assign(&mut self, other: Self) {
        self.sources += other.sources;
        self.binaries += other.binaries;
        self.mismatches += other.mismatches;
        self.filtered += other.filtered;
        self.malformed += other.malformed;
    }
}

impl Display for SnapshotStats {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "{} sources, {} binaries, {} mismatches ({} filtered, {} malformed)",
            self.sources, self.binaries, self.mismatches, self.filtered, self.malformed
        )
    }
}
