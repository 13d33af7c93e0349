use super::SnapshotStats;
use debsnap_cache::Timestamp;

/// A binary package joined with its source package on `(package, version)`.
///
/// Both hashes are always present; stanzas missing either never make it
/// this far.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageEntry {
    pub timestamp: Timestamp,
    pub package: String,
    pub version: String,
    pub hash_source: String,
    pub hash_binary: String,
}

/// Everything one snapshot contributed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotResult {
    pub timestamp: Timestamp,
    /// In binary index order.
    pub entries: Vec<PackageEntry>,
    pub stats: SnapshotStats,
}
