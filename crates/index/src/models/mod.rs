mod entry;
mod record;
mod stats;

pub use self::entry::{PackageEntry, SnapshotResult};
pub use self::record::{BinaryRecord, SourceRecord};
pub use self::stats::SnapshotStats;
