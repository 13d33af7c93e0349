//! Snapshot and cache models shared by every stage of the pipeline.

use crate::error::{Error, ErrorKind, Result};
use debsnap_compress::{Compression, MAGIC_BYTES_LEN};
use exn::ResultExt;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, PrimitiveDateTime, Time};

/// Timestamp format used by the snapshot archive in its URLs.
const SNAPSHOT_FORMAT: &[BorrowedFormatItem<'_>] = format_description!("[year][month][day]T[hour][minute][second]Z");
/// Compact format used in the output dataset and cache keys.
const COMPACT_FORMAT: &[BorrowedFormatItem<'_>] = format_description!("[year][month][day][hour][minute][second]");

/// A snapshot instant (UTC, second precision).
///
/// Parses both the archive's `20170101T034501Z` form and the compact
/// `20170101034501` form; always displays as the compact form.
///
/// ```
/// use debsnap_cache::Timestamp;
///
/// let timestamp: Timestamp = "20170101T034501Z".parse().unwrap();
/// assert_eq!(timestamp.to_string(), "20170101034501");
/// assert_eq!(timestamp, "20170101034501".parse().unwrap());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(PrimitiveDateTime);

impl Timestamp {
    pub fn new(datetime: PrimitiveDateTime) -> Self {
        Self(datetime)
    }

    /// Midnight at the start of `date`.
    pub fn start_of(date: Date) -> Self {
        Self(date.with_time(Time::MIDNIGHT))
    }

    /// Last second of `date`.
    pub fn end_of(date: Date) -> Self {
        Self(date.with_time(time::macros::time!(23:59:59)))
    }

    pub fn datetime(&self) -> PrimitiveDateTime {
        self.0
    }

    pub fn date(&self) -> Date {
        self.0.date()
    }

    /// The archive's own spelling, as used in snapshot URLs.
    pub fn to_snapshot_string(&self) -> String {
        self.0.format(SNAPSHOT_FORMAT).unwrap_or_default()
    }
}

impl FromStr for Timestamp {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().trim_end_matches('/');
        PrimitiveDateTime::parse(s, SNAPSHOT_FORMAT)
            .or_else(|_| PrimitiveDateTime::parse(s, COMPACT_FORMAT))
            .map(Self)
            .or_raise(|| ErrorKind::InvalidKey(format!("not a snapshot timestamp: {s}")))
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let formatted = self.0.format(COMPACT_FORMAT).map_err(|_| std::fmt::Error)?;
        f.write_str(&formatted)
    }
}

/// Which of a snapshot's two index documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKind {
    Source,
    Binary,
}

impl IndexKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Binary => "binary",
        }
    }
}

impl Display for IndexKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// One discovered snapshot and the locations of its two indexes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotRef {
    pub timestamp: Timestamp,
    pub source_url: String,
    pub binary_url: String,
}

impl SnapshotRef {
    pub fn new(timestamp: Timestamp, source_url: impl Into<String>, binary_url: impl Into<String>) -> Self {
        Self {
            timestamp,
            source_url: source_url.into(),
            binary_url: binary_url.into(),
        }
    }

    pub fn url(&self, kind: IndexKind) -> &str {
        match kind {
            IndexKind::Source => &self.source_url,
            IndexKind::Binary => &self.binary_url,
        }
    }
}

/// A raw, compressed index file present in the local cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawIndexFile {
    /// Path relative to the cache root.
    pub cache_key: PathBuf,
    /// Absolute path on disk.
    pub local_path: PathBuf,
    pub kind: IndexKind,
}

impl RawIndexFile {
    /// Compression declared by the file name, falling back to the file's
    /// magic bytes when the name carries no known extension.
    pub fn compression(&self) -> Result<Compression> {
        detect_compression(&self.local_path, Compression::from_path(&self.cache_key))
    }
}

pub(crate) fn detect_compression(path: &Path, declared: Compression) -> Result<Compression> {
    if declared != Compression::None {
        return Ok(declared);
    }
    let file = File::open(path).map_err(|e| ErrorKind::map_io_error(e, path))?;
    let mut head = Vec::with_capacity(MAGIC_BYTES_LEN);
    file.take(MAGIC_BYTES_LEN as u64).read_to_end(&mut head).map_err(ErrorKind::Io)?;
    Ok(Compression::from_magic_bytes(&head))
}
