//! Cross-Referencer: join a snapshot's binary records onto its source records.

use crate::error::{ErrorKind, Result};
use crate::models::{PackageEntry, SnapshotResult, SnapshotStats, SourceRecord};
use crate::normalize::{Normalized, Normalizer};
use debsnap_cache::Timestamp;
use debsnap_control::Paragraph;
use std::collections::HashMap;
use tracing::instrument;

/// Join one snapshot's indexes on `(package, version)`.
///
/// The source stream is drained first into a map keyed by package name,
/// where a later stanza for the same package replaces an earlier one. Each
/// binary record is then accepted only if a source record of the same name
/// has exactly the same version string; anything else counts as a mismatch.
///
/// Unparseable stanzas are counted and skipped. Any other stream error
/// (notably [`ErrorKind::CorruptCache`]) aborts the snapshot.
#[instrument(skip_all, fields(timestamp = %timestamp))]
pub fn reconcile<S, B>(timestamp: Timestamp, normalizer: &Normalizer, sources: S, binaries: B) -> Result<SnapshotResult>
where
    S: IntoIterator<Item = Result<Paragraph>>,
    B: IntoIterator<Item = Result<Paragraph>>,
{
    let mut stats = SnapshotStats::default();
    let mut by_package: HashMap<String, SourceRecord> = HashMap::new();
    for stanza in sources {
        let Some(stanza) = accept(stanza, &mut stats)? else {
            continue;
        };
        if let Some(record) = count(normalizer.source(&stanza), &mut stats) {
            stats.sources += 1;
            by_package.insert(record.package.clone(), record);
        }
    }
    tracing::debug!(sources = stats.sources, "Found sources");

    let mut entries = Vec::new();
    for stanza in binaries {
        let Some(stanza) = accept(stanza, &mut stats)? else {
            continue;
        };
        let Some(binary) = count(normalizer.binary(&stanza), &mut stats) else {
            continue;
        };
        stats.binaries += 1;
        match by_package.get(&binary.package) {
            Some(source) if source.version == binary.version => entries.push(PackageEntry {
                timestamp,
                package: binary.package,
                version: binary.version,
                hash_source: source.hash_source.clone(),
                hash_binary: binary.hash_binary,
            }),
            _ => stats.mismatches += 1,
        }
    }
    tracing::debug!(binaries = stats.binaries, mismatches = stats.mismatches, entries = entries.len(), "Found binaries");

    Ok(SnapshotResult { timestamp, entries, stats })
}

/// Pass through good stanzas, count syntax errors, propagate anything else.
fn accept(stanza: Result<Paragraph>, stats: &mut SnapshotStats) -> Result<Option<Paragraph>> {
    match stanza {
        Ok(stanza) => Ok(Some(stanza)),
        Err(err) if matches!(*err, ErrorKind::Syntax { .. }) => {
            let kind: &ErrorKind = &err;
            tracing::trace!(error = %kind, "Skipping stanza");
            stats.malformed += 1;
            Ok(None)
        },
        Err(err) => Err(err),
    }
}

fn count<T>(normalized: Normalized<T>, stats: &mut SnapshotStats) -> Option<T> {
    match normalized {
        Normalized::Record(record) => Some(record),
        Normalized::Filtered => {
            stats.filtered += 1;
            None
        },
        Normalized::Malformed => {
            stats.malformed += 1;
            None
        },
    }
}
