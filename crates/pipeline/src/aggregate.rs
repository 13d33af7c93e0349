//! Merging of per-snapshot entries into the final, ordered record set.

use debsnap_config::Identity;
use debsnap_index::models::PackageEntry;
use std::collections::HashSet;

#[derive(PartialEq, Eq, Hash)]
enum Key<'a> {
    PackageVersionBinary(&'a str, &'a str, &'a str),
    SourceHash(&'a str),
}

impl<'a> Key<'a> {
    fn of(entry: &'a PackageEntry, identity: Identity) -> Self {
        match identity {
            Identity::PackageVersionBinary => Self::PackageVersionBinary(&entry.package, &entry.version, &entry.hash_binary),
            Identity::SourceHash => Self::SourceHash(&entry.hash_source),
        }
    }
}

/// Sort entries by timestamp and keep the earliest entry per `identity`.
///
/// The sort is stable, so entries sharing a timestamp keep the order they
/// were given in; the output only depends on the input, never on which
/// worker finished first.
pub fn merge(mut entries: Vec<PackageEntry>, identity: Identity) -> Vec<PackageEntry> {
    entries.sort_by_key(|entry| entry.timestamp);
    let keep: Vec<bool> = {
        let mut seen = HashSet::with_capacity(entries.len());
        entries.iter().map(|entry| seen.insert(Key::of(entry, identity))).collect()
    };
    let before = entries.len();
    let merged: Vec<_> = entries.into_iter().zip(keep).filter_map(|(entry, keep)| keep.then_some(entry)).collect();
    tracing::debug!(before, after = merged.len(), ?identity, "Deduplicated entries");
    merged
}
