//! Output: the CSV dataset and optional per-package policy manifests.

use crate::error::{ErrorKind, Result};
use debsnap_index::models::PackageEntry;
use exn::{OptionExt, ResultExt};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::instrument;

/// Dataset header, written even when there are no rows.
const HEADER: [&str; 5] = ["time", "name", "version", "hash_source", "hash_binary"];

/// One CSV row, in [`HEADER`] order.
#[derive(Serialize)]
struct Row<'a> {
    time: String,
    name: &'a str,
    version: &'a str,
    hash_source: &'a str,
    hash_binary: &'a str,
}

impl<'a> From<&'a PackageEntry> for Row<'a> {
    fn from(entry: &'a PackageEntry) -> Self {
        Self {
            time: entry.timestamp.to_string(),
            name: &entry.package,
            version: &entry.version,
            hash_source: &entry.hash_source,
            hash_binary: &entry.hash_binary,
        }
    }
}

/// Per-package policy manifest.
#[derive(Serialize)]
struct Policy<'a> {
    package: &'a str,
    version: &'a str,
    threshold: u32,
    hash_source: &'a str,
    hash_binary: &'a str,
}

/// Write `entries` as CSV with a header row, replacing `path`.
///
/// Rows are streamed out as they are serialized, so a failure part-way
/// leaves the rows written so far on disk and is reported.
#[instrument(skip(entries), fields(path = %path.display(), rows = entries.len()))]
pub fn write_csv(entries: &[PackageEntry], path: &Path) -> Result<()> {
    let persistence = || ErrorKind::Persistence(path.to_path_buf());
    let file = File::create(path).or_raise(persistence)?;
    write_rows(entries, BufWriter::new(file)).or_raise(persistence)?;
    tracing::info!("Wrote dataset");
    Ok(())
}

fn write_rows<W: Write>(entries: &[PackageEntry], sink: W) -> std::result::Result<(), csv::Error> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(sink);
    writer.write_record(HEADER)?;
    for entry in entries {
        writer.serialize(Row::from(entry))?;
    }
    writer.flush()?;
    Ok(())
}

/// Write one `<root>/<package>/policy_<version>.toml` per package version,
/// returning how many were written.
///
/// When the same package version appears more than once (a rebuilt binary),
/// the last entry wins. Entries whose name or version cannot be used as a
/// path component are skipped.
#[instrument(skip(entries), fields(root = %root.display()))]
pub fn write_manifests(entries: &[PackageEntry], root: &Path, threshold: u32) -> Result<usize> {
    let mut written = 0;
    for entry in entries {
        let Some(path) = manifest_path(root, entry) else {
            tracing::warn!(package = %entry.package, version = %entry.version, "Unusable package name or version; skipping manifest");
            continue;
        };
        let policy = Policy {
            package: &entry.package,
            version: &entry.version,
            threshold,
            hash_source: &entry.hash_source,
            hash_binary: &entry.hash_binary,
        };
        write_atomic(&path, toml::to_string(&policy).or_raise(|| ErrorKind::Persistence(path.clone()))?.as_bytes())?;
        written += 1;
    }
    tracing::info!(manifests = written, "Wrote manifests");
    Ok(written)
}

fn manifest_path(root: &Path, entry: &PackageEntry) -> Option<PathBuf> {
    let usable = |part: &str| !part.is_empty() && !part.starts_with('.') && !part.contains(['/', '\\', '\0']);
    (usable(&entry.package) && usable(&entry.version))
        .then(|| root.join(&entry.package).join(format!("policy_{}.toml", entry.version)))
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let persistence = || ErrorKind::Persistence(path.to_path_buf());
    let directory = path.parent().ok_or_raise(persistence)?;
    fs::create_dir_all(directory).or_raise(persistence)?;
    let mut temp = NamedTempFile::new_in(directory).or_raise(persistence)?;
    temp.write_all(contents).or_raise(persistence)?;
    temp.persist(path).or_raise(persistence)?;
    Ok(())
}
