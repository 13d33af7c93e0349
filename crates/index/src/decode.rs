//! Index Decoder: cached raw file to a lazy stream of stanzas.

use crate::error::{ErrorKind, Result};
use debsnap_cache::RawIndexFile;
use debsnap_control::error::ErrorKind as ControlErrorKind;
use debsnap_control::{Paragraph, Paragraphs};
use exn::ResultExt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::PathBuf;
use tracing::instrument;

/// Decompressed stanzas of one index file, parsed as they are read.
///
/// A decompression failure anywhere in the stream is reported once as
/// [`ErrorKind::CorruptCache`] and ends the iteration; an unparseable
/// paragraph is reported as [`ErrorKind::Syntax`] and iteration carries on.
pub struct Stanzas {
    paragraphs: Paragraphs<BufReader<Box<dyn Read>>>,
    path: PathBuf,
}

impl Iterator for Stanzas {
    type Item = Result<Paragraph>;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.paragraphs.next()?;
        Some(next.map_err(|err| {
            let kind = match &*err {
                ControlErrorKind::Read => ErrorKind::CorruptCache(self.path.clone()),
                ControlErrorKind::Syntax { line } => ErrorKind::Syntax { line: *line },
            };
            err.raise(kind)
        }))
    }
}

/// Open a cached index for streaming.
///
/// Every call starts again from the beginning of the file; nothing is
/// decompressed until the returned iterator is advanced.
#[instrument(skip_all, fields(path = %file.local_path.display(), format))]
pub fn open(file: &RawIndexFile) -> Result<Stanzas> {
    let path = file.local_path.clone();
    let compression = file.compression().or_raise(|| ErrorKind::Io(path.clone()))?;
    tracing::Span::current().record("format", compression.as_str());
    let raw = File::open(&path).or_raise(|| ErrorKind::Io(path.clone()))?;
    Ok(Stanzas {
        paragraphs: Paragraphs::new(BufReader::new(compression.wrap_reader(raw))),
        path,
    })
}
