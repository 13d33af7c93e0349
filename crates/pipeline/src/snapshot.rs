use crate::Pipeline;
use crate::error::{ErrorKind, Result};
use debsnap_cache::{IndexKind, SnapshotRef};
use debsnap_index::error::ErrorKind as IndexErrorKind;
use debsnap_index::models::SnapshotResult;
use exn::ResultExt;
use tracing::instrument;

impl Pipeline {
    /// Fetch (or reuse) both indexes of one snapshot and cross-reference them.
    ///
    /// If an index turns out to be corrupt while it is being decoded, it is
    /// purged from the cache and the snapshot is attempted once more.
    #[instrument(skip_all, fields(timestamp = %snapshot.timestamp))]
    pub fn process(&self, snapshot: &SnapshotRef) -> Result<SnapshotResult> {
        let failed = || ErrorKind::Snapshot(snapshot.timestamp);
        let mut refetched = false;
        loop {
            let source = self.store.fetch(snapshot, IndexKind::Source).or_raise(failed)?;
            let binary = self.store.fetch(snapshot, IndexKind::Binary).or_raise(failed)?;
            let err = match debsnap_index::process(snapshot.timestamp, &self.normalizer, &source, &binary) {
                Ok(result) => return Ok(result),
                Err(err) => err,
            };
            let corrupt = match &*err {
                IndexErrorKind::CorruptCache(path) => [&source, &binary].into_iter().find(|file| &file.local_path == path),
                _ => None,
            };
            match corrupt {
                Some(file) if !refetched => {
                    tracing::warn!(path = %file.local_path.display(), "Index corrupt while decoding; fetching again");
                    self.store.invalidate(file).or_raise(failed)?;
                    refetched = true;
                },
                _ => return Err(err.raise(failed())),
            }
        }
    }
}
