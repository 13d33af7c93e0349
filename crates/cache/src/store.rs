use crate::error::{ErrorKind, Result};
use crate::models::detect_compression;
use crate::path::validate as validate_path;
use crate::{IndexKind, RawIndexFile, RetryPolicy, SnapshotRef, TransportHandle};
use debsnap_compress::Compression;
use exn::{OptionExt, ResultExt};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::instrument;

/// Maps `(snapshot, index kind)` to a verified local copy of the raw index.
///
/// - A missing file is downloaded through the [`Transport`](crate::Transport)
///   into a temporary file next to its final location, verified, and only
///   then renamed into place. The cache never shows a half-written file under
///   its final name.
/// - Transient network failures are retried according to the
///   [`RetryPolicy`].
/// - A cached file that fails to decompress is deleted and fetched again. A
///   download that fails to decompress is fetched again up to
///   `max_corrupt_refetch` times, after which
///   [`CorruptCache`](ErrorKind::CorruptCache) is returned.
///
/// Keys are unique per timestamp and kind, so workers handling different
/// snapshots never touch the same path.
pub struct CacheStore {
    root: PathBuf,
    transport: TransportHandle,
    retry: RetryPolicy,
    max_corrupt_refetch: u32,
}

impl CacheStore {
    /// Open (creating if needed) a cache rooted at `root`.
    pub fn new(root: impl AsRef<Path>, transport: TransportHandle, retry: RetryPolicy) -> Result<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root).map_err(|e| ErrorKind::map_io_error(e, root))?;
        let root = fs::canonicalize(root).map_err(|e| ErrorKind::map_io_error(e, root))?;
        Ok(Self {
            root,
            transport,
            retry,
            max_corrupt_refetch: 1,
        })
    }

    pub fn with_max_corrupt_refetch(mut self, max_corrupt_refetch: u32) -> Self {
        self.max_corrupt_refetch = max_corrupt_refetch;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic cache key: `<timestamp>/<kind>_<file name from URL>`.
    ///
    /// ```
    /// use debsnap_cache::{CacheStore, IndexKind, SnapshotRef};
    /// use std::path::Path;
    ///
    /// let snapshot = SnapshotRef::new(
    ///     "20170101T034501Z".parse().unwrap(),
    ///     "http://snapshot.debian.org/archive/debian/20170101T034501Z/dists/stretch/main/source/Sources.xz",
    ///     "http://snapshot.debian.org/archive/debian/20170101T034501Z/dists/stretch/main/binary-amd64/Packages.xz",
    /// );
    /// let key = CacheStore::key(&snapshot, IndexKind::Binary).unwrap();
    /// assert_eq!(key, Path::new("20170101034501/binary_Packages.xz"));
    /// ```
    pub fn key(snapshot: &SnapshotRef, kind: IndexKind) -> Result<PathBuf> {
        let url = snapshot.url(kind);
        let parsed = reqwest::Url::parse(url).or_raise(|| ErrorKind::InvalidKey(url.to_string()))?;
        let filename = parsed
            .path_segments()
            .and_then(|segments| segments.filter(|segment| !segment.is_empty()).last())
            .ok_or_raise(|| ErrorKind::InvalidKey(url.to_string()))?;
        validate_path(format!("{}/{}_{}", snapshot.timestamp, kind, filename))
    }

    /// Return a verified local copy of the snapshot's `kind` index,
    /// downloading it if necessary.
    #[instrument(skip_all, fields(timestamp = %snapshot.timestamp, kind = %kind))]
    pub fn fetch(&self, snapshot: &SnapshotRef, kind: IndexKind) -> Result<RawIndexFile> {
        let cache_key = Self::key(snapshot, kind)?;
        let file = RawIndexFile {
            local_path: self.root.join(&cache_key),
            cache_key,
            kind,
        };
        let declared = Compression::from_path(&file.cache_key);

        if file.local_path.is_file() {
            match Self::verify(&file.local_path, declared) {
                Ok(()) => {
                    tracing::debug!(path = %file.local_path.display(), "Cache hit");
                    return Ok(file);
                },
                Err(err) => {
                    let kind: &ErrorKind = &err;
                    tracing::warn!(path = %file.local_path.display(), error = %kind, "Cached index is corrupt; purging");
                    self.invalidate(&file)?;
                },
            }
        }

        let directory = file.local_path.parent().unwrap_or(&self.root);
        fs::create_dir_all(directory).map_err(|e| ErrorKind::map_io_error(e, directory))?;
        let url = snapshot.url(kind);
        let mut refetches = 0;
        loop {
            let temp = self.download(url, directory)?;
            match Self::verify(temp.path(), declared) {
                Ok(()) => {
                    temp.persist(&file.local_path).map_err(|e| ErrorKind::map_io_error(e.error, &file.local_path))?;
                    tracing::info!(url, path = %file.local_path.display(), "Cached index");
                    return Ok(file);
                },
                Err(_) if refetches < self.max_corrupt_refetch => {
                    refetches += 1;
                    tracing::warn!(url, refetches, "Downloaded index is corrupt; fetching again");
                },
                Err(err) => return Err(err),
            }
        }
    }

    /// Delete a cached file so that the next [`fetch`](Self::fetch)
    /// downloads it again. Deleting a file that is already gone is fine.
    pub fn invalidate(&self, file: &RawIndexFile) -> Result<()> {
        match fs::remove_file(&file.local_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => exn::bail!(ErrorKind::map_io_error(e, &file.local_path)),
        }
    }

    /// Structural check: the whole file must decompress cleanly.
    fn verify(path: &Path, declared: Compression) -> Result<()> {
        let compression = detect_compression(path, declared)?;
        let reader = BufReader::new(File::open(path).map_err(|e| ErrorKind::map_io_error(e, path))?);
        compression.verify(reader).or_raise(|| ErrorKind::CorruptCache(path.to_path_buf()))?;
        Ok(())
    }

    /// Download `url` into a temporary file inside `directory`. A failed
    /// attempt drops (and thereby deletes) its temporary file.
    fn download(&self, url: &str, directory: &Path) -> Result<NamedTempFile> {
        self.retry.run(url, |attempt| {
            let mut temp = NamedTempFile::new_in(directory).map_err(|e| ErrorKind::map_io_error(e, directory))?;
            let bytes = {
                let mut writer = BufWriter::new(temp.as_file_mut());
                let bytes = self.transport.get(url, &mut writer)?;
                writer.flush().map_err(ErrorKind::Io)?;
                bytes
            };
            tracing::debug!(url, attempt, bytes, "Downloaded");
            Ok(temp)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MockResponse, MockTransport};
    use rstest::rstest;
    use std::sync::Arc;
    use tempfile::TempDir;

    const SOURCE_URL: &str = "http://archive/20170101T000000Z/dists/stretch/main/source/Sources.xz";
    const BINARY_URL: &str = "http://archive/20170101T000000Z/dists/stretch/main/binary-amd64/Packages.xz";

    fn snapshot() -> SnapshotRef {
        SnapshotRef::new("20170101T000000Z".parse().unwrap(), SOURCE_URL, BINARY_URL)
    }

    fn index() -> Vec<u8> {
        Compression::Xz.compress(b"Package: zlib\nVersion: 1:1.2.11\n").unwrap()
    }

    fn store(dir: &TempDir, transport: &Arc<MockTransport>) -> CacheStore {
        CacheStore::new(dir.path().join("cache"), transport.clone(), RetryPolicy::immediate(5)).unwrap()
    }

    fn cached_files(store: &CacheStore) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = fs::read_dir(store.root().join("20170101000000"))
            .map(|entries| entries.map(|entry| entry.unwrap().path()).collect())
            .unwrap_or_default();
        files.sort();
        files
    }

    #[test]
    fn downloads_on_miss_then_hits_cache() {
        let dir = TempDir::new().unwrap();
        let transport = Arc::new(MockTransport::default().with_body(SOURCE_URL, index()));
        let store = store(&dir, &transport);

        let first = store.fetch(&snapshot(), IndexKind::Source).unwrap();
        assert_eq!(first.cache_key, Path::new("20170101000000/source_Sources.xz"));
        assert_eq!(fs::read(&first.local_path).unwrap(), index());
        let second = store.fetch(&snapshot(), IndexKind::Source).unwrap();
        assert_eq!(first, second);
        assert_eq!(transport.requests(SOURCE_URL), 1);
    }

    #[test]
    fn kinds_do_not_share_entries() {
        let dir = TempDir::new().unwrap();
        let transport = Arc::new(MockTransport::default().with_body(SOURCE_URL, index()).with_body(BINARY_URL, index()));
        let store = store(&dir, &transport);
        let source = store.fetch(&snapshot(), IndexKind::Source).unwrap();
        let binary = store.fetch(&snapshot(), IndexKind::Binary).unwrap();
        assert_ne!(source.local_path, binary.local_path);
        assert_eq!(cached_files(&store).len(), 2);
    }

    #[test]
    fn transient_failures_are_retried() {
        let dir = TempDir::new().unwrap();
        let responses = [
            MockResponse::Status(503),
            MockResponse::Disconnect,
            MockResponse::Status(429),
            MockResponse::Body(index()),
        ];
        let transport = Arc::new(MockTransport::default().with_responses(SOURCE_URL, responses));
        let store = store(&dir, &transport);
        store.fetch(&snapshot(), IndexKind::Source).unwrap();
        assert_eq!(transport.requests(SOURCE_URL), 4);
    }

    #[test]
    fn missing_index_is_not_retried() {
        let dir = TempDir::new().unwrap();
        let transport = Arc::new(MockTransport::default());
        let store = store(&dir, &transport);
        let err = store.fetch(&snapshot(), IndexKind::Source).unwrap_err();
        assert!(matches!(*err, ErrorKind::Status(404)));
        assert_eq!(transport.requests(SOURCE_URL), 1);
    }

    #[test]
    fn retry_budget_is_bounded() {
        let dir = TempDir::new().unwrap();
        let transport = Arc::new(MockTransport::default().with_responses(SOURCE_URL, [MockResponse::Status(502)]));
        let store = store(&dir, &transport);
        let err = store.fetch(&snapshot(), IndexKind::Source).unwrap_err();
        assert!(matches!(*err, ErrorKind::RetriesExhausted { attempts: 5 }));
        assert_eq!(transport.requests(SOURCE_URL), 5);
    }

    #[test]
    fn partial_downloads_are_never_published() {
        let dir = TempDir::new().unwrap();
        let partial = index()[..8].to_vec();
        let transport = Arc::new(MockTransport::default().with_responses(SOURCE_URL, [MockResponse::Truncated(partial)]));
        let store = store(&dir, &transport);
        assert!(store.fetch(&snapshot(), IndexKind::Source).is_err());
        assert!(cached_files(&store).is_empty());
    }

    #[test]
    fn truncated_then_complete_download() {
        let dir = TempDir::new().unwrap();
        let responses = [MockResponse::Truncated(index()[..8].to_vec()), MockResponse::Body(index())];
        let transport = Arc::new(MockTransport::default().with_responses(SOURCE_URL, responses));
        let store = store(&dir, &transport);
        let file = store.fetch(&snapshot(), IndexKind::Source).unwrap();
        assert_eq!(cached_files(&store), vec![file.local_path]);
    }

    #[test]
    fn corrupt_cache_entry_is_purged_and_refetched() {
        let dir = TempDir::new().unwrap();
        let transport = Arc::new(MockTransport::default().with_body(SOURCE_URL, index()));
        let store = store(&dir, &transport);
        let key = CacheStore::key(&snapshot(), IndexKind::Source).unwrap();
        fs::create_dir_all(store.root().join(&key).parent().unwrap()).unwrap();
        fs::write(store.root().join(&key), b"definitely not xz").unwrap();

        let file = store.fetch(&snapshot(), IndexKind::Source).unwrap();
        assert_eq!(fs::read(&file.local_path).unwrap(), index());
        assert_eq!(transport.requests(SOURCE_URL), 1);
    }

    #[test]
    fn corrupt_download_is_fetched_again() {
        let dir = TempDir::new().unwrap();
        let responses = [MockResponse::Body(b"garbage".to_vec()), MockResponse::Body(index())];
        let transport = Arc::new(MockTransport::default().with_responses(SOURCE_URL, responses));
        let store = store(&dir, &transport);
        let file = store.fetch(&snapshot(), IndexKind::Source).unwrap();
        assert_eq!(fs::read(&file.local_path).unwrap(), index());
        assert_eq!(transport.requests(SOURCE_URL), 2);
    }

    #[test]
    fn persistent_corruption_gives_up() {
        let dir = TempDir::new().unwrap();
        let transport = Arc::new(MockTransport::default().with_body(SOURCE_URL, b"garbage".to_vec()));
        let store = store(&dir, &transport).with_max_corrupt_refetch(1);
        let err = store.fetch(&snapshot(), IndexKind::Source).unwrap_err();
        assert!(matches!(*err, ErrorKind::CorruptCache(_)));
        assert_eq!(transport.requests(SOURCE_URL), 2);
        assert!(cached_files(&store).is_empty());
    }

    #[test]
    fn invalidate_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let transport = Arc::new(MockTransport::default().with_body(SOURCE_URL, index()));
        let store = store(&dir, &transport);
        let file = store.fetch(&snapshot(), IndexKind::Source).unwrap();
        store.invalidate(&file).unwrap();
        assert!(!file.local_path.exists());
        store.invalidate(&file).unwrap();
    }

    #[rstest]
    #[case("http://archive/x/Sources.gz", "20170101000000/source_Sources.gz")]
    #[case("http://archive/x/Sources.gz?raw=1", "20170101000000/source_Sources.gz")]
    #[case("http://archive/x/source/", "20170101000000/source_source")]
    fn keys_use_trailing_filename(#[case] url: &str, #[case] expected: &str) {
        let snapshot = SnapshotRef::new("20170101T000000Z".parse().unwrap(), url, BINARY_URL);
        assert_eq!(CacheStore::key(&snapshot, IndexKind::Source).unwrap(), Path::new(expected));
    }

    #[rstest]
    #[case("not a url")]
    #[case("http://archive/")]
    fn unusable_urls(#[case] url: &str) {
        let snapshot = SnapshotRef::new("20170101T000000Z".parse().unwrap(), url, BINARY_URL);
        let err = CacheStore::key(&snapshot, IndexKind::Source).unwrap_err();
        assert!(matches!(*err, ErrorKind::InvalidKey(_)));
    }
}
