//! Local cache of raw (still compressed) snapshot index files.
//!
//! The cache is keyed by snapshot timestamp and index kind, so once an index
//! has been downloaded every later run reads it from disk. Files only ever
//! appear under their final name once fully downloaded and verified; a cached
//! file that no longer decompresses is purged and fetched again.
//!
//! Network access goes through the [`Transport`] trait so that the retry and
//! corruption handling can be exercised without a network (see
//! `MockTransport`, behind the `mock` feature).

pub mod error;
mod models;
mod path;
mod retry;
mod store;
pub mod transport;

pub use crate::models::{IndexKind, RawIndexFile, SnapshotRef, Timestamp};
pub use crate::path::validate as validate_path;
pub use crate::retry::RetryPolicy;
pub use crate::store::CacheStore;
pub use crate::transport::Transport;
use std::sync::Arc;

pub type TransportHandle = Arc<dyn Transport>;
