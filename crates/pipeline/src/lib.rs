//! The snapshot processing pipeline.
//!
//! [`Pipeline::run`] takes the discovered snapshots, spreads them over a
//! fixed number of worker threads, and for every snapshot fetches both
//! indexes through the cache and cross-references them. The per-worker
//! results are merged into one record set, deduplicated and ordered by
//! timestamp ([`aggregate::merge`]), which [`writer`] then persists.

pub mod aggregate;
pub mod error;
mod scheduler;
mod snapshot;
mod summary;
pub mod writer;

pub use crate::summary::{Run, RunSummary};
pub use debsnap_config::Identity;

use crate::error::{ErrorKind, Result};
use debsnap_cache::{CacheStore, RetryPolicy, TransportHandle};
use debsnap_config::Config;
use debsnap_index::Normalizer;
use exn::ResultExt;
use std::num::NonZeroUsize;

/// Immutable state shared by all workers of a run.
pub struct Pipeline {
    store: CacheStore,
    normalizer: Normalizer,
    workers: NonZeroUsize,
    identity: Identity,
}

impl Pipeline {
    /// A single-worker pipeline deduplicating by the default [`Identity`].
    pub fn new(store: CacheStore, normalizer: Normalizer) -> Self {
        Self {
            store,
            normalizer,
            workers: NonZeroUsize::MIN,
            identity: Identity::default(),
        }
    }

    pub fn with_workers(mut self, workers: NonZeroUsize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = identity;
        self
    }

    /// Assemble a pipeline from configuration. An empty `packages` list
    /// processes every package.
    pub fn from_config<P: Into<String>>(
        config: &Config,
        transport: TransportHandle,
        packages: impl IntoIterator<Item = P>,
    ) -> Result<Self> {
        let store = CacheStore::new(&config.cache.dir, transport, RetryPolicy::from(&config.retry))
            .or_raise(|| ErrorKind::Config)?
            .with_max_corrupt_refetch(config.cache.max_corrupt_refetch);
        let normalizer = Normalizer::new(&config.fields, packages).or_raise(|| ErrorKind::Config)?;
        Ok(Self::new(store, normalizer)
            .with_workers(config.pipeline.workers())
            .with_identity(config.pipeline.identity))
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }
}
