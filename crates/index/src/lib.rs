//! From cached raw index files to joined package entries.
//!
//! - [`decode::open`] streams the stanzas of a compressed index file,
//! - [`Normalizer`] turns stanzas into typed source and binary records,
//! - [`reconcile`] joins the two on `(package, version)`.
//!
//! [`process`] chains all three for one snapshot.

pub mod decode;
pub mod error;
pub mod models;
mod normalize;
mod reconcile;

pub use crate::normalize::{Normalized, Normalizer, Record};
pub use crate::reconcile::reconcile;

use crate::error::Result;
use crate::models::SnapshotResult;
use debsnap_cache::{RawIndexFile, Timestamp};
use tracing::instrument;

/// Decode and cross-reference a snapshot's two cached indexes.
#[instrument(skip_all, fields(timestamp = %timestamp))]
pub fn process(
    timestamp: Timestamp,
    normalizer: &Normalizer,
    source: &RawIndexFile,
    binary: &RawIndexFile,
) -> Result<SnapshotResult> {
    let result = reconcile(timestamp, normalizer, decode::open(source)?, decode::open(binary)?)?;
    tracing::debug!(stats = %result.stats, "Processed snapshot");
    Ok(result)
}
