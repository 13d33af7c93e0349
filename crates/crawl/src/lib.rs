//! Snapshot discovery.
//!
//! The archive publishes an HTML listing at its root with one link per month
//! that has snapshots, and one page per month listing every snapshot instant
//! (`20170101T034501Z/`). [`discover`] walks the months overlapping the
//! requested date range and turns every snapshot in range into a
//! [`SnapshotRef`] pointing at its source and binary indexes.

pub mod error;
mod consts;
mod listing;
mod urls;

use crate::error::{ErrorKind, Result};
use crate::urls::UrlBuilder;
use debsnap_cache::{RetryPolicy, SnapshotRef, Timestamp, Transport};
use debsnap_config::ArchiveConfig;
use exn::ResultExt;
use std::collections::BTreeSet;
use time::Date;
use tracing::instrument;

/// Find every snapshot between `since` and `until` (both inclusive, whole
/// days), in ascending timestamp order without duplicates.
///
/// Listing pages are fetched through `transport` under the same retry
/// `policy` as index downloads.
#[instrument(skip(transport, policy, archive), fields(base = %archive.base_url))]
pub fn discover(
    transport: &dyn Transport,
    policy: &RetryPolicy,
    archive: &ArchiveConfig,
    since: Date,
    until: Date,
) -> Result<Vec<SnapshotRef>> {
    if since > until {
        exn::bail!(ErrorKind::InvalidRange {
            since: since.to_string(),
            until: until.to_string(),
        });
    }
    let urls = UrlBuilder::new(archive)?;
    let (first_month, last_month) = ((since.year(), u8::from(since.month())), (until.year(), u8::from(until.month())));
    let months: Vec<_> = listing::months(&fetch_page(transport, policy, urls.base())?)
        .into_iter()
        .filter(|month| (first_month..=last_month).contains(month))
        .collect();
    tracing::debug!(months = months.len(), "Found months in range");

    let range = Timestamp::start_of(since)..=Timestamp::end_of(until);
    let mut timestamps = BTreeSet::new();
    for (year, month) in months {
        let page = fetch_page(transport, policy, &urls.month(year, month)?)?;
        let found = listing::snapshots(&page);
        tracing::trace!(year, month, found = found.len(), "Month listing");
        timestamps.extend(found.into_iter().filter(|timestamp| range.contains(timestamp)));
    }

    let snapshots = timestamps.into_iter().map(|timestamp| urls.snapshot(timestamp)).collect::<Result<Vec<_>>>()?;
    tracing::info!(snapshots = snapshots.len(), %since, %until, "Found snapshots between given dates");
    Ok(snapshots)
}

fn fetch_page(transport: &dyn Transport, policy: &RetryPolicy, url: &str) -> Result<String> {
    let body = policy.run(url, |_| transport.get_bytes(url)).or_raise(|| ErrorKind::Fetch(url.to_string()))?;
    Ok(String::from_utf8_lossy(&body).into_owned())
}
