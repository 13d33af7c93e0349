//! Parsing of the archive's HTML listings.

use crate::consts;
use debsnap_cache::Timestamp;
use scraper::Html;
use std::collections::BTreeSet;

fn hrefs(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&consts::ANCHOR_SELECTOR)
        .filter_map(|anchor| anchor.value().attr("href"))
        .map(|href| href.trim().to_string())
        .collect()
}

/// `(year, month)` pairs linked from the archive root.
pub(crate) fn months(html: &str) -> BTreeSet<(i32, u8)> {
    hrefs(html)
        .iter()
        .filter_map(|href| {
            let captures = consts::MONTH_LINK_REGEX.captures(href)?;
            let year = captures[1].parse().ok()?;
            let month: u8 = captures[2].parse().ok()?;
            (1..=12).contains(&month).then_some((year, month))
        })
        .collect()
}

/// Snapshot timestamps linked from a month page.
pub(crate) fn snapshots(html: &str) -> BTreeSet<Timestamp> {
    hrefs(html)
        .iter()
        .filter_map(|href| consts::SNAPSHOT_LINK_REGEX.captures(href))
        .filter_map(|captures| captures[1].parse().ok())
        .collect()
}
