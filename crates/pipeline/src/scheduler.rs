use crate::error::{ErrorKind, Result};
use crate::{Pipeline, Run, RunSummary, aggregate};
use debsnap_cache::SnapshotRef;
use debsnap_index::models::{PackageEntry, SnapshotResult, SnapshotStats};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use tracing::instrument;

/// What one worker returns to the scheduler.
#[derive(Debug, Default)]
struct Shard {
    entries: Vec<PackageEntry>,
    processed: usize,
    failed: usize,
    stats: SnapshotStats,
}

impl Shard {
    fn add(&mut self, result: SnapshotResult) {
        self.processed += 1;
        self.stats += result.stats;
        self.entries.extend(result.entries);
    }
}

impl Pipeline {
    /// Process `snapshots` on the configured number of workers and merge the
    /// results.
    ///
    /// Each worker gets a contiguous run of snapshots and handles them in
    /// order. A snapshot that fails is logged and skipped. With a package
    /// allow-list, the very first snapshot of the first worker is the
    /// exception: its result is checked against the list, and a failure
    /// there (including failing to produce a result at all) stops the run.
    #[instrument(skip_all, fields(snapshots = snapshots.len(), workers))]
    pub fn run(&self, snapshots: &[SnapshotRef]) -> Result<Run> {
        let shards = shards(snapshots, self.workers.get());
        tracing::Span::current().record("workers", shards.len());
        let cancelled = AtomicBool::new(false);
        let parent = tracing::Span::current();

        let outcomes: Vec<Result<Shard>> = thread::scope(|scope| {
            let handles: Vec<_> = shards
                .iter()
                .enumerate()
                .map(|(index, shard)| {
                    let (cancelled, parent) = (&cancelled, &parent);
                    scope.spawn(move || {
                        let _span = tracing::info_span!(parent: parent, "worker", index).entered();
                        self.work(index, shard, cancelled)
                    })
                })
                .collect();
            handles
                .into_iter()
                .enumerate()
                .map(|(index, handle)| handle.join().unwrap_or_else(|_| Err(ErrorKind::Worker(index).into())))
                .collect()
        });

        let mut summary = RunSummary::default();
        let mut entries = Vec::new();
        for outcome in outcomes {
            let shard = outcome?;
            summary.snapshots += shard.processed;
            summary.failed += shard.failed;
            summary.totals += shard.stats;
            entries.extend(shard.entries);
        }
        let entries = aggregate::merge(entries, self.identity);
        summary.entries = entries.len();
        tracing::info!(%summary, "Run complete");
        Ok(Run { entries, summary })
    }

    fn work(&self, index: usize, shard: &[SnapshotRef], cancelled: &AtomicBool) -> Result<Shard> {
        let mut output = Shard::default();
        for (position, snapshot) in shard.iter().enumerate() {
            if cancelled.load(Ordering::Relaxed) {
                tracing::debug!("Run cancelled; stopping");
                break;
            }
            let gated = index == 0 && position == 0 && !self.normalizer.packages().is_empty();
            let outcome = self.process(snapshot).and_then(|result| {
                if gated {
                    self.validate(&result)?;
                }
                Ok(result)
            });
            match outcome {
                Ok(result) => output.add(result),
                Err(err) if gated => {
                    cancelled.store(true, Ordering::Relaxed);
                    return Err(err);
                },
                Err(err) => {
                    tracing::warn!(timestamp = %snapshot.timestamp, error = ?err, "Skipping snapshot");
                    output.failed += 1;
                },
            }
        }
        Ok(output)
    }

    /// Every allowed package must show up in the first snapshot's output.
    fn validate(&self, result: &SnapshotResult) -> Result<()> {
        let found: BTreeSet<&str> = result.entries.iter().map(|entry| entry.package.as_str()).collect();
        let missing: Vec<String> =
            self.normalizer.packages().iter().filter(|package| !found.contains(package.as_str())).cloned().collect();
        if !missing.is_empty() {
            tracing::error!(timestamp = %result.timestamp, ?missing, "Configured packages missing from first snapshot");
            exn::bail!(ErrorKind::SanityCheck { missing });
        }
        Ok(())
    }
}

/// Split `items` into at most `count` contiguous, non-empty runs whose
/// lengths differ by at most one.
fn shards<T>(items: &[T], count: usize) -> Vec<&[T]> {
    let count = count.clamp(1, items.len().max(1));
    let (size, extra) = (items.len() / count, items.len() % count);
    let mut shards = Vec::with_capacity(count);
    let mut rest = items;
    for index in 0..count {
        let (shard, tail) = rest.split_at(size + usize::from(index < extra));
        if !shard.is_empty() {
            shards.push(shard);
        }
        rest = tail;
    }
    shards
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(10, 4, vec![3, 3, 2, 2])]
    #[case(9, 4, vec![3, 2, 2, 2])]
    #[case(2, 8, vec![1, 1])]
    #[case(5, 1, vec![5])]
    #[case(0, 4, vec![])]
    fn shards_are_balanced(#[case] len: usize, #[case] count: usize, #[case] expected: Vec<usize>) {
        let items: Vec<usize> = (0..len).collect();
        let shards = shards(&items, count);
        assert_eq!(shards.iter().map(|shard| shard.len()).collect::<Vec<_>>(), expected);
        assert_eq!(shards.concat(), items);
    }
}
