//! Comparison of every consecutive quarter pair in a filing history.
//!
//! Each pair is an independent two-snapshot diff. Nothing is carried from
//! one pair to the next, which is what makes the parallel path safe.

use rayon::prelude::*;
use tracing::info;

use holdwatch_core::{ChangeSet, CompareError, Comparator, ComparisonConfig, Snapshot};

/// Diff each consecutive pair after sorting by period end.
///
/// Returns one change set per pair, oldest first. Serial and parallel runs
/// return identical results.
pub fn compare_consecutive(
    snapshots: &[Snapshot],
    config: ComparisonConfig,
    parallel: bool,
) -> Result<Vec<ChangeSet>, CompareError> {
    let mut ordered: Vec<&Snapshot> = snapshots.iter().collect();
    ordered.sort_by_key(|s| s.period_end());
    let pairs: Vec<(&Snapshot, &Snapshot)> = ordered.windows(2).map(|w| (w[0], w[1])).collect();

    let comparator = Comparator::new(config);
    let results = if parallel {
        pairs
            .par_iter()
            .map(|(prev, curr)| comparator.compare(prev, curr))
            .collect::<Result<Vec<_>, _>>()?
    } else {
        pairs
            .iter()
            .map(|(prev, curr)| comparator.compare(prev, curr))
            .collect::<Result<Vec<_>, _>>()?
    };

    info!(pairs = results.len(), parallel, "compared consecutive snapshots");
    Ok(results)
}
