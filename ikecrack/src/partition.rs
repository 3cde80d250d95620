use std::ops::Range;

/// Splits `0..total` into at most `workers` contiguous ranges of
/// `ceil(total / workers)` candidates. Only the last range may be shorter.
/// Empty ranges are never produced.
pub fn partition(total: u128, workers: usize) -> Vec<Range<u128>> {
    let workers = workers.max(1) as u128;
    let chunk = total.div_ceil(workers);

    let mut ranges = Vec::new();
    let mut start = 0;
    while start < total {
        let end = start.saturating_add(chunk).min(total);
        ranges.push(start..end);
        start = end;
    }

    ranges
}
