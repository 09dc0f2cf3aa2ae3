// src/transform/chunk.rs
//! Contiguous, weight-balanced partitioning.

use std::ops::Range;

/// Splits `weights` into at most `n` contiguous, non-empty ranges whose sums
/// are as close to `total / n` as a single left-to-right pass allows. Cuts
/// happen only between elements; order is preserved.
#[must_use]
pub fn partition(weights: &[usize], n: usize) -> Vec<Range<usize>> {
    if weights.is_empty() {
        return Vec::new();
    }
    let n = n.clamp(1, weights.len());
    let total: usize = weights.iter().sum();
    let mut ranges = Vec::with_capacity(n);
    let mut start = 0;
    let mut acc = 0;

    for (i, w) in weights.iter().enumerate() {
        acc += w;
        let chunks_left = n - ranges.len() - 1;
        if chunks_left == 0 {
            break;
        }
        let items_left = weights.len() - (i + 1);
        let target = total * (ranges.len() + 1) / n;
        if items_left == chunks_left || (acc >= target && items_left >= chunks_left) {
            ranges.push(start..i + 1);
            start = i + 1;
        }
    }
    ranges.push(start..weights.len());
    ranges
}
