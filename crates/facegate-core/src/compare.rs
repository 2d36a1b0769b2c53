//! Per-feature point-sequence similarity.

use crate::types::Point;

/// Sharpness of the distance-to-similarity falloff. Larger values penalize
/// positional drift more aggressively.
pub const SHARPNESS: f64 = 2.0;

/// Score two normalized point sequences for the same feature.
///
/// Points are paired by index over the shorter sequence; each pair scores
/// `1 / (1 + SHARPNESS * d)` and the feature score is their mean, in
/// `(0, 1]`. Returns `None` when either sequence is empty: the feature is
/// then not comparable and must be left out of aggregation, not scored 0.
pub fn compare(a: &[Point], b: &[Point]) -> Option<f64> {
    let n = a.len().min(b.len());
    if n == 0 {
        return None;
    }

    let total: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(pa, pb)| 1.0 / (1.0 + SHARPNESS * pa.distance(pb)))
        .sum();

    Some(total / n as f64)
}
