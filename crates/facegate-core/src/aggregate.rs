//! Weighted combination of per-feature scores.

use std::collections::BTreeMap;

use crate::types::Feature;

// --- Feature importance weights (sum to 1.0) ---
pub const LEFT_EYE_WEIGHT: f64 = 0.25;
pub const RIGHT_EYE_WEIGHT: f64 = 0.25;
pub const NOSE_WEIGHT: f64 = 0.20;
pub const MOUTH_WEIGHT: f64 = 0.15;
pub const JAWLINE_WEIGHT: f64 = 0.15;

impl Feature {
    /// Fixed importance of this feature in the landmark similarity.
    pub fn weight(self) -> f64 {
        match self {
            Feature::LeftEye => LEFT_EYE_WEIGHT,
            Feature::RightEye => RIGHT_EYE_WEIGHT,
            Feature::Nose => NOSE_WEIGHT,
            Feature::Mouth => MOUTH_WEIGHT,
            Feature::Jawline => JAWLINE_WEIGHT,
        }
    }
}

/// Combine feature scores into one similarity in [0, 1].
///
/// Only the features present in `scores` contribute, and the result is
/// divided by the sum of their weights, so a feature absent from either
/// sample does not drag the score down. No scores yields 0.
pub fn aggregate(scores: &BTreeMap<Feature, f64>) -> f64 {
    let (weighted, used) = scores
        .iter()
        .fold((0.0f64, 0.0f64), |(acc, used), (feature, score)| {
            let w = feature.weight();
            (acc + score * w, used + w)
        });

    if used > 0.0 {
        (weighted / used).clamp(0.0, 1.0)
    } else {
        0.0
    }
}
