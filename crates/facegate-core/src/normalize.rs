//! Position and scale normalization for landmark samples.
//!
//! All features share a single centroid and a single scale, so the relative
//! geometry between features (eye spacing, nose-to-mouth distance) survives
//! normalization.

use std::collections::BTreeMap;

use crate::types::{Feature, LandmarkSample, Point};

/// Landmark sample re-expressed relative to its centroid and scale.
/// Computed per comparison, never stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedSample {
    features: BTreeMap<Feature, Vec<Point>>,
}

impl NormalizedSample {
    pub fn get(&self, feature: Feature) -> Option<&[Point]> {
        self.features.get(&feature).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Feature, &[Point])> {
        self.features.iter().map(|(f, pts)| (*f, pts.as_slice()))
    }
}

/// Remove translation and uniform scale from a landmark sample.
///
/// Total: an empty sample yields an empty result, and a sample whose points
/// all coincide (scale 0) yields all-zero points.
pub fn normalize(sample: &LandmarkSample) -> NormalizedSample {
    let count = sample.points().count();
    if count == 0 {
        return NormalizedSample::default();
    }

    // Each term is divided before summing so coordinates near f64::MAX
    // cannot overflow the accumulator.
    let n = count as f64;
    let centroid = sample.points().fold(Point::new(0.0, 0.0), |c, p| {
        Point::new(c.x + p.x / n, c.y + p.y / n)
    });
    let scale = sample
        .points()
        .map(|p| p.distance(&centroid))
        .fold(0.0f64, f64::max);

    let features = sample
        .iter()
        .map(|(feature, points)| {
            let normalized = points
                .iter()
                .map(|p| {
                    if scale > 0.0 {
                        Point::new((p.x - centroid.x) / scale, (p.y - centroid.y) / scale)
                    } else {
                        Point::new(0.0, 0.0)
                    }
                })
                .collect();
            (feature, normalized)
        })
        .collect();

    NormalizedSample { features }
}
