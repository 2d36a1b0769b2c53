//! Landmark matching path: normalize, compare per feature, aggregate.

use std::collections::BTreeMap;
use std::convert::Infallible;

use crate::aggregate::aggregate;
use crate::compare::compare;
use crate::normalize::{normalize, NormalizedSample};
use crate::strategy::MatchStrategy;
use crate::types::{BestMatch, EnrolledTemplate, LandmarkSample};

/// Similarity between two normalized samples, in [0, 1].
///
/// Features missing (or empty) on either side are excluded and the weights
/// renormalized over the features both samples share.
pub fn normalized_similarity(candidate: &NormalizedSample, enrolled: &NormalizedSample) -> f64 {
    let scores: BTreeMap<_, _> = candidate
        .iter()
        .filter_map(|(feature, points)| {
            let other = enrolled.get(feature)?;
            compare(points, other).map(|score| (feature, score))
        })
        .collect();

    aggregate(&scores)
}

/// Similarity between a candidate capture and an enrolled landmark sample.
pub fn landmark_similarity(candidate: &LandmarkSample, enrolled: &LandmarkSample) -> f64 {
    normalized_similarity(&normalize(candidate), &normalize(enrolled))
}

/// Scan every enrolled landmark template for the best match to `candidate`.
/// Templates without a landmark sample are skipped.
pub fn match_by_landmarks(
    candidate: &LandmarkSample,
    enrolled: &[EnrolledTemplate],
) -> Option<BestMatch> {
    let normalized = normalize(candidate);
    match LandmarkStrategy.best_match(&normalized, enrolled) {
        Ok(best) => best,
        Err(never) => match never {},
    }
}

/// Weighted per-feature landmark comparison.
///
/// The candidate is normalized once by the caller; each enrolled sample is
/// normalized at comparison time.
#[derive(Debug, Clone, Copy, Default)]
pub struct LandmarkStrategy;

impl MatchStrategy for LandmarkStrategy {
    type Candidate = NormalizedSample;
    type Error = Infallible;

    fn name(&self) -> &'static str {
        "landmarks"
    }

    fn score(
        &self,
        candidate: &NormalizedSample,
        template: &EnrolledTemplate,
    ) -> Result<Option<f64>, Infallible> {
        Ok(template
            .landmarks
            .as_ref()
            .filter(|l| !l.is_empty())
            .map(|enrolled| normalized_similarity(candidate, &normalize(enrolled))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Feature, Point};

    fn face(offset: f64) -> LandmarkSample {
        LandmarkSample::new()
            .with_feature(
                Feature::LeftEye,
                vec![Point::new(30.0, 40.0), Point::new(38.0, 38.0 + offset)],
            )
            .with_feature(
                Feature::RightEye,
                vec![Point::new(62.0, 38.0), Point::new(70.0, 40.0)],
            )
            .with_feature(
                Feature::Nose,
                vec![Point::new(50.0, 50.0), Point::new(50.0, 62.0 + offset)],
            )
            .with_feature(
                Feature::Mouth,
                vec![Point::new(38.0, 78.0), Point::new(62.0, 78.0 - offset)],
            )
    }

    fn scaled(sample: &LandmarkSample, k: f64) -> LandmarkSample {
        let mut out = LandmarkSample::new();
        for (feature, points) in sample.iter() {
            out.insert(feature, points.iter().map(|p| Point::new(p.x * k, p.y * k)).collect());
        }
        out
    }

    #[test]
    fn test_identical_samples_score_one() {
        let s = face(0.0);
        assert!((landmark_similarity(&s, &s) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_distorted_sample_scores_lower() {
        let base = face(0.0);
        let near = landmark_similarity(&base, &face(2.0));
        let far = landmark_similarity(&base, &face(12.0));
        assert!(near < 1.0);
        assert!(far < near, "far = {far}, near = {near}");
    }

    #[test]
    fn test_feature_absent_from_enrolled_is_excluded() {
        let candidate = face(0.0).with_feature(
            Feature::Jawline,
            vec![Point::new(30.0, 90.0), Point::new(50.0, 100.0), Point::new(70.0, 90.0)],
        );
        let enrolled = face(3.0);
        let (nc, ne) = (normalize(&candidate), normalize(&enrolled));

        let shared: BTreeMap<_, _> = Feature::REQUIRED
            .iter()
            .map(|&f| (f, compare(nc.get(f).unwrap(), ne.get(f).unwrap()).unwrap()))
            .collect();

        assert!((normalized_similarity(&nc, &ne) - aggregate(&shared)).abs() < 1e-12);
    }

    #[test]
    fn test_best_landmark_match_skips_descriptor_only_templates() {
        let gallery = vec![
            EnrolledTemplate::new("vector-only").with_descriptor(vec![0.0; 4]),
            EnrolledTemplate::new("far").with_landmarks(face(15.0)),
            EnrolledTemplate::new("close").with_landmarks(face(0.5)),
        ];
        let best = match_by_landmarks(&face(0.0), &gallery).unwrap();
        assert_eq!(best.user_id, "close");
    }

    #[test]
    fn test_near_max_template_does_not_hide_later_match() {
        let gallery = vec![
            EnrolledTemplate::new("huge").with_landmarks(scaled(&face(0.0), 2e306)),
            EnrolledTemplate::new("alice").with_landmarks(face(1.0)),
        ];
        let best = match_by_landmarks(&face(1.0), &gallery).unwrap();
        assert_eq!(best.user_id, "alice");
        assert!((best.similarity - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_no_landmark_templates() {
        let gallery = vec![
            EnrolledTemplate::new("vector-only").with_descriptor(vec![0.0; 4]),
        ];
        assert_eq!(match_by_landmarks(&face(0.0), &gallery), None);
    }
}
