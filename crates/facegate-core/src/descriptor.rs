//! Descriptor matching path: euclidean distance between fixed-length vectors.

use crate::error::MatchError;
use crate::strategy::MatchStrategy;
use crate::types::{BestMatch, Descriptor, EnrolledTemplate};

/// `1 - distance`, clamped to [0, 1].
pub fn descriptor_similarity(
    candidate: &Descriptor,
    stored: &Descriptor,
) -> Result<f64, MatchError> {
    let distance = candidate.euclidean_distance(stored)?;
    Ok((1.0 - distance).clamp(0.0, 1.0))
}

/// Scan every stored descriptor of every enrolled user for the best match.
///
/// A stored descriptor whose length differs from the candidate's fails the
/// whole scan.
pub fn match_by_descriptor(
    candidate: &Descriptor,
    enrolled: &[EnrolledTemplate],
) -> Result<Option<BestMatch>, MatchError> {
    DescriptorStrategy.best_match(candidate, enrolled)
}

/// Euclidean descriptor comparison. A user's score is the best over all of
/// their stored descriptors.
#[derive(Debug, Clone, Copy, Default)]
pub struct DescriptorStrategy;

impl MatchStrategy for DescriptorStrategy {
    type Candidate = Descriptor;
    type Error = MatchError;

    fn name(&self) -> &'static str {
        "descriptor"
    }

    fn score(
        &self,
        candidate: &Descriptor,
        template: &EnrolledTemplate,
    ) -> Result<Option<f64>, MatchError> {
        let mut best: Option<f64> = None;
        for stored in &template.descriptors {
            let similarity = descriptor_similarity(candidate, stored)?;
            if best.map_or(true, |b| similarity > b) {
                best = Some(similarity);
            }
        }
        Ok(best)
    }
}
