//! Shared gallery scan behind the landmark and descriptor matchers.

use crate::types::{BestMatch, EnrolledTemplate};

/// Strategy for comparing a candidate against a gallery of enrolled templates.
///
/// Implementations only define how one template is scored; the gallery scan
/// is shared. The scan visits every template (no index, no early exit) and
/// is O(users × stored references per user).
pub trait MatchStrategy {
    type Candidate: ?Sized;
    type Error;

    fn name(&self) -> &'static str;

    /// Similarity in [0, 1] between the candidate and one template, or `None`
    /// when the template carries nothing this strategy can compare.
    fn score(
        &self,
        candidate: &Self::Candidate,
        template: &EnrolledTemplate,
    ) -> Result<Option<f64>, Self::Error>;

    /// Highest-scoring template across the whole gallery.
    ///
    /// Ties keep the first template in gallery order, so results are
    /// reproducible for a given repository ordering. A non-finite score is
    /// treated as not comparable. Returns `None` if no template could be
    /// scored.
    fn best_match(
        &self,
        candidate: &Self::Candidate,
        gallery: &[EnrolledTemplate],
    ) -> Result<Option<BestMatch>, Self::Error> {
        let mut best: Option<(f64, usize)> = None;
        let mut compared = 0usize;

        for (i, template) in gallery.iter().enumerate() {
            let Some(similarity) = self.score(candidate, template)? else {
                continue;
            };
            if !similarity.is_finite() {
                tracing::warn!(
                    strategy = self.name(),
                    user = %template.user_id,
                    "non-finite similarity, template skipped"
                );
                continue;
            }
            compared += 1;

            let is_better = match best {
                None => true,
                Some((prev, _)) => similarity > prev,
            };
            if is_better {
                best = Some((similarity, i));
            }
        }

        tracing::debug!(
            strategy = self.name(),
            scanned = gallery.len(),
            compared,
            best = ?best.map(|(s, _)| s),
            "gallery scan complete"
        );

        Ok(best.map(|(similarity, idx)| BestMatch {
            user_id: gallery[idx].user_id.clone(),
            similarity,
        }))
    }
}
