//! Validation → strategy → decision for one login attempt.

use crate::decision::{decide, MatchDecision, RejectReason};
use crate::descriptor::match_by_descriptor;
use crate::error::{MatchError, ValidationError};
use crate::landmark::match_by_landmarks;
use crate::repository::TemplateRepository;
use crate::types::{BestMatch, EnrolledTemplate, FaceSample};
use crate::validator::{parse_sample, validate};

/// Runs a login attempt against a template repository.
///
/// Stateless and `Send + Sync`: one instance can serve concurrent attempts.
/// The matching strategy is picked by the sample's form; a repository
/// holding no template of that form behaves like an empty corpus.
#[derive(Debug, Clone, Default)]
pub struct Authenticator {
    scan_limit: Option<usize>,
}

impl Authenticator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan at most `limit` enrolled users per attempt, in repository order.
    /// Only users holding a template of the sample's form count toward it.
    pub fn with_scan_limit(mut self, limit: usize) -> Self {
        self.scan_limit = Some(limit);
        self
    }

    /// 1:N identification from a raw capture payload.
    pub fn authenticate_json<R>(
        &self,
        payload: &str,
        repo: &R,
    ) -> Result<MatchDecision, MatchError>
    where
        R: TemplateRepository + ?Sized,
    {
        match parse_sample(payload) {
            Ok(sample) => self.authenticate(&sample, repo),
            Err(err) => Ok(reject_invalid(&err)),
        }
    }

    /// 1:N identification: best match across every enrolled user.
    pub fn authenticate<R>(
        &self,
        sample: &FaceSample,
        repo: &R,
    ) -> Result<MatchDecision, MatchError>
    where
        R: TemplateRepository + ?Sized,
    {
        if let Err(err) = validate(sample) {
            return Ok(reject_invalid(&err));
        }

        let mut gallery = repo.all_enrolled_templates();
        gallery.retain(|t| has_form_of(sample, t));
        if let Some(limit) = self.scan_limit {
            if gallery.len() > limit {
                tracing::warn!(
                    enrolled = gallery.len(),
                    limit,
                    "scan limit reached, gallery truncated"
                );
                gallery.truncate(limit);
            }
        }

        let best = scan(sample, &gallery)?;
        Ok(MatchDecision::from_best_match(best.as_ref()))
    }

    /// 1:1 verification from a raw capture payload.
    pub fn verify_user_json<R>(
        &self,
        payload: &str,
        user_id: &str,
        repo: &R,
    ) -> Result<MatchDecision, MatchError>
    where
        R: TemplateRepository + ?Sized,
    {
        match parse_sample(payload) {
            Ok(sample) => self.verify_user(&sample, user_id, repo),
            Err(err) => Ok(reject_invalid(&err)),
        }
    }

    /// 1:1 verification against a single user's template.
    ///
    /// An unknown user, or one with no template of the sample's form, is
    /// rejected as [`RejectReason::NoMatch`] so the outcome does not reveal
    /// whether the account is enrolled.
    pub fn verify_user<R>(
        &self,
        sample: &FaceSample,
        user_id: &str,
        repo: &R,
    ) -> Result<MatchDecision, MatchError>
    where
        R: TemplateRepository + ?Sized,
    {
        if let Err(err) = validate(sample) {
            return Ok(reject_invalid(&err));
        }

        let Some(template) = repo.template(user_id) else {
            tracing::info!("rejected: no template for requested account");
            return Ok(MatchDecision::rejected(RejectReason::NoMatch));
        };

        match scan(sample, std::slice::from_ref(&template))? {
            Some(m) => Ok(decide(m.similarity, Some(&m.user_id))),
            None => Ok(MatchDecision::rejected(RejectReason::NoMatch)),
        }
    }
}

/// Whether `template` holds anything comparable with `sample`.
fn has_form_of(sample: &FaceSample, template: &EnrolledTemplate) -> bool {
    match sample {
        FaceSample::Landmarks(_) => template.landmarks.as_ref().is_some_and(|l| !l.is_empty()),
        FaceSample::Descriptor(_) => !template.descriptors.is_empty(),
    }
}

fn scan(
    sample: &FaceSample,
    gallery: &[EnrolledTemplate],
) -> Result<Option<BestMatch>, MatchError> {
    match sample {
        FaceSample::Landmarks(landmarks) => Ok(match_by_landmarks(landmarks, gallery)),
        FaceSample::Descriptor(descriptor) => match_by_descriptor(descriptor, gallery),
    }
}

fn reject_invalid(err: &ValidationError) -> MatchDecision {
    tracing::warn!(error = %err, "face sample rejected");
    MatchDecision::from(err)
}
