//! Similarity → authentication outcome.
//!
//! Stateless: one decision per login attempt, never persisted here.
//! Session issuance and account activation policy are applied by the caller
//! after an [`MatchDecision::Authenticated`] outcome.

use serde::Serialize;
use std::fmt;

use crate::error::ValidationError;
use crate::types::BestMatch;

/// Similarity strictly above this authenticates.
pub const AUTHENTICATE_THRESHOLD: f64 = 0.6;
/// Similarity strictly above this (and not authenticated) asks for a rescan.
pub const RESCAN_THRESHOLD: f64 = 0.4;
/// User-facing guidance attached to a rescan outcome.
pub const RESCAN_GUIDANCE: &str = "partial match, capture again";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RejectReason {
    MalformedInput,
    MissingRequiredFeature,
    InvalidCoordinate,
    NoEnrolledUsers,
    NoMatch,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RejectReason::MalformedInput => "malformed input",
            RejectReason::MissingRequiredFeature => "missing required feature",
            RejectReason::InvalidCoordinate => "invalid coordinate",
            RejectReason::NoEnrolledUsers => "no enrolled users",
            RejectReason::NoMatch => "no match",
        };
        f.write_str(s)
    }
}

/// Terminal outcome of one authentication attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum MatchDecision {
    Authenticated { user_id: String, similarity: f64 },
    /// Partial match. Carries no identity so enrollment is not leaked.
    NeedsRescan { similarity: f64, guidance: &'static str },
    Rejected { reason: RejectReason },
}

impl MatchDecision {
    pub fn rejected(reason: RejectReason) -> Self {
        MatchDecision::Rejected { reason }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, MatchDecision::Authenticated { .. })
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            MatchDecision::Authenticated { user_id, .. } => Some(user_id),
            _ => None,
        }
    }

    /// Decision for the result of a gallery scan; `None` means there was no
    /// enrolled user to compare against.
    pub fn from_best_match(best: Option<&BestMatch>) -> Self {
        match best {
            Some(m) => decide(m.similarity, Some(&m.user_id)),
            None => decide(0.0, None),
        }
    }
}

impl From<&ValidationError> for MatchDecision {
    fn from(err: &ValidationError) -> Self {
        MatchDecision::rejected(err.reason())
    }
}

/// Map a similarity score to an outcome.
///
/// Both thresholds are exclusive on the upper side: exactly 0.6 asks for a
/// rescan and exactly 0.4 is rejected. Without a matched user there is
/// nothing to authenticate and the attempt is rejected with
/// [`RejectReason::NoEnrolledUsers`]. A NaN similarity is rejected.
pub fn decide(similarity: f64, matched_user: Option<&str>) -> MatchDecision {
    let Some(user_id) = matched_user else {
        tracing::info!("rejected: no enrolled users to compare against");
        return MatchDecision::rejected(RejectReason::NoEnrolledUsers);
    };

    if similarity > AUTHENTICATE_THRESHOLD {
        tracing::info!(user = user_id, similarity, "authenticated");
        MatchDecision::Authenticated {
            user_id: user_id.to_string(),
            similarity,
        }
    } else if similarity > RESCAN_THRESHOLD {
        tracing::info!(similarity, "partial match, rescan requested");
        MatchDecision::NeedsRescan {
            similarity,
            guidance: RESCAN_GUIDANCE,
        }
    } else {
        tracing::info!(similarity, "rejected: no match");
        MatchDecision::rejected(RejectReason::NoMatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_boundaries() {
        assert!(matches!(
            decide(0.61, Some("u")),
            MatchDecision::Authenticated { ref user_id, .. } if user_id == "u"
        ));
        assert!(matches!(decide(0.60, Some("u")), MatchDecision::NeedsRescan { .. }));
        assert!(matches!(decide(0.41, Some("u")), MatchDecision::NeedsRescan { .. }));
        assert_eq!(
            decide(0.40, Some("u")),
            MatchDecision::rejected(RejectReason::NoMatch)
        );
    }

    #[test]
    fn test_rescan_carries_guidance_not_identity() {
        let decision = decide(0.5, Some("alice"));
        assert_eq!(
            decision,
            MatchDecision::NeedsRescan { similarity: 0.5, guidance: RESCAN_GUIDANCE }
        );
        assert_eq!(decision.user_id(), None);
        let json = serde_json::to_string(&decision).unwrap();
        assert!(!json.contains("alice"));
    }

    #[test]
    fn test_no_user_rejected_as_no_enrolled_users() {
        assert_eq!(
            decide(0.99, None),
            MatchDecision::rejected(RejectReason::NoEnrolledUsers)
        );
        assert_eq!(
            MatchDecision::from_best_match(None),
            MatchDecision::rejected(RejectReason::NoEnrolledUsers)
        );
    }

    #[test]
    fn test_nan_similarity_rejected() {
        assert_eq!(
            decide(f64::NAN, Some("u")),
            MatchDecision::rejected(RejectReason::NoMatch)
        );
    }

    #[test]
    fn test_validation_error_maps_to_reason() {
        let err = ValidationError::MalformedInput("eof".into());
        assert_eq!(
            MatchDecision::from(&err),
            MatchDecision::rejected(RejectReason::MalformedInput)
        );
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(decide(0.9, Some("u1"))).unwrap();
        assert_eq!(json["outcome"], "authenticated");
        assert_eq!(json["user_id"], "u1");
    }
}
