use thiserror::Error;

use crate::decision::RejectReason;
use crate::types::Feature;

/// Why a captured sample is not structurally usable.
///
/// Every variant is recoverable: it maps onto a [`RejectReason`] and the
/// caller prompts for another capture.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("malformed face sample: {0}")]
    MalformedInput(String),
    #[error("landmark sample is missing required feature '{0}'")]
    MissingRequiredFeature(Feature),
    #[error("non-finite value at {location}")]
    InvalidCoordinate { location: String },
}

impl ValidationError {
    pub fn reason(&self) -> RejectReason {
        match self {
            ValidationError::MalformedInput(_) => RejectReason::MalformedInput,
            ValidationError::MissingRequiredFeature(_) => RejectReason::MissingRequiredFeature,
            ValidationError::InvalidCoordinate { .. } => RejectReason::InvalidCoordinate,
        }
    }
}

/// Integration errors raised while matching. These indicate a bug in the
/// capture or enrollment pipeline and are never turned into a decision.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchError {
    #[error("descriptor length mismatch: enrolled {expected} values, candidate {actual}")]
    DescriptorLengthMismatch { expected: usize, actual: usize },
}
