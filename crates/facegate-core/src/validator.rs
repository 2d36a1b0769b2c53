//! Structural checks applied to a capture before any matching.

use crate::error::ValidationError;
use crate::types::{Descriptor, FaceSample, Feature, LandmarkSample};

/// Parse a raw capture payload (JSON) into a [`FaceSample`].
pub fn parse_sample(payload: &str) -> Result<FaceSample, ValidationError> {
    serde_json::from_str(payload).map_err(|e| ValidationError::MalformedInput(e.to_string()))
}

/// Check that a sample is usable for matching. Pure; no side effects.
pub fn validate(sample: &FaceSample) -> Result<(), ValidationError> {
    match sample {
        FaceSample::Landmarks(landmarks) => validate_landmarks(landmarks),
        FaceSample::Descriptor(descriptor) => validate_descriptor(descriptor),
    }
}

/// Required features must be present and non-empty; every point of every
/// present feature (including `jawline`) must be finite.
pub fn validate_landmarks(sample: &LandmarkSample) -> Result<(), ValidationError> {
    for feature in Feature::REQUIRED {
        match sample.get(feature) {
            Some(points) if !points.is_empty() => {}
            _ => return Err(ValidationError::MissingRequiredFeature(feature)),
        }
    }

    for (feature, points) in sample.iter() {
        if let Some(index) = points.iter().position(|p| !p.is_finite()) {
            return Err(ValidationError::InvalidCoordinate {
                location: format!("{feature}[{index}]"),
            });
        }
    }

    Ok(())
}

pub fn validate_descriptor(descriptor: &Descriptor) -> Result<(), ValidationError> {
    if descriptor.is_empty() {
        return Err(ValidationError::MalformedInput("descriptor has no values".into()));
    }

    if let Some(index) = descriptor.values.iter().position(|v| !v.is_finite()) {
        return Err(ValidationError::InvalidCoordinate {
            location: format!("descriptor[{index}]"),
        });
    }

    Ok(())
}
