use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::MatchError;

/// Named facial feature carried by a landmark sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Feature {
    LeftEye,
    RightEye,
    Nose,
    Mouth,
    Jawline,
}

impl Feature {
    pub const ALL: [Feature; 5] = [
        Feature::LeftEye,
        Feature::RightEye,
        Feature::Nose,
        Feature::Mouth,
        Feature::Jawline,
    ];

    /// Features a landmark sample must carry to be usable. `jawline` is optional.
    pub const REQUIRED: [Feature; 4] = [
        Feature::LeftEye,
        Feature::RightEye,
        Feature::Nose,
        Feature::Mouth,
    ];

    /// Wire name used by the capture step.
    pub fn name(self) -> &'static str {
        match self {
            Feature::LeftEye => "leftEye",
            Feature::RightEye => "rightEye",
            Feature::Nose => "nose",
            Feature::Mouth => "mouth",
            Feature::Jawline => "jawline",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single 2D landmark.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Landmark-form capture: ordered points per facial feature.
///
/// Serialized as a JSON object keyed by feature name
/// (`{"leftEye": [{"x": .., "y": ..}, ..], ..}`). Unknown feature names
/// from the capture step are dropped on parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, Vec<Point>>",
    into = "BTreeMap<Feature, Vec<Point>>"
)]
pub struct LandmarkSample {
    features: BTreeMap<Feature, Vec<Point>>,
}

impl LandmarkSample {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, replacing any points already stored for `feature`.
    pub fn with_feature(mut self, feature: Feature, points: Vec<Point>) -> Self {
        self.insert(feature, points);
        self
    }

    pub fn insert(&mut self, feature: Feature, points: Vec<Point>) {
        self.features.insert(feature, points);
    }

    pub fn get(&self, feature: Feature) -> Option<&[Point]> {
        self.features.get(&feature).map(Vec::as_slice)
    }

    /// Present features in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Feature, &[Point])> {
        self.features.iter().map(|(f, pts)| (*f, pts.as_slice()))
    }

    /// Every point of every present feature, concatenated.
    pub fn points(&self) -> impl Iterator<Item = &Point> {
        self.features.values().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.features.values().all(Vec::is_empty)
    }
}

impl From<BTreeMap<String, Vec<Point>>> for LandmarkSample {
    fn from(raw: BTreeMap<String, Vec<Point>>) -> Self {
        let mut sample = LandmarkSample::new();
        for (name, points) in raw {
            match Feature::from_name(&name) {
                Some(feature) => sample.insert(feature, points),
                None => tracing::debug!(feature = %name, "ignoring unknown landmark feature"),
            }
        }
        sample
    }
}

impl From<LandmarkSample> for BTreeMap<Feature, Vec<Point>> {
    fn from(sample: LandmarkSample) -> Self {
        sample.features
    }
}

/// Descriptor-form capture: a fixed-length vector summarizing the face
/// (historically 128-dimensional).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Descriptor {
    pub values: Vec<f64>,
}

impl Descriptor {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Euclidean distance between two descriptors.
    ///
    /// Vectors of different lengths are an integration error and never
    /// produce a distance.
    pub fn euclidean_distance(&self, other: &Descriptor) -> Result<f64, MatchError> {
        if self.len() != other.len() {
            return Err(MatchError::DescriptorLengthMismatch {
                expected: other.len(),
                actual: self.len(),
            });
        }

        Ok(self
            .values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt())
    }
}

impl From<Vec<f64>> for Descriptor {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values)
    }
}

/// One capture as produced by the external capture step.
///
/// A JSON array parses as a descriptor; a JSON object keyed by feature
/// name parses as landmarks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FaceSample {
    Descriptor(Descriptor),
    Landmarks(LandmarkSample),
}

impl FaceSample {
    pub fn kind(&self) -> &'static str {
        match self {
            FaceSample::Descriptor(_) => "descriptor",
            FaceSample::Landmarks(_) => "landmarks",
        }
    }
}

/// Stored biometric reference for one enrolled user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrolledTemplate {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub descriptors: Vec<Descriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landmarks: Option<LandmarkSample>,
}

impl EnrolledTemplate {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            descriptors: Vec::new(),
            landmarks: None,
        }
    }

    pub fn with_descriptor(mut self, descriptor: impl Into<Descriptor>) -> Self {
        self.descriptors.push(descriptor.into());
        self
    }

    pub fn with_landmarks(mut self, landmarks: LandmarkSample) -> Self {
        self.landmarks = Some(landmarks);
        self
    }

    /// A template with nothing to compare against can never be matched.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
            && self
                .landmarks
                .as_ref()
                .map_or(true, LandmarkSample::is_empty)
    }
}

/// Best-scoring user found by a gallery scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestMatch {
    pub user_id: String,
    /// Similarity in [0, 1].
    pub similarity: f64,
}
