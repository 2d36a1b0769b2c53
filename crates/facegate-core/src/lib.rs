//! facegate-core: face template matching and authentication decisions.
//!
//! Compares a captured face sample (landmark points or a descriptor vector)
//! against enrolled templates and decides whether to authenticate, ask for
//! a rescan, or reject. Face detection and landmark extraction happen
//! upstream; samples arrive already as points or vectors.

pub mod aggregate;
pub mod auth;
pub mod compare;
pub mod decision;
pub mod descriptor;
pub mod error;
pub mod landmark;
pub mod normalize;
pub mod repository;
pub mod store;
pub mod strategy;
pub mod types;
pub mod validator;

pub use auth::Authenticator;
pub use decision::{decide, MatchDecision, RejectReason};
pub use descriptor::{match_by_descriptor, DescriptorStrategy};
pub use error::{MatchError, ValidationError};
pub use landmark::{landmark_similarity, match_by_landmarks, LandmarkStrategy};
pub use normalize::{normalize, NormalizedSample};
pub use repository::{admit, AccountStatus, Admission, InMemoryTemplates, TemplateRepository};
pub use store::{JsonTemplateStore, StoreError};
pub use strategy::MatchStrategy;
pub use types::{
    BestMatch, Descriptor, EnrolledTemplate, FaceSample, Feature, LandmarkSample, Point,
};
pub use validator::{parse_sample, validate};
