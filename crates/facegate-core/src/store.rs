//! JSON-file template store.
//!
//! Holds every enrolled user's template plus their account status in a
//! single file. The whole file is loaded on open and rewritten atomically
//! on save, so a loaded store is a consistent snapshot for matching.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::error::ValidationError;
use crate::repository::{AccountStatus, TemplateRepository};
use crate::types::{Descriptor, EnrolledTemplate};
use crate::validator::{validate_descriptor, validate_landmarks};

const STORE_FORMAT_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to read template store {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write template store {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("template store {path} is invalid: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("template store {path} has unsupported version {version}")]
    UnsupportedVersion { path: PathBuf, version: u32 },
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("refusing to enroll an empty template for user {0}")]
    EmptyTemplate(String),
    #[error("invalid template for user {user}: {source}")]
    InvalidTemplate {
        user: String,
        #[source]
        source: ValidationError,
    },
    #[error(
        "descriptor length mismatch for user {user}: store holds {expected}-value descriptors, \
         got {actual}"
    )]
    DescriptorLengthMismatch {
        user: String,
        expected: usize,
        actual: usize,
    },
    #[error("no enrolled user {0}")]
    UnknownUser(String),
}

/// One user's record in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredUser {
    #[serde(flatten)]
    pub template: EnrolledTemplate,
    #[serde(default = "default_active")]
    pub active: bool,
    pub enrolled_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    #[serde(default)]
    users: Vec<StoredUser>,
}

/// Whether an enrollment created a template or replaced an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EnrollOutcome {
    Created,
    Replaced,
}

#[derive(Debug)]
pub struct JsonTemplateStore {
    path: PathBuf,
    users: Vec<StoredUser>,
}

impl JsonTemplateStore {
    /// Load the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "template store not found, starting empty");
            return Ok(Self { path, users: Vec::new() });
        }

        let data = fs::read(&path).map_err(|source| StoreError::Read {
            path: path.clone(),
            source,
        })?;
        let file: StoreFile = serde_json::from_slice(&data).map_err(|source| StoreError::Parse {
            path: path.clone(),
            source,
        })?;
        if file.version != STORE_FORMAT_VERSION {
            return Err(StoreError::UnsupportedVersion {
                path,
                version: file.version,
            });
        }

        tracing::debug!(path = %path.display(), users = file.users.len(), "template store loaded");
        Ok(Self {
            path,
            users: file.users,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn users(&self) -> &[StoredUser] {
        &self.users
    }

    /// Create or overwrite `template.user_id`'s template. A re-enrolled user
    /// keeps their position in scan order and their account status.
    ///
    /// Every part of the template must pass validation, and all descriptors
    /// must have the length already used by other users in the store.
    pub fn enroll(&mut self, template: EnrolledTemplate) -> Result<EnrollOutcome, StoreError> {
        if template.is_empty() {
            return Err(StoreError::EmptyTemplate(template.user_id));
        }
        self.check_template(&template)?;

        let now = Utc::now();
        match self
            .users
            .iter_mut()
            .find(|u| u.template.user_id == template.user_id)
        {
            Some(existing) => {
                tracing::info!(
                    user = %template.user_id,
                    "re-enrolling, previous template replaced"
                );
                existing.template = template;
                existing.enrolled_at = now;
                Ok(EnrollOutcome::Replaced)
            }
            None => {
                tracing::info!(user = %template.user_id, "enrolled");
                self.users.push(StoredUser {
                    template,
                    active: true,
                    enrolled_at: now,
                });
                Ok(EnrollOutcome::Created)
            }
        }
    }

    fn check_template(&self, template: &EnrolledTemplate) -> Result<(), StoreError> {
        let invalid = |source: ValidationError| StoreError::InvalidTemplate {
            user: template.user_id.clone(),
            source,
        };

        if let Some(landmarks) = &template.landmarks {
            validate_landmarks(landmarks).map_err(invalid)?;
        }
        for descriptor in &template.descriptors {
            validate_descriptor(descriptor).map_err(invalid)?;
        }

        // A re-enrolled user's own previous descriptors do not pin the length.
        let expected = self
            .users
            .iter()
            .filter(|u| u.template.user_id != template.user_id)
            .find_map(|u| u.template.descriptors.first())
            .or_else(|| template.descriptors.first())
            .map(Descriptor::len);

        if let Some(expected) = expected {
            if let Some(d) = template.descriptors.iter().find(|d| d.len() != expected) {
                return Err(StoreError::DescriptorLengthMismatch {
                    user: template.user_id.clone(),
                    expected,
                    actual: d.len(),
                });
            }
        }

        Ok(())
    }

    /// Delete a user's template. Returns whether the user existed.
    pub fn remove(&mut self, user_id: &str) -> bool {
        let before = self.users.len();
        self.users.retain(|u| u.template.user_id != user_id);
        let removed = self.users.len() != before;
        if removed {
            tracing::info!(user = user_id, "template removed");
        }
        removed
    }

    pub fn set_active(&mut self, user_id: &str, active: bool) -> Result<(), StoreError> {
        let user = self
            .users
            .iter_mut()
            .find(|u| u.template.user_id == user_id)
            .ok_or_else(|| StoreError::UnknownUser(user_id.to_string()))?;
        user.active = active;
        tracing::info!(user = user_id, active, "account status updated");
        Ok(())
    }

    /// Atomically rewrite the store file (temp file in the same directory,
    /// then rename).
    pub fn save(&self) -> Result<(), StoreError> {
        let write_err = |source: io::Error| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(write_err)?;

        let file = StoreFile {
            version: STORE_FORMAT_VERSION,
            users: self.users.clone(),
        };
        let serialized = serde_json::to_vec_pretty(&file)?;

        let mut tmp = NamedTempFile::new_in(parent).map_err(write_err)?;
        tmp.write_all(&serialized).map_err(write_err)?;
        tmp.write_all(b"\n").map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;

        tracing::debug!(
            path = %self.path.display(),
            users = self.users.len(),
            "template store saved"
        );
        Ok(())
    }
}

impl TemplateRepository for JsonTemplateStore {
    fn all_enrolled_templates(&self) -> Vec<EnrolledTemplate> {
        self.users
            .iter()
            .filter(|u| !u.template.is_empty())
            .map(|u| u.template.clone())
            .collect()
    }

    fn template(&self, user_id: &str) -> Option<EnrolledTemplate> {
        self.users
            .iter()
            .find(|u| u.template.user_id == user_id && !u.template.is_empty())
            .map(|u| u.template.clone())
    }
}

impl AccountStatus for JsonTemplateStore {
    fn is_active(&self, user_id: &str) -> bool {
        self.users
            .iter()
            .any(|u| u.template.user_id == user_id && u.active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty_store() {
        let tmp = TempDir::new().unwrap();
        let store = JsonTemplateStore::open(tmp.path().join("none.json")).unwrap();
        assert!(store.users().is_empty());
        assert!(store.all_enrolled_templates().is_empty());
    }

    #[test]
    fn test_enroll_save_reopen() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/templates.json");

        let mut store = JsonTemplateStore::open(&path).unwrap();
        store
            .enroll(EnrolledTemplate::new("alice").with_descriptor(vec![0.1, 0.2]))
            .unwrap();
        store.save().unwrap();

        let reopened = JsonTemplateStore::open(&path).unwrap();
        let template = reopened.template("alice").unwrap();
        assert_eq!(template.descriptors.len(), 1);
        assert!(reopened.is_active("alice"));
    }

    #[test]
    fn test_reenroll_overwrites_in_place() {
        let tmp = TempDir::new().unwrap();
        let mut store = JsonTemplateStore::open(tmp.path().join("t.json")).unwrap();
        store.enroll(EnrolledTemplate::new("a").with_descriptor(vec![1.0])).unwrap();
        store.enroll(EnrolledTemplate::new("b").with_descriptor(vec![2.0])).unwrap();
        store.set_active("a", false).unwrap();

        let outcome = store
            .enroll(EnrolledTemplate::new("a").with_descriptor(vec![3.0]))
            .unwrap();
        assert_eq!(outcome, EnrollOutcome::Replaced);

        let all = store.all_enrolled_templates();
        assert_eq!(all[0].user_id, "a");
        assert_eq!(all[0].descriptors[0].values, vec![3.0]);
        assert!(!store.is_active("a"));
    }

    #[test]
    fn test_empty_template_refused() {
        let tmp = TempDir::new().unwrap();
        let mut store = JsonTemplateStore::open(tmp.path().join("t.json")).unwrap();
        let err = store.enroll(EnrolledTemplate::new("a")).unwrap_err();
        assert!(matches!(err, StoreError::EmptyTemplate(user) if user == "a"));
    }

    #[test]
    fn test_landmarks_missing_nose_refused() {
        use crate::types::{Feature, LandmarkSample, Point};

        let tmp = TempDir::new().unwrap();
        let mut store = JsonTemplateStore::open(tmp.path().join("t.json")).unwrap();
        let landmarks = LandmarkSample::new()
            .with_feature(Feature::LeftEye, vec![Point::new(30.0, 40.0)])
            .with_feature(Feature::RightEye, vec![Point::new(70.0, 40.0)])
            .with_feature(Feature::Mouth, vec![Point::new(50.0, 80.0)]);

        let err = store
            .enroll(EnrolledTemplate::new("a").with_landmarks(landmarks))
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::InvalidTemplate {
                source: ValidationError::MissingRequiredFeature(Feature::Nose),
                ..
            }
        ));
        assert!(store.users().is_empty());
    }

    #[test]
    fn test_non_finite_descriptor_refused() {
        let tmp = TempDir::new().unwrap();
        let mut store = JsonTemplateStore::open(tmp.path().join("t.json")).unwrap();
        let err = store
            .enroll(EnrolledTemplate::new("a").with_descriptor(vec![0.1, f64::NAN]))
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::InvalidTemplate {
                source: ValidationError::InvalidCoordinate { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_descriptor_length_must_match_store() {
        let tmp = TempDir::new().unwrap();
        let mut store = JsonTemplateStore::open(tmp.path().join("t.json")).unwrap();
        store
            .enroll(EnrolledTemplate::new("a").with_descriptor(vec![0.0; 128]))
            .unwrap();

        let err = store
            .enroll(EnrolledTemplate::new("b").with_descriptor(vec![0.0; 64]))
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::DescriptorLengthMismatch { expected: 128, actual: 64, .. }
        ));
        assert!(store.template("b").is_none());
    }

    #[test]
    fn test_descriptor_lengths_within_template_must_agree() {
        let tmp = TempDir::new().unwrap();
        let mut store = JsonTemplateStore::open(tmp.path().join("t.json")).unwrap();
        let template = EnrolledTemplate::new("a")
            .with_descriptor(vec![0.0; 3])
            .with_descriptor(vec![0.0; 4]);
        assert!(matches!(
            store.enroll(template),
            Err(StoreError::DescriptorLengthMismatch { expected: 3, actual: 4, .. })
        ));
    }

    #[test]
    fn test_sole_user_may_reenroll_with_new_length() {
        let tmp = TempDir::new().unwrap();
        let mut store = JsonTemplateStore::open(tmp.path().join("t.json")).unwrap();
        store
            .enroll(EnrolledTemplate::new("a").with_descriptor(vec![0.0; 3]))
            .unwrap();
        let outcome = store
            .enroll(EnrolledTemplate::new("a").with_descriptor(vec![0.0; 5]))
            .unwrap();
        assert_eq!(outcome, EnrollOutcome::Replaced);
    }

    #[test]
    fn test_remove_user() {
        let tmp = TempDir::new().unwrap();
        let mut store = JsonTemplateStore::open(tmp.path().join("t.json")).unwrap();
        store.enroll(EnrolledTemplate::new("a").with_descriptor(vec![1.0])).unwrap();
        assert!(store.remove("a"));
        assert!(!store.remove("a"));
        assert!(store.template("a").is_none());
        assert!(!store.is_active("a"));
    }

    #[test]
    fn test_set_active_unknown_user() {
        let tmp = TempDir::new().unwrap();
        let mut store = JsonTemplateStore::open(tmp.path().join("t.json")).unwrap();
        assert!(matches!(
            store.set_active("ghost", true),
            Err(StoreError::UnknownUser(_))
        ));
    }

    #[test]
    fn test_corrupt_file_reports_parse_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("t.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            JsonTemplateStore::open(&path),
            Err(StoreError::Parse { .. })
        ));
    }

    #[test]
    fn test_unsupported_version() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("t.json");
        fs::write(&path, r#"{"version": 9, "users": []}"#).unwrap();
        assert!(matches!(
            JsonTemplateStore::open(&path),
            Err(StoreError::UnsupportedVersion { version: 9, .. })
        ));
    }
}
