use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use facegate_core::store::EnrollOutcome;
use facegate_core::{
    admit, parse_sample, validate, Authenticator, EnrolledTemplate, FaceSample, JsonTemplateStore,
    ValidationError,
};
use serde_json::{json, Value};

use crate::config::Config;

async fn read_sample(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read sample {}", path.display()))
}

fn parse_valid(payload: &str) -> Result<FaceSample, ValidationError> {
    let sample = parse_sample(payload)?;
    validate(&sample)?;
    Ok(sample)
}

/// Structural check of one capture, without touching the store.
pub async fn validate_sample(path: &Path) -> Result<Value> {
    let payload = read_sample(path).await?;
    Ok(match parse_valid(&payload) {
        Ok(sample) => json!({ "valid": true, "kind": sample.kind() }),
        Err(err) => json!({ "valid": false, "reason": err.reason(), "error": err.to_string() }),
    })
}

/// Build one template from the given captures and store it, replacing any
/// previous template for `user`.
pub async fn enroll(config: &Config, user: &str, samples: &[PathBuf]) -> Result<Value> {
    let mut template = EnrolledTemplate::new(user);

    for path in samples {
        let payload = read_sample(path).await?;
        let sample = parse_valid(&payload)
            .with_context(|| format!("sample {} rejected", path.display()))?;

        match sample {
            FaceSample::Descriptor(descriptor) => {
                if descriptor.len() != config.descriptor_len {
                    bail!(
                        "descriptor in {} has {} values, expected {}",
                        path.display(),
                        descriptor.len(),
                        config.descriptor_len
                    );
                }
                template.descriptors.push(descriptor);
            }
            FaceSample::Landmarks(landmarks) => {
                if template.landmarks.is_some() {
                    bail!("at most one landmark sample per enrollment");
                }
                template.landmarks = Some(landmarks);
            }
        }
    }

    let mut store = JsonTemplateStore::open(&config.store_path)?;
    let descriptors = template.descriptors.len();
    let landmarks = template.landmarks.is_some();
    let outcome: EnrollOutcome = store.enroll(template)?;
    store.save()?;

    Ok(json!({
        "user_id": user,
        "outcome": outcome,
        "descriptors": descriptors,
        "landmarks": landmarks,
    }))
}

pub fn remove(config: &Config, user: &str) -> Result<Value> {
    let mut store = JsonTemplateStore::open(&config.store_path)?;
    let removed = store.remove(user);
    if removed {
        store.save()?;
    }
    Ok(json!({ "user_id": user, "removed": removed }))
}

pub fn set_active(config: &Config, user: &str, active: bool) -> Result<Value> {
    let mut store = JsonTemplateStore::open(&config.store_path)?;
    store.set_active(user, active)?;
    store.save()?;
    Ok(json!({ "user_id": user, "active": active }))
}

pub fn list(config: &Config) -> Result<Value> {
    let store = JsonTemplateStore::open(&config.store_path)?;
    let users: Vec<Value> = store
        .users()
        .iter()
        .map(|u| {
            json!({
                "user_id": u.template.user_id,
                "active": u.active,
                "enrolled_at": u.enrolled_at,
                "descriptors": u.template.descriptors.len(),
                "landmarks": u.template.landmarks.is_some(),
            })
        })
        .collect();
    Ok(json!({ "store": store.path(), "users": users }))
}

/// Run one login attempt on a blocking task under the configured deadline.
///
/// With `user` set this is a 1:1 check against that account; otherwise the
/// whole store is scanned. On timeout the attempt is abandoned; the scan
/// itself is not interruptible.
pub async fn verify(config: &Config, sample: &Path, user: Option<String>) -> Result<Value> {
    let payload = read_sample(sample).await?;
    let store = Arc::new(JsonTemplateStore::open(&config.store_path)?);

    let mut authenticator = Authenticator::new();
    if let Some(limit) = config.max_scan_users {
        authenticator = authenticator.with_scan_limit(limit);
    }

    let repo = Arc::clone(&store);
    let task = tokio::task::spawn_blocking(move || match user {
        Some(user_id) => authenticator.verify_user_json(&payload, &user_id, repo.as_ref()),
        None => authenticator.authenticate_json(&payload, repo.as_ref()),
    });

    let decision = tokio::time::timeout(config.match_timeout, task)
        .await
        .map_err(|_| anyhow!("matching exceeded {} ms", config.match_timeout.as_millis()))?
        .context("matching task failed")??;

    let admission = admit(&decision, store.as_ref());
    Ok(json!({ "decision": decision, "admission": admission }))
}
