use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

const DEFAULT_DESCRIPTOR_LEN: usize = 128;
const DEFAULT_MATCH_TIMEOUT_MS: u64 = 2000;

/// Optional TOML config file contents. Environment variables win over it.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    store_path: Option<PathBuf>,
    descriptor_len: Option<usize>,
    match_timeout_ms: Option<u64>,
    max_scan_users: Option<usize>,
}

/// CLI configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the JSON template store.
    pub store_path: PathBuf,
    /// Descriptor length accepted at enrollment (default: 128).
    pub descriptor_len: usize,
    /// Deadline for one matching pass.
    pub match_timeout: Duration,
    /// Upper bound on enrolled users scanned per attempt (default: unbounded).
    pub max_scan_users: Option<usize>,
}

impl Config {
    /// Load from the TOML file named by `FACEGATE_CONFIG` (if set), then
    /// apply `FACEGATE_*` environment variables.
    pub fn load() -> Result<Self> {
        let file = match std::env::var_os("FACEGATE_CONFIG") {
            Some(path) => read_config_file(Path::new(&path))?,
            None => ConfigFile::default(),
        };
        Ok(Self::resolve(file, |key| std::env::var(key).ok()))
    }

    fn resolve(file: ConfigFile, env: impl Fn(&str) -> Option<String>) -> Self {
        let store_path = env("FACEGATE_STORE_PATH")
            .map(PathBuf::from)
            .or(file.store_path)
            .unwrap_or_else(|| default_data_dir(&env).join("templates.json"));

        let timeout_ms = env_parse(&env, "FACEGATE_MATCH_TIMEOUT_MS")
            .or(file.match_timeout_ms)
            .unwrap_or(DEFAULT_MATCH_TIMEOUT_MS);

        Self {
            store_path,
            descriptor_len: env_parse(&env, "FACEGATE_DESCRIPTOR_LEN")
                .or(file.descriptor_len)
                .unwrap_or(DEFAULT_DESCRIPTOR_LEN),
            match_timeout: Duration::from_millis(timeout_ms.max(1)),
            max_scan_users: env_parse(&env, "FACEGATE_MAX_SCAN_USERS").or(file.max_scan_users),
        }
    }
}

fn read_config_file(path: &Path) -> Result<ConfigFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("invalid config file {}", path.display()))
}

fn default_data_dir(env: &impl Fn(&str) -> Option<String>) -> PathBuf {
    env("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let home = env("HOME").unwrap_or_else(|| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("facegate")
}

fn env_parse<T: FromStr>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = env(key)?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable environment override");
            None
        }
    }
}
