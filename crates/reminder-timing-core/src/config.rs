//! Resolver configuration: default timezone and time-sensitive medication table.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::resolver::{normalize_fragments, normalize_timezone, DEFAULT_TIMEZONE, DEFAULT_TIME_SENSITIVE_FRAGMENTS};

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid default timezone: {0}")]
    InvalidDefaultTimezone(String),

    #[error("Time-sensitive medication table is empty")]
    EmptyFragmentTable,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Data tables the resolver classifies with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingPolicyConfig {
    /// Zone used when a user's timezone is missing or invalid
    #[serde(default = "default_timezone")]
    pub default_timezone: String,
    /// Lower-case name fragments marking narrow-therapeutic-index medications
    #[serde(default = "default_fragments")]
    pub time_sensitive_fragments: Vec<String>,
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

fn default_fragments() -> Vec<String> {
    DEFAULT_TIME_SENSITIVE_FRAGMENTS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for TimingPolicyConfig {
    fn default() -> Self {
        Self {
            default_timezone: default_timezone(),
            time_sensitive_fragments: default_fragments(),
        }
    }
}

impl TimingPolicyConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_json_path<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Canonicalize the default zone and clean the fragment table.
    pub fn validate(self) -> ConfigResult<Self> {
        let default_timezone = normalize_timezone(Some(&self.default_timezone))
            .ok_or_else(|| ConfigError::InvalidDefaultTimezone(self.default_timezone.clone()))?;

        let fragments = normalize_fragments(&self.time_sensitive_fragments);
        let dropped = self.time_sensitive_fragments.len() - fragments.len();
        if dropped > 0 {
            tracing::warn!(dropped, "Dropped blank or duplicate time-sensitive fragments");
        }
        if fragments.is_empty() {
            return Err(ConfigError::EmptyFragmentTable);
        }

        Ok(Self {
            default_timezone,
            time_sensitive_fragments: fragments,
        })
    }

    /// Stable digest of the validated tables.
    pub fn revision(&self) -> ConfigResult<String> {
        let validated = self.clone().validate()?;
        Ok(revision_of(
            &validated.default_timezone,
            &validated.time_sensitive_fragments,
        ))
    }
}

/// Hash of a default zone and fragment table, independent of fragment order.
pub(crate) fn revision_of(default_timezone: &str, fragments: &[String]) -> String {
    let mut sorted: Vec<&str> = fragments.iter().map(String::as_str).collect();
    sorted.sort_unstable();

    let mut hasher = Sha256::new();
    hasher.update(default_timezone.as_bytes());
    for fragment in sorted {
        hasher.update([0u8]);
        hasher.update(fragment.as_bytes());
    }
    let digest = hex::encode(hasher.finalize());
    digest[..16].to_string()
}
