//! IANA timezone normalization.
//!
//! Timezone strings arrive from user profiles and legacy records, so invalid
//! input is routine and never an error here.

use std::str::FromStr;

use chrono_tz::Tz;

/// Fallback zone when a user's timezone is missing or unrecognised.
pub const DEFAULT_TIMEZONE: &str = "America/New_York";

/// Look up a candidate in the tz database.
///
/// Exact spellings are tried first, then a case-insensitive match.
pub fn parse_zone(candidate: Option<&str>) -> Option<Tz> {
    let trimmed = candidate?.trim();
    if trimmed.is_empty() {
        return None;
    }

    Tz::from_str(trimmed)
        .ok()
        .or_else(|| Tz::from_str_insensitive(trimmed).ok())
}

/// Canonical identifier for a candidate, or `None` if it is not a known zone.
pub fn normalize_timezone(candidate: Option<&str>) -> Option<String> {
    parse_zone(candidate).map(|tz| tz.name().to_string())
}

/// Validates timezone strings and supplies a default when they are unusable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimezoneNormalizer {
    default_zone: Tz,
}

impl Default for TimezoneNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TimezoneNormalizer {
    /// Normalizer falling back to [`DEFAULT_TIMEZONE`].
    pub fn new() -> Self {
        Self::with_default(chrono_tz::America::New_York)
    }

    pub fn with_default(default_zone: Tz) -> Self {
        Self { default_zone }
    }

    pub fn default_zone(&self) -> Tz {
        self.default_zone
    }

    /// Canonical IANA identifier, or `None` for absent, empty or unknown input.
    pub fn normalize(&self, candidate: Option<&str>) -> Option<String> {
        normalize_timezone(candidate)
    }

    /// Canonical IANA identifier, substituting the default zone when needed.
    pub fn resolve_or_default(&self, candidate: Option<&str>) -> String {
        self.resolve_zone(candidate).name().to_string()
    }

    pub fn resolve_zone(&self, candidate: Option<&str>) -> Tz {
        match parse_zone(candidate) {
            Some(tz) => tz,
            None => {
                tracing::debug!(
                    candidate = candidate.unwrap_or_default(),
                    fallback = self.default_zone.name(),
                    "Unusable timezone, using default"
                );
                self.default_zone
            }
        }
    }
}
