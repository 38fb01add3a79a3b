//! Reminder Timing Core Library
//!
//! Decides how medication reminders are timed: on the user's local clock or
//! anchored to a fixed IANA timezone, and whether the medication is
//! time-sensitive (narrow therapeutic index).
//!
//! # Architecture
//!
//! ```text
//! Create / Update route ──┐
//!                         │        ┌──────────────────────────────┐
//!                         ├──────▶ │    TimingPolicyResolver      │
//! Backfill job ───────────┘        │  classify → mode → anchor    │
//!                                  └──────────────┬───────────────┘
//!                                                 │
//!                                     TimingPolicy { mode, anchor,
//!                                                    criticality }
//!                                                 │
//!                                    persisted by the caller
//! ```
//!
//! # Core Principle
//!
//! **Resolution never fails.** Bad timezones and missing names degrade to
//! documented defaults; criticality is always derived from the medication name.
//!
//! # Modules
//!
//! - [`models`]: Domain types (TimingPolicy, ResolutionInput, FieldState, records)
//! - [`resolver`]: Timing-policy resolver, timezone normalizer, criticality classifier
//! - [`config`]: Default timezone and medication table configuration
//! - [`schedule`]: Next fire time for a resolved policy
//! - [`update`]: Re-resolution rules for reminder updates
//! - [`backfill`]: Page planning for the legacy-record backfill

pub mod backfill;
pub mod config;
pub mod models;
pub mod resolver;
pub mod schedule;
pub mod update;

// Re-export commonly used types
pub use backfill::{BackfillPage, BackfillPlanner, UserTimezoneSource};
pub use config::{ConfigError, TimingPolicyConfig};
pub use models::{
    FieldState, LegacyReminder, PolicyPatch, ReminderCriticality, ReminderUpdate,
    ResolutionInput, StoredTiming, TimingMode, TimingPolicy,
};
pub use resolver::{CriticalityClassifier, TimezoneNormalizer, TimingPolicyResolver};
pub use update::UpdatePlanner;

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::Arc;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum ReminderTimingError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<ConfigError> for ReminderTimingError {
    fn from(e: ConfigError) -> Self {
        ReminderTimingError::Config(e.to_string())
    }
}

impl From<schedule::ScheduleError> for ReminderTimingError {
    fn from(e: schedule::ScheduleError) -> Self {
        ReminderTimingError::InvalidInput(e.to_string())
    }
}

impl From<models::InvalidPolicyError> for ReminderTimingError {
    fn from(e: models::InvalidPolicyError) -> Self {
        ReminderTimingError::InvalidInput(e.to_string())
    }
}

// =========================================================================
// Free Functions (exported to FFI)
// =========================================================================

/// Resolve a timing policy with the built-in tables.
#[uniffi::export]
pub fn resolve_timing_policy(input: FfiResolutionInput) -> FfiTimingPolicy {
    TimingPolicyResolver::shared().resolve(&input.into()).into()
}

/// Canonical IANA identifier, or nothing if the candidate is not a zone.
#[uniffi::export]
pub fn normalize_timezone(candidate: Option<String>) -> Option<String> {
    resolver::normalize_timezone(candidate.as_deref())
}

/// Canonical IANA identifier, falling back to the default zone.
#[uniffi::export]
pub fn resolve_timezone_or_default(candidate: Option<String>) -> String {
    TimingPolicyResolver::shared()
        .normalizer()
        .resolve_or_default(candidate.as_deref())
}

/// Classify a medication name with the built-in table.
#[uniffi::export]
pub fn classify_medication(medication_name: Option<String>) -> ReminderCriticality {
    TimingPolicyResolver::shared()
        .classifier()
        .classify(medication_name.as_deref())
}

/// Engine over the built-in tables.
#[uniffi::export]
pub fn default_engine() -> Arc<TimingPolicyEngine> {
    Arc::new(TimingPolicyEngine {
        resolver: TimingPolicyResolver::new(),
    })
}

/// Engine over tables supplied as JSON configuration.
#[uniffi::export]
pub fn engine_from_config_json(json: String) -> Result<Arc<TimingPolicyEngine>, ReminderTimingError> {
    let config = TimingPolicyConfig::from_json_str(&json)?;
    let resolver = TimingPolicyResolver::from_validated_config(&config)?;
    Ok(Arc::new(TimingPolicyEngine { resolver }))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Resolver bound to a specific configuration.
#[derive(uniffi::Object)]
pub struct TimingPolicyEngine {
    resolver: TimingPolicyResolver,
}

#[uniffi::export]
impl TimingPolicyEngine {
    /// Resolve a timing policy.
    pub fn resolve(&self, input: FfiResolutionInput) -> FfiTimingPolicy {
        self.resolver.resolve(&input.into()).into()
    }

    /// Revision stamp to store alongside resolved policies.
    pub fn revision(&self) -> String {
        self.resolver.revision().to_string()
    }

    /// Next fire time (RFC 3339, UTC) strictly after `after`.
    pub fn next_fire_time(
        &self,
        policy: FfiTimingPolicy,
        clock_time: String,
        user_timezone: Option<String>,
        after: String,
    ) -> Result<String, ReminderTimingError> {
        let policy = TimingPolicy::try_from(policy)?;
        let clock_time = schedule::parse_clock_time(&clock_time)?;
        let after = schedule::parse_instant(&after)?;

        let fire_at = schedule::next_fire_utc(
            &policy,
            clock_time,
            user_timezone.as_deref().unwrap_or_default(),
            after,
            self.resolver.normalizer(),
        );
        Ok(fire_at.to_rfc3339())
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe resolution request. A missing anchor timezone counts as not sent.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiResolutionInput {
    pub medication_name: Option<String>,
    pub user_timezone: Option<String>,
    pub requested_timing_mode: Option<TimingMode>,
    pub requested_anchor_timezone: Option<String>,
}

impl From<FfiResolutionInput> for ResolutionInput {
    fn from(input: FfiResolutionInput) -> Self {
        ResolutionInput {
            medication_name: input.medication_name.unwrap_or_default(),
            user_timezone: input.user_timezone.unwrap_or_default(),
            requested_timing_mode: input.requested_timing_mode,
            requested_anchor_timezone: match input.requested_anchor_timezone {
                Some(tz) => FieldState::Value(tz),
                None => FieldState::Absent,
            },
        }
    }
}

/// FFI-safe timing policy.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct FfiTimingPolicy {
    pub timing_mode: TimingMode,
    pub anchor_timezone: Option<String>,
    pub criticality: ReminderCriticality,
}

impl From<TimingPolicy> for FfiTimingPolicy {
    fn from(policy: TimingPolicy) -> Self {
        Self {
            timing_mode: policy.timing_mode(),
            anchor_timezone: policy.anchor_timezone().map(str::to_string),
            criticality: policy.criticality(),
        }
    }
}

impl TryFrom<FfiTimingPolicy> for TimingPolicy {
    type Error = models::InvalidPolicyError;

    fn try_from(policy: FfiTimingPolicy) -> Result<Self, Self::Error> {
        TimingPolicy::from_parts(policy.timing_mode, policy.anchor_timezone, policy.criticality)
    }
}
