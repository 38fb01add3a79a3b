//! Reminder record shapes seen by the update and backfill flows.
//!
//! Stored fields are kept as raw strings: older records may miss them
//! entirely or carry values written before the enums existed.

use serde::{Deserialize, Serialize};

use crate::resolver::normalize_timezone;

use super::{FieldState, ReminderCriticality, TimingMode, TimingPolicy};

/// Timing-policy fields as persisted on a reminder record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredTiming {
    #[serde(default)]
    pub timing_mode: Option<String>,
    #[serde(default)]
    pub anchor_timezone: Option<String>,
    #[serde(default)]
    pub criticality: Option<String>,
}

impl StoredTiming {
    pub fn from_policy(policy: &TimingPolicy) -> Self {
        Self {
            timing_mode: Some(policy.timing_mode().as_str().to_string()),
            anchor_timezone: policy.anchor_timezone().map(str::to_string),
            criticality: Some(policy.criticality().as_str().to_string()),
        }
    }

    /// The stored fields as a policy, if they already form a complete, canonical one.
    ///
    /// Anchor timezones must be stored in canonical IANA spelling to count.
    pub fn to_policy(&self) -> Option<TimingPolicy> {
        let mode = TimingMode::parse_lenient(self.timing_mode.as_deref())?;
        let criticality = ReminderCriticality::parse_lenient(self.criticality.as_deref())?;

        let anchor = match &self.anchor_timezone {
            Some(stored) => {
                let canonical = normalize_timezone(Some(stored))?;
                if &canonical != stored {
                    return None;
                }
                Some(canonical)
            }
            None => None,
        };

        TimingPolicy::from_parts(mode, anchor, criticality).ok()
    }

    /// Stored mode, parsed leniently.
    pub fn requested_mode(&self) -> Option<TimingMode> {
        TimingMode::parse_lenient(self.timing_mode.as_deref())
    }

    /// Stored anchor as a request field; a missing anchor counts as not sent.
    pub fn requested_anchor(&self) -> FieldState<String> {
        match &self.anchor_timezone {
            Some(tz) => FieldState::Value(tz.clone()),
            None => FieldState::Absent,
        }
    }
}

/// A partial reminder update as sent by a client.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderUpdate {
    #[serde(default, skip_serializing_if = "FieldState::is_absent")]
    pub medication_name: FieldState<String>,
    /// Unrecognised values count as not sent
    #[serde(
        default,
        skip_serializing_if = "FieldState::is_absent",
        deserialize_with = "super::policy::deserialize_lenient_mode_field"
    )]
    pub timing_mode: FieldState<TimingMode>,
    #[serde(default, skip_serializing_if = "FieldState::is_absent")]
    pub anchor_timezone: FieldState<String>,
}

impl ReminderUpdate {
    /// Whether the client sent any timing field, including explicit nulls.
    pub fn touches_timing(&self) -> bool {
        self.timing_mode.is_present() || self.anchor_timezone.is_present()
    }
}

/// A reminder record as read by the backfill job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyReminder {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub medication_name: Option<String>,
    #[serde(flatten)]
    pub timing: StoredTiming,
    /// Revision of the policy table that last classified this record
    #[serde(default)]
    pub policy_revision: Option<String>,
}

/// Fields to write back onto a reminder record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyPatch {
    pub id: String,
    #[serde(flatten)]
    pub policy: TimingPolicy,
    pub policy_revision: String,
}
