//! Timing policy models shared by the resolver, update and backfill flows.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// How a reminder's clock time is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, uniffi::Enum)]
#[serde(rename_all = "snake_case")]
pub enum TimingMode {
    /// Fire at the stored clock time in the user's current timezone
    Local,
    /// Fire at the stored clock time in a fixed IANA timezone
    Anchor,
}

/// Clinical sensitivity of a reminder's timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, uniffi::Enum)]
#[serde(rename_all = "snake_case")]
pub enum ReminderCriticality {
    Standard,
    /// Narrow therapeutic index medication
    TimeSensitive,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown timing mode: {0}")]
pub struct ParseTimingModeError(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown reminder criticality: {0}")]
pub struct ParseCriticalityError(pub String);

impl TimingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimingMode::Local => "local",
            TimingMode::Anchor => "anchor",
        }
    }

    /// Parse a stored value, treating missing or unrecognised values as unspecified.
    pub fn parse_lenient(value: Option<&str>) -> Option<Self> {
        value.and_then(|v| v.parse().ok())
    }
}

impl FromStr for TimingMode {
    type Err = ParseTimingModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("local") {
            Ok(TimingMode::Local)
        } else if trimmed.eq_ignore_ascii_case("anchor") {
            Ok(TimingMode::Anchor)
        } else {
            Err(ParseTimingModeError(s.to_string()))
        }
    }
}

impl fmt::Display for TimingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ReminderCriticality {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderCriticality::Standard => "standard",
            ReminderCriticality::TimeSensitive => "time_sensitive",
        }
    }

    pub fn is_time_sensitive(&self) -> bool {
        matches!(self, ReminderCriticality::TimeSensitive)
    }

    /// Parse a stored value, treating missing or unrecognised values as unspecified.
    pub fn parse_lenient(value: Option<&str>) -> Option<Self> {
        value.and_then(|v| v.parse().ok())
    }
}

impl FromStr for ReminderCriticality {
    type Err = ParseCriticalityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("standard") {
            Ok(ReminderCriticality::Standard)
        } else if trimmed.eq_ignore_ascii_case("time_sensitive") {
            Ok(ReminderCriticality::TimeSensitive)
        } else {
            Err(ParseCriticalityError(s.to_string()))
        }
    }
}

impl fmt::Display for ReminderCriticality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved timing policy for a reminder.
///
/// `anchor_timezone` is present exactly when `timing_mode` is [`TimingMode::Anchor`].
/// The constructors and deserialization both enforce this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TimingPolicyFields", into = "TimingPolicyFields")]
pub struct TimingPolicy {
    timing_mode: TimingMode,
    anchor_timezone: Option<String>,
    criticality: ReminderCriticality,
}

/// Wire shape of a [`TimingPolicy`], as merged into reminder records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimingPolicyFields {
    timing_mode: TimingMode,
    #[serde(default)]
    anchor_timezone: Option<String>,
    criticality: ReminderCriticality,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidPolicyError {
    #[error("Anchor timing requires an anchor timezone")]
    MissingAnchorTimezone,

    #[error("Local timing cannot carry an anchor timezone: {0}")]
    UnexpectedAnchorTimezone(String),
}

impl TimingPolicy {
    /// Local-clock policy.
    pub fn local(criticality: ReminderCriticality) -> Self {
        Self {
            timing_mode: TimingMode::Local,
            anchor_timezone: None,
            criticality,
        }
    }

    /// Policy anchored to the given timezone.
    pub fn anchored(anchor_timezone: impl Into<String>, criticality: ReminderCriticality) -> Self {
        Self {
            timing_mode: TimingMode::Anchor,
            anchor_timezone: Some(anchor_timezone.into()),
            criticality,
        }
    }

    /// Build from loose parts, rejecting combinations that break the anchor invariant.
    pub fn from_parts(
        timing_mode: TimingMode,
        anchor_timezone: Option<String>,
        criticality: ReminderCriticality,
    ) -> Result<Self, InvalidPolicyError> {
        match (timing_mode, anchor_timezone) {
            (TimingMode::Local, None) => Ok(Self::local(criticality)),
            (TimingMode::Local, Some(tz)) => Err(InvalidPolicyError::UnexpectedAnchorTimezone(tz)),
            (TimingMode::Anchor, Some(tz)) => Ok(Self::anchored(tz, criticality)),
            (TimingMode::Anchor, None) => Err(InvalidPolicyError::MissingAnchorTimezone),
        }
    }

    pub fn timing_mode(&self) -> TimingMode {
        self.timing_mode
    }

    pub fn anchor_timezone(&self) -> Option<&str> {
        self.anchor_timezone.as_deref()
    }

    pub fn criticality(&self) -> ReminderCriticality {
        self.criticality
    }

    pub fn is_anchored(&self) -> bool {
        self.timing_mode == TimingMode::Anchor
    }

    /// Turn this policy back into a request that reproduces it.
    ///
    /// Used when re-resolving records that already carry a policy.
    pub fn to_resolution_input(
        &self,
        medication_name: impl Into<String>,
        user_timezone: impl Into<String>,
    ) -> ResolutionInput {
        ResolutionInput {
            medication_name: medication_name.into(),
            user_timezone: user_timezone.into(),
            requested_timing_mode: Some(self.timing_mode),
            requested_anchor_timezone: self.anchor_timezone.clone().into(),
        }
    }
}

impl TryFrom<TimingPolicyFields> for TimingPolicy {
    type Error = InvalidPolicyError;

    fn try_from(fields: TimingPolicyFields) -> Result<Self, Self::Error> {
        Self::from_parts(fields.timing_mode, fields.anchor_timezone, fields.criticality)
    }
}

impl From<TimingPolicy> for TimingPolicyFields {
    fn from(policy: TimingPolicy) -> Self {
        Self {
            timing_mode: policy.timing_mode,
            anchor_timezone: policy.anchor_timezone,
            criticality: policy.criticality,
        }
    }
}

/// A request field that distinguishes "not sent" from "sent as null".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldState<T> {
    /// The caller did not mention the field
    Absent,
    /// The caller explicitly cleared the field
    Null,
    Value(T),
}

impl<T> Default for FieldState<T> {
    fn default() -> Self {
        FieldState::Absent
    }
}

impl<T> FieldState<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, FieldState::Absent)
    }

    /// True when the caller sent the field, even as null.
    pub fn is_present(&self) -> bool {
        !self.is_absent()
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            FieldState::Value(v) => Some(v),
            FieldState::Absent | FieldState::Null => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> FieldState<U> {
        match self {
            FieldState::Absent => FieldState::Absent,
            FieldState::Null => FieldState::Null,
            FieldState::Value(v) => FieldState::Value(f(v)),
        }
    }
}

impl<T> From<Option<T>> for FieldState<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => FieldState::Value(v),
            None => FieldState::Null,
        }
    }
}

impl<T: Serialize> Serialize for FieldState<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldState::Value(v) => serializer.serialize_some(v),
            FieldState::Absent | FieldState::Null => serializer.serialize_none(),
        }
    }
}

// Missing keys never reach this impl; pair the field with `#[serde(default)]`.
impl<'de, T: Deserialize<'de>> Deserialize<'de> for FieldState<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(FieldState::from)
    }
}

/// Read a timing mode the way legacy clients send it: any case, unknown values dropped.
pub(super) fn deserialize_lenient_mode<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<TimingMode>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(TimingMode::parse_lenient(raw.as_deref()))
}

/// As [`deserialize_lenient_mode`], keeping an explicit null apart from an unknown value.
pub(super) fn deserialize_lenient_mode_field<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<FieldState<TimingMode>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(match raw {
        None => FieldState::Null,
        Some(value) => match TimingMode::parse_lenient(Some(&value)) {
            Some(mode) => FieldState::Value(mode),
            None => {
                tracing::debug!(value = %value, "Ignoring unknown timing mode");
                FieldState::Absent
            }
        },
    })
}

/// Inputs for a single timing-policy resolution.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionInput {
    /// Medication display name, possibly empty on legacy records
    #[serde(default)]
    pub medication_name: String,
    /// User's stored timezone, possibly empty or malformed
    #[serde(default)]
    pub user_timezone: String,
    /// Unrecognised values count as not requested
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_lenient_mode"
    )]
    pub requested_timing_mode: Option<TimingMode>,
    #[serde(default, skip_serializing_if = "FieldState::is_absent")]
    pub requested_anchor_timezone: FieldState<String>,
}

impl ResolutionInput {
    pub fn new(medication_name: impl Into<String>, user_timezone: impl Into<String>) -> Self {
        Self {
            medication_name: medication_name.into(),
            user_timezone: user_timezone.into(),
            requested_timing_mode: None,
            requested_anchor_timezone: FieldState::Absent,
        }
    }

    pub fn with_timing_mode(mut self, mode: TimingMode) -> Self {
        self.requested_timing_mode = Some(mode);
        self
    }

    pub fn with_anchor_timezone(mut self, anchor_timezone: impl Into<String>) -> Self {
        self.requested_anchor_timezone = FieldState::Value(anchor_timezone.into());
        self
    }

    pub fn with_cleared_anchor_timezone(mut self) -> Self {
        self.requested_anchor_timezone = FieldState::Null;
        self
    }
}
