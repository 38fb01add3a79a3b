//! Timing-policy resolver for medication reminders.
//!
//! Pipeline: Criticality classification → Mode selection → Anchor normalization

mod classifier;
mod timezone;

pub use classifier::*;
pub use timezone::*;

use std::sync::OnceLock;

use crate::config::{revision_of, ConfigError, ConfigResult, TimingPolicyConfig};
use crate::models::{ResolutionInput, TimingMode, TimingPolicy};

/// Main resolver that turns a medication and user timezone into a [`TimingPolicy`].
///
/// Holds only immutable tables, so one instance can be shared across threads.
#[derive(Debug, Clone)]
pub struct TimingPolicyResolver {
    normalizer: TimezoneNormalizer,
    classifier: CriticalityClassifier,
    revision: String,
}

impl Default for TimingPolicyResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingPolicyResolver {
    /// Create a resolver with the built-in default zone and medication table.
    pub fn new() -> Self {
        Self::with_parts(TimezoneNormalizer::new(), CriticalityClassifier::new())
    }

    /// Create a resolver from a configuration, validating it first.
    pub fn from_config(config: &TimingPolicyConfig) -> ConfigResult<Self> {
        Self::from_validated_config(&config.clone().validate()?)
    }

    /// Create a resolver from a configuration that already went through
    /// [`TimingPolicyConfig::validate`], such as one from `from_json_str`.
    pub fn from_validated_config(config: &TimingPolicyConfig) -> ConfigResult<Self> {
        let default_zone = parse_zone(Some(&config.default_timezone))
            .ok_or_else(|| ConfigError::InvalidDefaultTimezone(config.default_timezone.clone()))?;

        let classifier = CriticalityClassifier::from_fragments(&config.time_sensitive_fragments);
        if classifier.fragments().is_empty() {
            return Err(ConfigError::EmptyFragmentTable);
        }

        Ok(Self::with_parts(
            TimezoneNormalizer::with_default(default_zone),
            classifier,
        ))
    }

    /// Process-wide resolver over the built-in tables, built on first use.
    pub fn shared() -> &'static TimingPolicyResolver {
        static SHARED: OnceLock<TimingPolicyResolver> = OnceLock::new();
        SHARED.get_or_init(TimingPolicyResolver::new)
    }

    fn with_parts(normalizer: TimezoneNormalizer, classifier: CriticalityClassifier) -> Self {
        let revision = revision_of(normalizer.default_zone().name(), classifier.fragments());
        Self {
            normalizer,
            classifier,
            revision,
        }
    }

    /// Resolve the timing policy for one reminder.
    pub fn resolve(&self, input: &ResolutionInput) -> TimingPolicy {
        // Step 1: Criticality comes from the name alone
        let criticality = self.classifier.classify(Some(&input.medication_name));

        // Step 2: Honour an explicit mode, otherwise default by criticality
        match input.requested_timing_mode {
            Some(TimingMode::Local) => TimingPolicy::local(criticality),
            Some(TimingMode::Anchor) => {
                let requested = input.requested_anchor_timezone.value().map(String::as_str);
                let anchor = match self.normalizer.normalize(requested) {
                    Some(anchor) => anchor,
                    None => {
                        tracing::debug!(
                            requested = requested.unwrap_or_default(),
                            "Anchor timezone unusable, anchoring to user timezone"
                        );
                        self.user_zone(input)
                    }
                };
                TimingPolicy::anchored(anchor, criticality)
            }
            None if criticality.is_time_sensitive() => {
                TimingPolicy::anchored(self.user_zone(input), criticality)
            }
            None => TimingPolicy::local(criticality),
        }
    }

    /// Resolve several inputs in order.
    pub fn resolve_all(&self, inputs: &[ResolutionInput]) -> Vec<TimingPolicy> {
        inputs.iter().map(|input| self.resolve(input)).collect()
    }

    /// Digest of the tables this resolver classifies with.
    pub fn revision(&self) -> &str {
        &self.revision
    }

    pub fn normalizer(&self) -> &TimezoneNormalizer {
        &self.normalizer
    }

    pub fn classifier(&self) -> &CriticalityClassifier {
        &self.classifier
    }

    fn user_zone(&self, input: &ResolutionInput) -> String {
        self.normalizer.resolve_or_default(Some(&input.user_timezone))
    }
}
