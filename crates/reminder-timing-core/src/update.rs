//! Re-resolution on reminder update.
//!
//! Rules for merging a partial update over a stored reminder:
//! - `Value` replaces the stored field
//! - `Null` clears it (a cleared mode means "use the default")
//! - `Absent` keeps what is stored
//!
//! A reminder is re-resolved when its medication changes, when any timing
//! field is sent, or when its stored policy is missing or malformed.

use crate::models::{FieldState, ReminderUpdate, ResolutionInput, StoredTiming, TimingPolicy};
use crate::resolver::TimingPolicyResolver;

/// Plans and applies policy changes for reminder updates.
pub struct UpdatePlanner<'a> {
    resolver: &'a TimingPolicyResolver,
}

impl<'a> UpdatePlanner<'a> {
    pub fn new(resolver: &'a TimingPolicyResolver) -> Self {
        Self { resolver }
    }

    /// Build the resolution input for an update, or `None` if the stored policy stands.
    pub fn plan(
        &self,
        stored_medication: &str,
        stored: &StoredTiming,
        update: &ReminderUpdate,
        user_timezone: &str,
    ) -> Option<ResolutionInput> {
        let medication_name = match &update.medication_name {
            FieldState::Value(name) => name.clone(),
            FieldState::Null => String::new(),
            FieldState::Absent => stored_medication.to_string(),
        };
        let medication_changed = medication_name != stored_medication;

        if !medication_changed && !update.touches_timing() && stored.to_policy().is_some() {
            return None;
        }

        let requested_timing_mode = match update.timing_mode {
            FieldState::Value(mode) => Some(mode),
            FieldState::Null => None,
            FieldState::Absent => stored.requested_mode(),
        };

        let requested_anchor_timezone = match &update.anchor_timezone {
            FieldState::Absent => stored.requested_anchor(),
            sent => sent.clone(),
        };

        Some(ResolutionInput {
            medication_name,
            user_timezone: user_timezone.to_string(),
            requested_timing_mode,
            requested_anchor_timezone,
        })
    }

    /// Resolve the policy an update leads to, or `None` if nothing needs to change.
    pub fn apply(
        &self,
        stored_medication: &str,
        stored: &StoredTiming,
        update: &ReminderUpdate,
        user_timezone: &str,
    ) -> Option<TimingPolicy> {
        self.plan(stored_medication, stored, update, user_timezone)
            .map(|input| self.resolver.resolve(&input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ReminderCriticality, TimingMode};

    fn stored(policy: &TimingPolicy) -> StoredTiming {
        StoredTiming::from_policy(policy)
    }

    #[test]
    fn test_unrelated_update_keeps_policy() {
        let resolver = TimingPolicyResolver::new();
        let planner = UpdatePlanner::new(&resolver);
        let current = stored(&TimingPolicy::local(ReminderCriticality::Standard));

        let update = ReminderUpdate::default();
        assert_eq!(planner.plan("Metformin", &current, &update, "UTC"), None);

        let same_name = ReminderUpdate {
            medication_name: FieldState::Value("Metformin".into()),
            ..Default::default()
        };
        assert_eq!(planner.plan("Metformin", &current, &same_name, "UTC"), None);
    }

    #[test]
    fn test_missing_policy_fields_trigger_resolution() {
        let resolver = TimingPolicyResolver::new();
        let planner = UpdatePlanner::new(&resolver);

        let policy = planner
            .apply("Warfarin", &StoredTiming::default(), &ReminderUpdate::default(), "Europe/Berlin")
            .unwrap();

        assert_eq!(
            policy,
            TimingPolicy::anchored("Europe/Berlin", ReminderCriticality::TimeSensitive)
        );
    }

    #[test]
    fn test_medication_change_reclassifies() {
        let resolver = TimingPolicyResolver::new();
        let planner = UpdatePlanner::new(&resolver);
        let current = stored(&TimingPolicy::local(ReminderCriticality::Standard));

        let update = ReminderUpdate {
            medication_name: FieldState::Value("Tacrolimus 1mg".into()),
            ..Default::default()
        };
        let policy = planner.apply("Metformin", &current, &update, "UTC").unwrap();

        // The stored local mode is an explicit choice and survives the rename.
        assert_eq!(policy, TimingPolicy::local(ReminderCriticality::TimeSensitive));
    }

    #[test]
    fn test_cleared_mode_returns_to_default() {
        let resolver = TimingPolicyResolver::new();
        let planner = UpdatePlanner::new(&resolver);
        let current = stored(&TimingPolicy::local(ReminderCriticality::TimeSensitive));

        let update = ReminderUpdate {
            timing_mode: FieldState::Null,
            ..Default::default()
        };
        let policy = planner.apply("Tacrolimus", &current, &update, "America/Chicago").unwrap();

        assert_eq!(
            policy,
            TimingPolicy::anchored("America/Chicago", ReminderCriticality::TimeSensitive)
        );
    }

    #[test]
    fn test_mode_switch_keeps_stored_anchor() {
        let resolver = TimingPolicyResolver::new();
        let planner = UpdatePlanner::new(&resolver);
        let current = StoredTiming {
            timing_mode: Some("local".into()),
            anchor_timezone: None,
            criticality: Some("standard".into()),
        };

        let update = ReminderUpdate {
            timing_mode: FieldState::Value(TimingMode::Anchor),
            ..Default::default()
        };
        let input = planner.plan("Metformin", &current, &update, "Asia/Tokyo").unwrap();
        assert_eq!(input.requested_anchor_timezone, FieldState::Absent);

        let policy = resolver.resolve(&input);
        assert_eq!(policy.anchor_timezone(), Some("Asia/Tokyo"));
    }

    #[test]
    fn test_anchor_change_uses_new_zone() {
        let resolver = TimingPolicyResolver::new();
        let planner = UpdatePlanner::new(&resolver);
        let current = stored(&TimingPolicy::anchored("America/New_York", ReminderCriticality::TimeSensitive));

        let update = ReminderUpdate {
            anchor_timezone: FieldState::Value("Europe/Paris".into()),
            ..Default::default()
        };
        let policy = planner.apply("Warfarin", &current, &update, "America/New_York").unwrap();
        assert_eq!(policy.anchor_timezone(), Some("Europe/Paris"));

        let cleared = ReminderUpdate {
            anchor_timezone: FieldState::Null,
            ..Default::default()
        };
        let policy = planner.apply("Warfarin", &current, &cleared, "Asia/Tokyo").unwrap();
        assert_eq!(policy.anchor_timezone(), Some("Asia/Tokyo"));
    }

    #[test]
    fn test_cleared_medication_is_standard() {
        let resolver = TimingPolicyResolver::new();
        let planner = UpdatePlanner::new(&resolver);
        let current = stored(&TimingPolicy::anchored("UTC", ReminderCriticality::TimeSensitive));

        let update = ReminderUpdate {
            medication_name: FieldState::Null,
            timing_mode: FieldState::Null,
            ..Default::default()
        };
        let policy = planner.apply("Warfarin", &current, &update, "UTC").unwrap();

        assert_eq!(policy, TimingPolicy::local(ReminderCriticality::Standard));
    }
}
