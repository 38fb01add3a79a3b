//! Backfill planning integration tests.

use std::collections::HashMap;

use reminder_timing_core::backfill::BackfillPlanner;
use reminder_timing_core::models::{LegacyReminder, ReminderCriticality, StoredTiming, TimingPolicy};
use reminder_timing_core::resolver::TimingPolicyResolver;
use reminder_timing_core::TimingPolicyConfig;

fn load_records() -> Vec<LegacyReminder> {
    serde_json::from_str(
        r#"[
            {"id":"r3","userId":"u2","medicationName":"Metformin 500mg"},
            {"id":"r1","userId":"u1","medicationName":"Prograf 1mg"},
            {"id":"r2","userId":"u1","medicationName":"Lisinopril","timingMode":"LOCAL","criticality":"standard"},
            {"id":"r5","userId":"u3","medicationName":null,"timingMode":"anchor"},
            {"id":"r4","userId":"u2","medicationName":"Warfarin","timingMode":"local","criticality":"standard"}
        ]"#,
    )
    .unwrap()
}

fn user_timezones() -> HashMap<String, String> {
    HashMap::from([
        ("u1".to_string(), "Europe/London".to_string()),
        ("u2".to_string(), "america/denver".to_string()),
        ("u3".to_string(), "not a zone".to_string()),
    ])
}

/// Apply patches the way the backfill job would persist them.
fn apply(records: &mut [LegacyReminder], patches: &[reminder_timing_core::PolicyPatch]) {
    for patch in patches {
        if let Some(record) = records.iter_mut().find(|r| r.id == patch.id) {
            record.timing = StoredTiming::from_policy(&patch.policy);
            record.policy_revision = Some(patch.policy_revision.clone());
        }
    }
}

#[test]
fn test_pages_walk_records_in_id_order() {
    let resolver = TimingPolicyResolver::new();
    let zones = user_timezones();
    let planner = BackfillPlanner::new(&resolver, &zones);
    let records = load_records();

    let first = planner.plan_page(&records, None, 2);
    assert_eq!(first.scanned, 2);
    assert_eq!(first.next_cursor.as_deref(), Some("r2"));
    assert!(!first.done);

    let second = planner.plan_page(&records, first.next_cursor.as_deref(), 2);
    assert_eq!(second.next_cursor.as_deref(), Some("r4"));
    assert!(!second.done);

    let third = planner.plan_page(&records, second.next_cursor.as_deref(), 2);
    assert_eq!(third.scanned, 1);
    assert_eq!(third.next_cursor.as_deref(), Some("r5"));
    assert!(third.done);

    let empty = planner.plan_page(&records, third.next_cursor.as_deref(), 2);
    assert_eq!(empty.scanned, 0);
    assert_eq!(empty.next_cursor.as_deref(), Some("r5"));
    assert!(empty.done);
}

#[test]
fn test_patches_follow_resolution_rules() {
    let resolver = TimingPolicyResolver::new();
    let zones = user_timezones();
    let planner = BackfillPlanner::new(&resolver, &zones);
    let records = load_records();

    let page = planner.plan_page(&records, None, 10);
    assert_eq!(page.patches.len(), 5);

    let by_id: HashMap<&str, &TimingPolicy> =
        page.patches.iter().map(|p| (p.id.as_str(), &p.policy)).collect();

    // No stored mode, time-sensitive: anchored to the user's zone.
    assert_eq!(
        by_id["r1"],
        &TimingPolicy::anchored("Europe/London", ReminderCriticality::TimeSensitive)
    );
    // Stored local mode kept; only the revision stamp is missing.
    assert_eq!(by_id["r2"], &TimingPolicy::local(ReminderCriticality::Standard));
    assert_eq!(by_id["r3"], &TimingPolicy::local(ReminderCriticality::Standard));
    // Explicit local mode survives, criticality is re-derived.
    assert_eq!(by_id["r4"], &TimingPolicy::local(ReminderCriticality::TimeSensitive));
    // Anchor without a zone, unusable user zone: default zone.
    assert_eq!(
        by_id["r5"],
        &TimingPolicy::anchored("America/New_York", ReminderCriticality::Standard)
    );
}

#[test]
fn test_rerun_after_apply_is_noop() {
    let resolver = TimingPolicyResolver::new();
    let zones = user_timezones();
    let planner = BackfillPlanner::new(&resolver, &zones);
    let mut records = load_records();

    let page = planner.plan_page(&records, None, 10);
    apply(&mut records, &page.patches);

    let rerun = planner.plan_page(&records, None, 10);
    assert!(rerun.patches.is_empty());
    assert_eq!(rerun.unchanged, records.len());
}

#[test]
fn test_table_change_repatches_everything() {
    let resolver = TimingPolicyResolver::new();
    let zones = user_timezones();
    let mut records = load_records();

    let planner = BackfillPlanner::new(&resolver, &zones);
    let page = planner.plan_page(&records, None, 10);
    apply(&mut records, &page.patches);

    let config = TimingPolicyConfig {
        time_sensitive_fragments: vec!["metformin".into()],
        ..Default::default()
    };
    let updated = TimingPolicyResolver::from_config(&config).unwrap();
    let planner = BackfillPlanner::new(&updated, &zones);

    let rerun = planner.plan_page(&records, None, 10);
    assert_eq!(rerun.patches.len(), records.len());

    // Stored modes are kept; only criticality follows the new table.
    let metformin = rerun.patches.iter().find(|p| p.id == "r3").unwrap();
    assert_eq!(metformin.policy, TimingPolicy::local(ReminderCriticality::TimeSensitive));
    let prograf = rerun.patches.iter().find(|p| p.id == "r1").unwrap();
    assert_eq!(
        prograf.policy,
        TimingPolicy::anchored("Europe/London", ReminderCriticality::Standard)
    );
}
