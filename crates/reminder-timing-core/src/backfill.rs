//! Backfill planning for reminders written before timing policies existed.
//!
//! The job that reads and writes records lives elsewhere; this module decides,
//! page by page, which records need a [`PolicyPatch`]. Pages are ordered by
//! record id and resume from a cursor holding the last id processed.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::{LegacyReminder, PolicyPatch, ResolutionInput};
use crate::resolver::TimingPolicyResolver;

/// Lookup for a user's stored timezone.
pub trait UserTimezoneSource {
    fn timezone_for(&self, user_id: &str) -> Option<String>;
}

impl UserTimezoneSource for HashMap<String, String> {
    fn timezone_for(&self, user_id: &str) -> Option<String> {
        self.get(user_id).cloned()
    }
}

/// Result of planning one backfill page.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillPage {
    /// Records whose stored policy must be rewritten
    pub patches: Vec<PolicyPatch>,
    /// Records examined in this page
    pub scanned: usize,
    /// Records already carrying the current policy
    pub unchanged: usize,
    /// Records ignored because they have no id
    pub skipped: usize,
    /// Id to resume after; unchanged if the page was empty
    pub next_cursor: Option<String>,
    /// No records remain after this page
    pub done: bool,
}

/// Plans policy patches for legacy reminders.
pub struct BackfillPlanner<'a, S: UserTimezoneSource> {
    resolver: &'a TimingPolicyResolver,
    timezones: &'a S,
}

impl<'a, S: UserTimezoneSource> BackfillPlanner<'a, S> {
    pub fn new(resolver: &'a TimingPolicyResolver, timezones: &'a S) -> Self {
        Self {
            resolver,
            timezones,
        }
    }

    /// Plan the next page of about `limit` records after `cursor`.
    ///
    /// The cursor is a record id, so records sharing an id are always kept in
    /// the same page; a page can run past `limit` to finish such a group.
    pub fn plan_page(
        &self,
        records: &[LegacyReminder],
        cursor: Option<&str>,
        limit: usize,
    ) -> BackfillPage {
        let limit = limit.max(1);

        let mut pending: Vec<&LegacyReminder> = records
            .iter()
            .filter(|r| cursor.map_or(true, |c| r.id.as_str() > c))
            .collect();
        pending.sort_by(|a, b| a.id.cmp(&b.id));

        let mut end = limit.min(pending.len());
        while end > 0 && end < pending.len() && pending[end].id == pending[end - 1].id {
            end += 1;
        }
        let done = end == pending.len();
        pending.truncate(end);

        let mut page = BackfillPage {
            next_cursor: pending
                .last()
                .map(|r| r.id.clone())
                .or_else(|| cursor.map(str::to_string)),
            done,
            ..Default::default()
        };

        for record in pending {
            page.scanned += 1;

            if record.id.trim().is_empty() {
                tracing::warn!(user_id = %record.user_id, "Skipping reminder without id");
                page.skipped += 1;
                continue;
            }

            match self.plan_record(record) {
                Some(patch) => page.patches.push(patch),
                None => page.unchanged += 1,
            }
        }

        tracing::info!(
            scanned = page.scanned,
            patched = page.patches.len(),
            unchanged = page.unchanged,
            skipped = page.skipped,
            done = page.done,
            "Planned backfill page"
        );

        page
    }

    /// Patch for a single record, or `None` if it is already current.
    pub fn plan_record(&self, record: &LegacyReminder) -> Option<PolicyPatch> {
        let user_timezone = self.timezones.timezone_for(&record.user_id).unwrap_or_default();

        let input = ResolutionInput {
            medication_name: record.medication_name.clone().unwrap_or_default(),
            user_timezone,
            requested_timing_mode: record.timing.requested_mode(),
            requested_anchor_timezone: record.timing.requested_anchor(),
        };
        let policy = self.resolver.resolve(&input);

        let current_revision = record.policy_revision.as_deref() == Some(self.resolver.revision());
        if current_revision && record.timing.to_policy().as_ref() == Some(&policy) {
            return None;
        }

        tracing::debug!(id = %record.id, mode = %policy.timing_mode(), "Reminder needs policy patch");
        Some(PolicyPatch {
            id: record.id.clone(),
            policy,
            policy_revision: self.resolver.revision().to_string(),
        })
    }
}
