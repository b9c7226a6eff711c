//! Shadowing experience for early-stage applicants: push the first shadow
//! case, then keep the habit alive.

use crate::nudge::{Nudge, NudgePayload, Surface, Urgency};
use crate::snapshot::{ApplicationStage, UserSnapshot};

use super::{EngineError, RuleEngine};

/// Days since the last shadow case before the refresh reminder (inclusive).
pub const REFRESH_DAYS: i64 = 30;

pub struct ShadowRefreshEngine;

impl RuleEngine for ShadowRefreshEngine {
    fn id(&self) -> &'static str {
        "shadow_refresh"
    }

    fn evaluate(&self, snapshot: &UserSnapshot) -> Result<Vec<Nudge>, EngineError> {
        // Shadowing advice only applies before applications go out.
        match snapshot.stage {
            ApplicationStage::Exploring | ApplicationStage::Preparing => {}
            _ => return Ok(Vec::new()),
        }

        if snapshot.shadow_cases_total == 0 && snapshot.last_shadow_log.is_none() {
            return Ok(vec![Nudge::new(
                "shadow_first",
                Urgency::Medium,
                Surface::Dashboard,
                NudgePayload::new(
                    "Shadow a CRNA",
                    "Programs expect shadowing experience. Log your first case to start building the record.",
                )
                .with_link("/shadowing"),
            )]);
        }

        if let Some(days) = snapshot.days_since(snapshot.last_shadow_log) {
            if days >= REFRESH_DAYS {
                return Ok(vec![Nudge::new(
                    "shadow_refresh",
                    Urgency::Low,
                    Surface::Dashboard,
                    NudgePayload::new(
                        "Schedule another shadow day",
                        format!("Your last shadow case was {days} days ago. Recent experience reads stronger on applications."),
                    )
                    .with_link("/shadowing")
                    .with_param("days_since_shadow", days.to_string()),
                )]);
            }
        }

        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn anchor() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn first_shadow_nudge_for_new_explorer() {
        let snapshot = UserSnapshot::empty(anchor());
        let results = ShadowRefreshEngine.evaluate(&snapshot).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "shadow_first");
        assert_eq!(results[0].urgency, Urgency::Medium);
    }

    #[test]
    fn refresh_nudge_after_thirty_days() {
        let mut snapshot = UserSnapshot::empty(anchor());
        snapshot.stage = ApplicationStage::Preparing;
        snapshot.shadow_cases_total = 3;
        snapshot.last_shadow_log = Some(anchor() - Duration::days(30));

        let results = ShadowRefreshEngine.evaluate(&snapshot).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "shadow_refresh");
        assert_eq!(results[0].urgency, Urgency::Low);
    }

    #[test]
    fn silent_below_refresh_window() {
        let mut snapshot = UserSnapshot::empty(anchor());
        snapshot.shadow_cases_total = 3;
        snapshot.last_shadow_log = Some(anchor() - Duration::days(29));
        assert!(ShadowRefreshEngine.evaluate(&snapshot).unwrap().is_empty());
    }

    #[test]
    fn silent_for_later_stages() {
        let mut snapshot = UserSnapshot::empty(anchor());
        snapshot.stage = ApplicationStage::Applying;
        assert!(ShadowRefreshEngine.evaluate(&snapshot).unwrap().is_empty());

        snapshot.stage = ApplicationStage::Accepted;
        assert!(ShadowRefreshEngine.evaluate(&snapshot).unwrap().is_empty());
    }

    #[test]
    fn case_total_without_timestamp_counts_as_experienced() {
        // Caller supplied a count but no log date: no first-case nudge, and
        // no refresh nudge either since staleness is unknown.
        let mut snapshot = UserSnapshot::empty(anchor());
        snapshot.shadow_cases_total = 2;
        assert!(ShadowRefreshEngine.evaluate(&snapshot).unwrap().is_empty());
    }
}
