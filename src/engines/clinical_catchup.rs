//! Clinical-hours tracker staleness: nudges the applicant back into the
//! habit of logging ICU hours.

use crate::nudge::{Nudge, NudgePayload, Surface, Urgency};
use crate::snapshot::UserSnapshot;

use super::{EngineError, RuleEngine};

/// Days without a clinical entry before the reminder fires (inclusive).
pub const STALE_DAYS: i64 = 4;
/// Days without a clinical entry before the reminder escalates to high.
pub const URGENT_DAYS: i64 = 14;

pub struct ClinicalCatchupEngine;

impl RuleEngine for ClinicalCatchupEngine {
    fn id(&self) -> &'static str {
        "clinical_catchup"
    }

    fn evaluate(&self, snapshot: &UserSnapshot) -> Result<Vec<Nudge>, EngineError> {
        // Never logged at all: the stage engine owns the cold start.
        let days = match snapshot.days_since(snapshot.last_clinical_log) {
            Some(days) => days,
            None => return Ok(Vec::new()),
        };
        if days < STALE_DAYS {
            return Ok(Vec::new());
        }

        let urgency = if days >= URGENT_DAYS {
            Urgency::High
        } else {
            Urgency::Medium
        };

        Ok(vec![Nudge::new(
            "clinical_catchup",
            urgency,
            Surface::Dashboard,
            NudgePayload::new(
                "Log your clinical hours",
                format!("It has been {days} days since your last clinical entry. A quick log keeps your hour totals application-ready."),
            )
            .with_link("/trackers/clinical")
            .with_param("days_since_log", days.to_string()),
        )])
    }
}
