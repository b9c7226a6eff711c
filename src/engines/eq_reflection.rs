//! Emotional-intelligence journal cadence: a gentle reminder when
//! reflections lapse for a week.

use crate::nudge::{Nudge, NudgePayload, Surface, Urgency};
use crate::snapshot::UserSnapshot;

use super::{EngineError, RuleEngine};

/// Days without an EQ reflection before the reminder fires (inclusive).
pub const REFLECT_DAYS: i64 = 7;

pub struct EqReflectionEngine;

impl RuleEngine for EqReflectionEngine {
    fn id(&self) -> &'static str {
        "eq_reflection"
    }

    fn evaluate(&self, snapshot: &UserSnapshot) -> Result<Vec<Nudge>, EngineError> {
        let days = match snapshot.days_since(snapshot.last_eq_reflection) {
            Some(days) => days,
            None => return Ok(Vec::new()),
        };
        if days < REFLECT_DAYS {
            return Ok(Vec::new());
        }

        Ok(vec![Nudge::new(
            "eq_reflection",
            Urgency::Low,
            Surface::Dashboard,
            NudgePayload::new(
                "Time for an EQ reflection",
                format!("Your last reflection was {days} days ago. Interview panels ask about these moments."),
            )
            .with_link("/trackers/eq")
            .with_param("days_since_reflection", days.to_string()),
        )])
    }
}
