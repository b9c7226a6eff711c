//! Profile gaps: an inline prompt on the profile page listing what is
//! still missing. Mentors and programs both read these fields.

use crate::nudge::{Nudge, NudgePayload, Surface, Urgency};
use crate::snapshot::UserSnapshot;

use super::{EngineError, RuleEngine};

/// Missing-facet count at which the prompt escalates to medium (inclusive).
pub const ESCALATE_MISSING: usize = 3;

pub struct ProfileCompletenessEngine;

impl RuleEngine for ProfileCompletenessEngine {
    fn id(&self) -> &'static str {
        "profile_completeness"
    }

    fn evaluate(&self, snapshot: &UserSnapshot) -> Result<Vec<Nudge>, EngineError> {
        let missing = snapshot.profile.missing();
        if missing.is_empty() {
            return Ok(Vec::new());
        }

        let urgency = if missing.len() >= ESCALATE_MISSING {
            Urgency::Medium
        } else {
            Urgency::Low
        };

        Ok(vec![Nudge::new(
            "profile_completeness",
            urgency,
            Surface::inline("profile"),
            NudgePayload::new(
                "Finish your profile",
                format!("Still missing: {}.", missing.join(", ")),
            )
            .with_link("/profile/edit")
            .with_param("missing_count", missing.len().to_string()),
        )])
    }
}
