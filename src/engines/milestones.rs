//! Milestone celebrations: hour marks, the first shadow case, and the
//! acceptance itself.
//!
//! Every reached milestone is re-emitted on every evaluation; the pipeline's
//! celebrated-events filter is what makes each one fire once. Ids therefore
//! have to stay stable forever.

use crate::nudge::{Nudge, NudgePayload, Surface, Urgency};
use crate::snapshot::{ApplicationStage, UserSnapshot};

use super::{EngineError, RuleEngine};

/// Clinical-hour marks worth celebrating, in ascending order.
pub const HOUR_MARKS: [u32; 3] = [100, 500, 1000];

pub struct MilestonesEngine;

impl RuleEngine for MilestonesEngine {
    fn id(&self) -> &'static str {
        "milestones"
    }

    fn evaluate(&self, snapshot: &UserSnapshot) -> Result<Vec<Nudge>, EngineError> {
        let mut nudges = Vec::new();

        for mark in HOUR_MARKS {
            if snapshot.clinical_hours_total >= f64::from(mark) {
                nudges.push(Nudge::new(
                    format!("milestone_hours_{mark}"),
                    Urgency::Medium,
                    Surface::Celebration,
                    NudgePayload::new(
                        format!("{mark} clinical hours"),
                        format!("You crossed {mark} documented ICU hours. That is a real line on your application."),
                    )
                    .with_param("hours_mark", mark.to_string()),
                ));
            }
        }

        if snapshot.shadow_cases_total >= 1 {
            nudges.push(Nudge::new(
                "milestone_first_shadow",
                Urgency::Low,
                Surface::Celebration,
                NudgePayload::new(
                    "First shadow case logged",
                    "Your shadowing record has started. Programs love to see this early.",
                ),
            ));
        }

        if snapshot.stage == ApplicationStage::Accepted {
            nudges.push(Nudge::new(
                "milestone_accepted",
                Urgency::High,
                Surface::Celebration,
                NudgePayload::new(
                    "Accepted!",
                    "You got in. Everything on this dashboard was building to this.",
                ),
            ));
        }

        Ok(nudges)
    }
}
