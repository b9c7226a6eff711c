//! Stage-appropriate next action. One nudge per stage at most, and the
//! cold-start owner for trackers the staleness engines stay silent on.

use crate::nudge::{Nudge, NudgePayload, Surface, Urgency};
use crate::snapshot::{ApplicationStage, UserSnapshot};

use super::{EngineError, RuleEngine};

pub struct StageNextStepEngine;

impl RuleEngine for StageNextStepEngine {
    fn id(&self) -> &'static str {
        "stage_next_step"
    }

    fn evaluate(&self, snapshot: &UserSnapshot) -> Result<Vec<Nudge>, EngineError> {
        let nudge = match snapshot.stage {
            ApplicationStage::Exploring => Some(Nudge::new(
                "stage_intro_mentor",
                Urgency::Low,
                Surface::Dashboard,
                NudgePayload::new(
                    "Talk to a CRNA mentor",
                    "A thirty-minute intro call is the fastest way to find out if this path fits you.",
                )
                .with_link("/mentors"),
            )),
            ApplicationStage::Preparing => {
                if snapshot.last_clinical_log.is_none() && snapshot.clinical_hours_total == 0.0 {
                    Some(Nudge::new(
                        "stage_start_clinical",
                        Urgency::Medium,
                        Surface::Dashboard,
                        NudgePayload::new(
                            "Start your clinical hours tracker",
                            "Admissions committees want documented ICU time. Log your first shift to open the tracker.",
                        )
                        .with_link("/trackers/clinical"),
                    ))
                } else {
                    None
                }
            }
            ApplicationStage::Applying => {
                if snapshot.target_programs.is_empty() {
                    Some(Nudge::new(
                        "stage_add_targets",
                        Urgency::High,
                        Surface::Dashboard,
                        NudgePayload::new(
                            "Add your target programs",
                            "You are in the applying stage with no programs listed. Add them to unlock deadline tracking.",
                        )
                        .with_link("/programs"),
                    ))
                } else {
                    None
                }
            }
            ApplicationStage::Interviewing => Some(Nudge::new(
                "stage_mock_interview",
                Urgency::Medium,
                Surface::Dashboard,
                NudgePayload::new(
                    "Book a mock interview",
                    "Practice with a mentor before the real panel. Most applicants book two or three rounds.",
                )
                .with_link("/mock-interviews"),
            )),
            // Acceptance is a celebration, owned by the milestones engine.
            ApplicationStage::Accepted => None,
        };

        Ok(nudge.into_iter().collect())
    }
}
