//! Program application deadlines: escalating reminders as each target
//! program's deadline approaches.

use crate::nudge::{Nudge, NudgePayload, Surface, Urgency};
use crate::snapshot::UserSnapshot;

use super::{EngineError, RuleEngine};

/// Deadline windows in days, inclusive. Exactly 7 days out is critical.
pub const CRITICAL_DAYS: i64 = 7;
pub const HIGH_DAYS: i64 = 14;
pub const MEDIUM_DAYS: i64 = 30;

pub struct DeadlineProximityEngine;

impl RuleEngine for DeadlineProximityEngine {
    fn id(&self) -> &'static str {
        "deadline_proximity"
    }

    fn evaluate(&self, snapshot: &UserSnapshot) -> Result<Vec<Nudge>, EngineError> {
        let mut nudges = Vec::new();

        for program in &snapshot.target_programs {
            let deadline = match program.deadline {
                Some(deadline) => deadline,
                None => continue,
            };
            let days_left = snapshot.days_until(deadline);
            // Past deadlines are the caller's cleanup problem, not a nudge.
            if days_left < 0 {
                continue;
            }

            let urgency = if days_left <= CRITICAL_DAYS {
                Urgency::Critical
            } else if days_left <= HIGH_DAYS {
                Urgency::High
            } else if days_left <= MEDIUM_DAYS {
                Urgency::Medium
            } else {
                continue;
            };

            nudges.push(Nudge::new(
                format!("deadline_{}", slug(&program.name)),
                urgency,
                Surface::Dashboard,
                NudgePayload::new(
                    format!("{} deadline approaching", program.name),
                    format!(
                        "{} days left to submit your {} application.",
                        days_left, program.name
                    ),
                )
                .with_link("/programs")
                .with_param("program", program.name.clone())
                .with_param("days_left", days_left.to_string()),
            ));
        }

        Ok(nudges)
    }
}

/// Stable lowercase slug of a program name, so the nudge id (and therefore
/// its dismissal state) survives re-evaluation.
fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_dash = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}
