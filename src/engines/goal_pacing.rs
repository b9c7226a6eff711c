//! Weekly hours goal pacing: celebrate a met goal, flag a badly behind one
//! once the week is mostly gone.

use chrono::Datelike;

use crate::nudge::{Nudge, NudgePayload, Surface, Urgency};
use crate::snapshot::UserSnapshot;

use super::{EngineError, RuleEngine};

/// Fraction of the weekly target that counts as "on pace" late in the week.
pub const BEHIND_FRACTION: f64 = 0.5;

/// First ISO weekday (Monday = 1) on which the behind-pace warning may fire.
pub const BEHIND_FROM_WEEKDAY: u32 = 5;

pub struct GoalPacingEngine;

impl RuleEngine for GoalPacingEngine {
    fn id(&self) -> &'static str {
        "goal_pacing"
    }

    fn evaluate(&self, snapshot: &UserSnapshot) -> Result<Vec<Nudge>, EngineError> {
        let goal = match &snapshot.weekly_goal {
            Some(goal) if goal.target_hours > 0.0 => goal,
            _ => return Ok(Vec::new()),
        };

        if goal.logged_hours >= goal.target_hours {
            // The event id embeds the ISO week, so next week's win is a new
            // celebration even after this one is marked celebrated.
            let week = snapshot.captured_at.iso_week();
            let id = format!("goal_met_{}w{:02}", week.year(), week.week());
            return Ok(vec![Nudge::new(
                id,
                Urgency::Low,
                Surface::Celebration,
                NudgePayload::new(
                    "Weekly goal met",
                    format!(
                        "{:.1} of {:.1} hours logged this week. Keep the streak going.",
                        goal.logged_hours, goal.target_hours
                    ),
                )
                .with_param("logged_hours", format!("{:.1}", goal.logged_hours))
                .with_param("target_hours", format!("{:.1}", goal.target_hours)),
            )]);
        }

        let weekday = snapshot.captured_at.weekday().number_from_monday();
        if weekday >= BEHIND_FROM_WEEKDAY
            && goal.logged_hours < goal.target_hours * BEHIND_FRACTION
        {
            return Ok(vec![Nudge::new(
                "goal_behind",
                Urgency::Medium,
                Surface::Dashboard,
                NudgePayload::new(
                    "Your weekly goal needs attention",
                    format!(
                        "{:.1} of {:.1} hours logged with the week almost over.",
                        goal.logged_hours, goal.target_hours
                    ),
                )
                .with_link("/trackers/clinical")
                .with_param("logged_hours", format!("{:.1}", goal.logged_hours))
                .with_param("target_hours", format!("{:.1}", goal.target_hours)),
            )]);
        }

        Ok(Vec::new())
    }
}
