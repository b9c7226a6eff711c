//! SP-02: Rule engines and the evaluator.
//!
//! Each guidance domain (tracker staleness, deadlines, profile gaps,
//! milestones) is an independent [`RuleEngine`]: a pure function from a
//! [`UserSnapshot`] to candidate nudges. Engines never read interaction
//! state and never consult the wall clock, so one snapshot always yields
//! one candidate set. Suppression happens later, in [`crate::pipeline`].

pub mod clinical_catchup;
pub mod deadline_proximity;
pub mod eq_reflection;
pub mod goal_pacing;
pub mod milestones;
pub mod profile_completeness;
pub mod shadow_refresh;
pub mod stage_next_step;

use thiserror::Error;

use crate::nudge::Nudge;
use crate::snapshot::UserSnapshot;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("rule evaluation failed: {0}")]
    Failed(String),
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// One per guidance domain. Self-contained, independently testable.
pub trait RuleEngine: Send + Sync {
    /// Stable identifier, stamped onto every nudge this engine emits.
    fn id(&self) -> &'static str;

    /// Inspect the snapshot and return candidate nudges.
    ///
    /// Must be deterministic for a given snapshot. Date arithmetic uses
    /// `snapshot.captured_at`, never the wall clock. Missing snapshot fields
    /// mean the rule does not fire; they are not errors.
    fn evaluate(&self, snapshot: &UserSnapshot) -> Result<Vec<Nudge>, EngineError>;
}

// ─── Evaluator ───────────────────────────────────────────────────────────────

/// Runs every registered engine over one snapshot and merges the results.
pub struct Evaluator {
    engines: Vec<Box<dyn RuleEngine>>,
}

impl Evaluator {
    /// An evaluator with no engines. Callers compose their own set via
    /// [`register`](Self::register).
    pub fn new() -> Self {
        Self {
            engines: Vec::new(),
        }
    }

    /// The full built-in engine set. Registration order is the documented
    /// tie-break order for equal-urgency nudges downstream.
    pub fn with_default_engines() -> Self {
        let mut evaluator = Self::new();
        evaluator.register(Box::new(clinical_catchup::ClinicalCatchupEngine));
        evaluator.register(Box::new(eq_reflection::EqReflectionEngine));
        evaluator.register(Box::new(shadow_refresh::ShadowRefreshEngine));
        evaluator.register(Box::new(deadline_proximity::DeadlineProximityEngine));
        evaluator.register(Box::new(profile_completeness::ProfileCompletenessEngine));
        evaluator.register(Box::new(stage_next_step::StageNextStepEngine));
        evaluator.register(Box::new(goal_pacing::GoalPacingEngine));
        evaluator.register(Box::new(milestones::MilestonesEngine));
        evaluator
    }

    pub fn register(&mut self, engine: Box<dyn RuleEngine>) {
        self.engines.push(engine);
    }

    /// Registered engine ids, in registration order.
    pub fn engine_ids(&self) -> Vec<&'static str> {
        self.engines.iter().map(|e| e.id()).collect()
    }

    /// Run every engine and concatenate candidates in registration order,
    /// stamping each nudge's `engine_id`.
    ///
    /// Resilient: a failing engine logs a warning and contributes nothing
    /// for this pass; the other engines still run.
    pub fn evaluate_all(&self, snapshot: &UserSnapshot) -> Vec<Nudge> {
        let mut candidates: Vec<Nudge> = Vec::new();

        for engine in &self.engines {
            match engine.evaluate(snapshot) {
                Ok(nudges) => {
                    for mut nudge in nudges {
                        nudge.engine_id = engine.id().to_string();
                        candidates.push(nudge);
                    }
                }
                Err(e) => {
                    tracing::warn!("Rule engine {} failed: {e}", engine.id());
                }
            }
        }

        candidates
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::with_default_engines()
    }
}
