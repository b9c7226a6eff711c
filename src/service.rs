//! SP-05: Guidance facade and interaction API.
//!
//! [`Guidance`] ties the evaluator, the pipeline, and the state store
//! together. It is also the only surface allowed to mutate stored state, so
//! every suppression transition funnels through one audited place.
//!
//! Every mutation is optimistic: the session cache is updated first and the
//! backend write is best-effort. A user whose store is unreachable still
//! gets working dismiss/snooze behavior for the rest of the session.
//!
//! Each mutating operation has an `_at` sibling taking an explicit
//! timestamp. The plain forms stamp `Utc::now()`; the `_at` forms exist for
//! deterministic tests and for callers replaying recorded interactions.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::config::DEFAULT_SNOOZE_DAYS;
use crate::engines::Evaluator;
use crate::pipeline::{categorize, GuidanceSet};
use crate::snapshot::UserSnapshot;
use crate::store::{
    DismissType, DismissalRecord, InteractionRecord, NudgeState, StateBackend, StateStore,
};

/// The guidance engine: evaluation front door plus the interaction API.
pub struct Guidance {
    evaluator: Evaluator,
    store: StateStore,
}

impl Guidance {
    pub fn new(evaluator: Evaluator, store: StateStore) -> Self {
        Self { evaluator, store }
    }

    /// Default engine set over the given backend.
    pub fn with_defaults(backend: Arc<dyn StateBackend>) -> Self {
        Self::new(Evaluator::with_default_engines(), StateStore::new(backend))
    }

    /// Default engine set over an in-memory store. For tests and ephemeral
    /// embedding.
    pub fn in_memory() -> Self {
        Self::new(Evaluator::with_default_engines(), StateStore::in_memory())
    }

    /// Registered engine ids, in registration (tie-break) order.
    pub fn engine_ids(&self) -> Vec<&'static str> {
        self.evaluator.engine_ids()
    }

    // ─── Evaluation ──────────────────────────────────────────

    /// Run every engine over the snapshot and categorize the results.
    ///
    /// The user's state blob is loaded once per call, so the suppression
    /// checks see one consistent state even if interaction calls land
    /// mid-pass. Suppression windows are measured against
    /// `snapshot.captured_at`, which keeps the whole evaluation a pure
    /// function of its inputs.
    pub fn evaluate(&self, user_id: &str, snapshot: &UserSnapshot) -> GuidanceSet {
        let candidates = self.evaluator.evaluate_all(snapshot);
        let blob = self.store.load(user_id);
        categorize(candidates, &blob, snapshot.captured_at)
    }

    // ─── Interaction API ─────────────────────────────────────

    /// Record that a nudge was rendered. Append-only; duplicate calls per
    /// render are tolerated, not corrupting.
    pub fn mark_shown(&self, user_id: &str, nudge_id: &str) {
        self.mark_shown_at(user_id, nudge_id, Utc::now());
    }

    pub fn mark_shown_at(&self, user_id: &str, nudge_id: &str, at: DateTime<Utc>) {
        self.store.update_blob(user_id, |blob| {
            blob.prompt_interactions.push(InteractionRecord {
                prompt_id: nudge_id.to_string(),
                shown_at: at,
                action: "shown".to_string(),
            });
            blob.last_nudge_shown.insert(nudge_id.to_string(), at);
        });
    }

    /// Temporary dismiss: suppresses the nudge for 24 hours and bumps the
    /// dismiss counter. Never sets the permanent flag; that escalation is
    /// the caller's decision (see [`dismiss_with_policy`](Self::dismiss_with_policy)).
    pub fn dismiss(&self, user_id: &str, nudge_id: &str) {
        self.dismiss_at(user_id, nudge_id, Utc::now());
    }

    pub fn dismiss_at(&self, user_id: &str, nudge_id: &str, at: DateTime<Utc>) {
        self.store.update_blob(user_id, |blob| {
            let state = blob.nudge_state_mut(nudge_id);
            state.dismiss_count += 1;
            state.last_dismissed_at = Some(at);
            blob.prompt_interactions.push(InteractionRecord {
                prompt_id: nudge_id.to_string(),
                shown_at: at,
                action: "dismissed".to_string(),
            });
        });
    }

    /// Dismiss, then promote to permanent once the lifetime dismiss count
    /// reaches `auto_permanent_after`. The host UI picks the threshold per
    /// surface (observed values are 3 and 5).
    pub fn dismiss_with_policy(&self, user_id: &str, nudge_id: &str, auto_permanent_after: u32) {
        self.dismiss_with_policy_at(user_id, nudge_id, auto_permanent_after, Utc::now());
    }

    pub fn dismiss_with_policy_at(
        &self,
        user_id: &str,
        nudge_id: &str,
        auto_permanent_after: u32,
        at: DateTime<Utc>,
    ) {
        self.store.update_blob(user_id, |blob| {
            let state = blob.nudge_state_mut(nudge_id);
            state.dismiss_count += 1;
            state.last_dismissed_at = Some(at);
            let promoted = state.dismiss_count >= auto_permanent_after;
            if promoted {
                state.permanently_dismissed = true;
            }
            blob.prompt_interactions.push(InteractionRecord {
                prompt_id: nudge_id.to_string(),
                shown_at: at,
                action: "dismissed".to_string(),
            });
            if promoted {
                blob.dismissed_prompts.push(DismissalRecord {
                    prompt_id: nudge_id.to_string(),
                    context: None,
                    dismissed_at: at,
                    dismiss_type: DismissType::Permanent,
                });
            }
        });
    }

    /// Suppress the nudge forever for this user.
    pub fn permanently_dismiss(&self, user_id: &str, nudge_id: &str) {
        self.permanently_dismiss_at(user_id, nudge_id, Utc::now());
    }

    pub fn permanently_dismiss_at(&self, user_id: &str, nudge_id: &str, at: DateTime<Utc>) {
        self.store.update_blob(user_id, |blob| {
            blob.nudge_state_mut(nudge_id).permanently_dismissed = true;
            blob.dismissed_prompts.push(DismissalRecord {
                prompt_id: nudge_id.to_string(),
                context: None,
                dismissed_at: at,
                dismiss_type: DismissType::Permanent,
            });
        });
    }

    /// Suppress the nudge for `days` days. The audit record carries the
    /// nearest preset label (7d below 30 days, 30d from there up); the
    /// exact expiry always lives in the nudge state itself.
    pub fn snooze(&self, user_id: &str, nudge_id: &str, days: u32) {
        self.snooze_at(user_id, nudge_id, days, Utc::now());
    }

    /// Snooze for the standard week.
    pub fn snooze_default(&self, user_id: &str, nudge_id: &str) {
        self.snooze(user_id, nudge_id, DEFAULT_SNOOZE_DAYS);
    }

    pub fn snooze_at(&self, user_id: &str, nudge_id: &str, days: u32, at: DateTime<Utc>) {
        let until = at + Duration::days(i64::from(days));
        self.store.update_blob(user_id, |blob| {
            blob.nudge_state_mut(nudge_id).snoozed_until = Some(until);
            blob.dismissed_prompts.push(DismissalRecord {
                prompt_id: nudge_id.to_string(),
                context: None,
                dismissed_at: at,
                dismiss_type: DismissType::for_snooze(days),
            });
        });
    }

    /// Page-scoped prompt dismissal: permanent or preset snooze, with the
    /// page context carried into the audit record.
    pub fn dismiss_prompt(
        &self,
        user_id: &str,
        prompt_id: &str,
        context: Option<&str>,
        kind: DismissType,
    ) {
        self.dismiss_prompt_at(user_id, prompt_id, context, kind, Utc::now());
    }

    pub fn dismiss_prompt_at(
        &self,
        user_id: &str,
        prompt_id: &str,
        context: Option<&str>,
        kind: DismissType,
        at: DateTime<Utc>,
    ) {
        self.store.update_blob(user_id, |blob| {
            let state = blob.nudge_state_mut(prompt_id);
            match kind.snooze_days() {
                Some(days) => state.snoozed_until = Some(at + Duration::days(i64::from(days))),
                None => state.permanently_dismissed = true,
            }
            blob.dismissed_prompts.push(DismissalRecord {
                prompt_id: prompt_id.to_string(),
                context: context.map(str::to_string),
                dismissed_at: at,
                dismiss_type: kind,
            });
        });
    }

    /// Mark a celebration as viewed. Idempotent; the event id never
    /// re-enters the celebration queue.
    pub fn mark_celebrated(&self, user_id: &str, event_id: &str) {
        self.store.update_blob(user_id, |blob| {
            blob.celebrated_events.insert(event_id.to_string());
        });
    }

    /// Clear one nudge's suppression state and its last-shown stamp.
    /// The append-only interaction and dismissal logs are kept.
    pub fn reset_nudge(&self, user_id: &str, nudge_id: &str) {
        self.store.update_blob(user_id, |blob| {
            blob.tracker_nudges.remove(nudge_id);
            blob.last_nudge_shown.remove(nudge_id);
        });
    }

    /// Clear all state for a user. Admin/testing escape hatch.
    pub fn reset(&self, user_id: &str) {
        self.store.reset(user_id);
    }

    // ─── Read side ───────────────────────────────────────────

    /// Suppression state for one nudge (zero-valued default when absent).
    pub fn nudge_state(&self, user_id: &str, nudge_id: &str) -> NudgeState {
        self.store.nudge_state(user_id, nudge_id)
    }

    /// Lifetime dismiss count, for caller-side permanence policies.
    pub fn dismiss_count(&self, user_id: &str, nudge_id: &str) -> u32 {
        self.store.nudge_state(user_id, nudge_id).dismiss_count
    }

    /// When the nudge was last rendered, if ever. For frequency capping in
    /// the host UI; suppression never reads it.
    pub fn last_shown(&self, user_id: &str, nudge_id: &str) -> Option<DateTime<Utc>> {
        self.store.load(user_id).last_nudge_shown.get(nudge_id).copied()
    }

    pub fn is_celebrated(&self, user_id: &str, event_id: &str) -> bool {
        self.store.load(user_id).is_celebrated(event_id)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
