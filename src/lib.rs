//! Preceptor: the guidance / smart-prompts engine for the CRNA mentorship
//! platform. Rule engines read an applicant snapshot and emit prioritized
//! nudges; per-user dismiss/snooze/celebration state survives across
//! sessions through a pluggable store.

pub mod config;
pub mod snapshot; // SP-01: Applicant state snapshot
pub mod nudge;
pub mod store; // SP-03: Durable per-user guidance state
pub mod engines; // SP-02: Rule engine registry + evaluator
pub mod pipeline; // SP-04: Filter / dedup / priority stage
pub mod service; // SP-05: Interaction API facade

pub use engines::{EngineError, Evaluator, RuleEngine};
pub use nudge::{Nudge, NudgePayload, Surface, Urgency};
pub use pipeline::{categorize, GuidanceSet, GuidanceStats};
pub use service::Guidance;
pub use snapshot::{ApplicationStage, ProfileFacets, TargetProgram, UserSnapshot, WeeklyGoal};
pub use store::{
    DismissType, MemoryBackend, NudgeState, SqliteBackend, StateBackend, StateBlob, StateStore,
    StoreError,
};
