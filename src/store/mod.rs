//! SP-03: Durable per-user guidance state.
//!
//! One `StateBlob` per platform user holds everything the pipeline needs to
//! suppress nudges (dismiss counts, snooze expirations, permanent flags),
//! the append-only interaction log, and the set of already-shown
//! celebrations. The blob travels through an injected [`StateBackend`]
//! (in-memory for tests, SQLite for the shipped adapter, anything else for
//! integrators), while [`StateStore`] keeps a process-wide session cache in
//! front of it.
//!
//! Failure posture: the store never blocks guidance. A backend read that
//! fails or does not parse yields an empty default blob; a failed write is
//! logged and swallowed, and the cached value stays authoritative for the
//! rest of the session.

pub mod sqlite;

pub use sqlite::SqliteBackend;

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::DISMISS_SUPPRESS_HOURS;

// ═══════════════════════════════════════════════════════════
// Error types
// ═══════════════════════════════════════════════════════════

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("State serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

// ═══════════════════════════════════════════════════════════
// Per-nudge records
// ═══════════════════════════════════════════════════════════

/// Suppression state for one `(user, nudge)` pair.
///
/// Created lazily on first interaction. The three suppression conditions are
/// independent: any one of them hides the nudge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NudgeState {
    pub dismiss_count: u32,
    pub permanently_dismissed: bool,
    pub snoozed_until: Option<DateTime<Utc>>,
    pub last_dismissed_at: Option<DateTime<Utc>>,
}

impl NudgeState {
    /// Whether this nudge is hidden at `now`.
    ///
    /// Permanent dismissal never expires. A snooze suppresses while
    /// `snoozed_until` lies in the future. A temporary dismiss suppresses
    /// for [`DISMISS_SUPPRESS_HOURS`] after `last_dismissed_at`; at exactly
    /// the window boundary the nudge is visible again.
    pub fn is_suppressed(&self, now: DateTime<Utc>) -> bool {
        if self.permanently_dismissed {
            return true;
        }
        if let Some(until) = self.snoozed_until {
            if until > now {
                return true;
            }
        }
        if let Some(dismissed_at) = self.last_dismissed_at {
            if now.signed_duration_since(dismissed_at) < Duration::hours(DISMISS_SUPPRESS_HOURS) {
                return true;
            }
        }
        false
    }
}

/// How a prompt was dismissed, for the audit trail. The wire set is closed
/// (`permanent`, `snooze_7d`, `snooze_30d`); arbitrary snooze lengths map to
/// the nearest label while the exact expiry lives in `tracker_nudges`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DismissType {
    #[serde(rename = "permanent")]
    Permanent,
    #[serde(rename = "snooze_7d")]
    Snooze7d,
    #[serde(rename = "snooze_30d")]
    Snooze30d,
}

impl DismissType {
    pub fn for_snooze(days: u32) -> Self {
        if days >= 30 {
            Self::Snooze30d
        } else {
            Self::Snooze7d
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Permanent => "permanent",
            Self::Snooze7d => "snooze_7d",
            Self::Snooze30d => "snooze_30d",
        }
    }

    /// Snooze length implied by the label; `None` for permanent.
    pub fn snooze_days(&self) -> Option<u32> {
        match self {
            Self::Permanent => None,
            Self::Snooze7d => Some(7),
            Self::Snooze30d => Some(30),
        }
    }
}

/// Audit record of one permanent/snooze decision, with the page context the
/// decision was made on when the caller supplied one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DismissalRecord {
    pub prompt_id: String,
    pub context: Option<String>,
    pub dismissed_at: DateTime<Utc>,
    pub dismiss_type: DismissType,
}

/// Append-only interaction log entry. Write-only from the engine's
/// perspective; suppression never reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionRecord {
    pub prompt_id: String,
    pub shown_at: DateTime<Utc>,
    pub action: String,
}

// ═══════════════════════════════════════════════════════════
// StateBlob: the per-user aggregate
// ═══════════════════════════════════════════════════════════

/// Everything persisted for one user, as one JSON document.
///
/// Deserialization is lenient: missing keys default, unknown keys are
/// ignored, so older or partially written blobs still load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateBlob {
    pub tracker_nudges: HashMap<String, NudgeState>,
    pub dismissed_prompts: Vec<DismissalRecord>,
    pub prompt_interactions: Vec<InteractionRecord>,
    pub celebrated_events: BTreeSet<String>,
    pub last_nudge_shown: HashMap<String, DateTime<Utc>>,
}

impl StateBlob {
    /// Suppression state for `nudge_id`, zero-valued when never interacted
    /// with.
    pub fn nudge_state(&self, nudge_id: &str) -> NudgeState {
        self.tracker_nudges.get(nudge_id).cloned().unwrap_or_default()
    }

    /// Mutable suppression state, created lazily.
    pub fn nudge_state_mut(&mut self, nudge_id: &str) -> &mut NudgeState {
        self.tracker_nudges.entry(nudge_id.to_string()).or_default()
    }

    pub fn is_celebrated(&self, event_id: &str) -> bool {
        self.celebrated_events.contains(event_id)
    }

    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string(self)?)
    }
}

// ═══════════════════════════════════════════════════════════
// StateBackend: the injected durable transport
// ═══════════════════════════════════════════════════════════

/// Durable transport for serialized state blobs.
///
/// Implementations move opaque JSON strings; they never interpret the blob.
/// Writes are last-writer-wins: no merge across concurrent writers, and
/// multi-device conflicts are out of scope.
pub trait StateBackend: Send + Sync {
    /// Fetch the stored blob, `None` when the user has no row yet.
    fn load(&self, user_id: &str) -> Result<Option<String>, StoreError>;

    /// Persist the blob, replacing any previous value.
    fn save(&self, user_id: &str, blob: &str) -> Result<(), StoreError>;

    /// Remove the user's row entirely.
    fn delete(&self, user_id: &str) -> Result<(), StoreError>;
}

/// HashMap-backed backend for tests and ephemeral embedding.
#[derive(Default)]
pub struct MemoryBackend {
    rows: RwLock<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed a row (test helper for corrupt/legacy blobs).
    pub fn seed(&self, user_id: &str, blob: &str) {
        if let Ok(mut rows) = self.rows.write() {
            rows.insert(user_id.to_string(), blob.to_string());
        }
    }
}

impl StateBackend for MemoryBackend {
    fn load(&self, user_id: &str) -> Result<Option<String>, StoreError> {
        let rows = self
            .rows
            .read()
            .map_err(|_| StoreError::Unavailable("memory backend lock poisoned".into()))?;
        Ok(rows.get(user_id).cloned())
    }

    fn save(&self, user_id: &str, blob: &str) -> Result<(), StoreError> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| StoreError::Unavailable("memory backend lock poisoned".into()))?;
        rows.insert(user_id.to_string(), blob.to_string());
        Ok(())
    }

    fn delete(&self, user_id: &str) -> Result<(), StoreError> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| StoreError::Unavailable("memory backend lock poisoned".into()))?;
        rows.remove(user_id);
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════
// StateStore: session cache over the backend
// ═══════════════════════════════════════════════════════════

/// Session cache plus durable backend for per-user guidance state.
///
/// All reads and writes go through here. `load` never fails; `save` is
/// best-effort with the cache staying authoritative. The interaction API in
/// [`crate::service`] is the only intended mutation caller.
pub struct StateStore {
    backend: Arc<dyn StateBackend>,
    cache: RwLock<HashMap<String, StateBlob>>,
}

impl StateStore {
    pub fn new(backend: Arc<dyn StateBackend>) -> Self {
        Self {
            backend,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Store over a fresh [`MemoryBackend`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Load the user's blob: session cache first, then the backend.
    ///
    /// Fails soft. A backend error returns an empty default without caching
    /// it (the next load retries); an unparseable stored blob logs a warning
    /// and caches the default, so the bad row is only replaced on the next
    /// successful save.
    pub fn load(&self, user_id: &str) -> StateBlob {
        if let Ok(cache) = self.cache.read() {
            if let Some(blob) = cache.get(user_id) {
                return blob.clone();
            }
        }

        let blob = match self.backend.load(user_id) {
            Ok(Some(json)) => match StateBlob::from_json(&json) {
                Ok(blob) => blob,
                Err(e) => {
                    tracing::warn!("Stored guidance state for {user_id} unreadable: {e}");
                    StateBlob::default()
                }
            },
            Ok(None) => StateBlob::default(),
            Err(e) => {
                tracing::warn!("Guidance state load failed for {user_id}: {e}");
                return StateBlob::default();
            }
        };

        if let Ok(mut cache) = self.cache.write() {
            cache.insert(user_id.to_string(), blob.clone());
        }
        blob
    }

    /// Persist the user's blob: cache first (authoritative), then a
    /// best-effort backend write. Failures are logged, never surfaced.
    pub fn save(&self, user_id: &str, blob: StateBlob) {
        let json = blob.to_json();

        if let Ok(mut cache) = self.cache.write() {
            cache.insert(user_id.to_string(), blob);
        }

        match json {
            Ok(json) => {
                if let Err(e) = self.backend.save(user_id, &json) {
                    tracing::warn!("Guidance state save failed for {user_id}: {e}");
                }
            }
            Err(e) => {
                tracing::warn!("Guidance state for {user_id} did not serialize: {e}");
            }
        }
    }

    /// Read one nudge's suppression state (zero-valued default when absent).
    pub fn nudge_state(&self, user_id: &str, nudge_id: &str) -> NudgeState {
        self.load(user_id).nudge_state(nudge_id)
    }

    /// Load-mutate-save on the whole blob.
    pub fn update_blob<F: FnOnce(&mut StateBlob)>(&self, user_id: &str, mutate: F) {
        let mut blob = self.load(user_id);
        mutate(&mut blob);
        self.save(user_id, blob);
    }

    /// Apply a pure mutation to one nudge's state (created lazily) and
    /// persist the result. Returns the state after the mutation.
    pub fn update_nudge_state<F: FnOnce(&mut NudgeState)>(
        &self,
        user_id: &str,
        nudge_id: &str,
        mutate: F,
    ) -> NudgeState {
        let mut result = NudgeState::default();
        self.update_blob(user_id, |blob| {
            let state = blob.nudge_state_mut(nudge_id);
            mutate(state);
            result = state.clone();
        });
        result
    }

    /// Clear all state for a user: cache entry and backend row.
    /// Admin/testing escape hatch.
    pub fn reset(&self, user_id: &str) {
        if let Ok(mut cache) = self.cache.write() {
            cache.remove(user_id);
        }
        if let Err(e) = self.backend.delete(user_id) {
            tracing::warn!("Guidance state reset failed for {user_id}: {e}");
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
