//! Core nudge types shared by the rule engines and the delivery pipeline.
//!
//! A `Nudge` is one candidate recommendation: a stable id (used for dedup and
//! suppression-state lookups), the engine that produced it, an urgency rank,
//! the UI surface it targets, and a display payload the pipeline never
//! inspects.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::store::StoreError;

// ─── Urgency ─────────────────────────────────────────────────────────────────

/// Urgency rank for sorting and badge stats.
///
/// Declaration order is sort order: an ascending sort puts critical nudges
/// first. `rank()` exposes the same ordering as a number for display code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Critical,
    High,
    Medium,
    Low,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// 0 = critical … 3 = low.
    pub fn rank(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Surface ─────────────────────────────────────────────────────────────────

/// The UI location a nudge is destined for.
///
/// String form (used in the serialized consumer output): `dashboard`,
/// `inline:<page_key>`, `mobile`, `celebration`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Surface {
    /// The main dashboard feed.
    Dashboard,
    /// A page-local slot, keyed by the host app's page key (e.g. "profile").
    Inline(String),
    /// The single-slot mobile banner.
    Mobile,
    /// The celebration queue (confetti-style, shown once per event id).
    Celebration,
}

impl Surface {
    /// Convenience constructor for inline surfaces.
    pub fn inline(page_key: impl Into<String>) -> Self {
        Self::Inline(page_key.into())
    }

    /// The page key, when this is an inline surface.
    pub fn page_key(&self) -> Option<&str> {
        match self {
            Self::Inline(key) => Some(key),
            _ => None,
        }
    }
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dashboard => f.write_str("dashboard"),
            Self::Inline(key) => write!(f, "inline:{key}"),
            Self::Mobile => f.write_str("mobile"),
            Self::Celebration => f.write_str("celebration"),
        }
    }
}

impl FromStr for Surface {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dashboard" => Ok(Self::Dashboard),
            "mobile" => Ok(Self::Mobile),
            "celebration" => Ok(Self::Celebration),
            other => match other.strip_prefix("inline:") {
                Some(key) if !key.is_empty() => Ok(Self::Inline(key.to_string())),
                _ => Err(StoreError::InvalidEnum {
                    field: "Surface".into(),
                    value: s.into(),
                }),
            },
        }
    }
}

impl Serialize for Surface {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Surface {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

// ─── Nudge ───────────────────────────────────────────────────────────────────

/// Display content for one nudge. Opaque to the pipeline; only the host UI
/// reads it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NudgePayload {
    pub headline: String,
    pub body: String,
    /// Route in the host app, e.g. "/trackers/clinical".
    pub link: Option<String>,
    /// Structured values for the UI (counts, names, dates).
    pub params: HashMap<String, String>,
}

impl NudgePayload {
    pub fn new(headline: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            headline: headline.into(),
            body: body.into(),
            link: None,
            params: HashMap::new(),
        }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// One candidate recommendation.
///
/// `id` must be stable: the same conceptual nudge resolves to the same id on
/// every evaluation, so dismissal state recorded against it keeps applying.
/// Engines namespace ids with their own prefix (`deadline_…`, `stage_…`) and
/// celebration nudges use their id as the celebrated-event id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nudge {
    pub id: String,
    /// Which engine produced this nudge. Stamped by the evaluator.
    pub engine_id: String,
    pub urgency: Urgency,
    pub surface: Surface,
    pub payload: NudgePayload,
}

impl Nudge {
    /// Build a nudge with an empty `engine_id`; the evaluator fills it in.
    pub fn new(
        id: impl Into<String>,
        urgency: Urgency,
        surface: Surface,
        payload: NudgePayload,
    ) -> Self {
        Self {
            id: id.into(),
            engine_id: String::new(),
            urgency,
            surface,
            payload,
        }
    }

    pub fn is_celebration(&self) -> bool {
        self.surface == Surface::Celebration
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urgency_orders_critical_first() {
        let mut urgencies = vec![Urgency::Low, Urgency::Critical, Urgency::Medium, Urgency::High];
        urgencies.sort();
        assert_eq!(
            urgencies,
            vec![Urgency::Critical, Urgency::High, Urgency::Medium, Urgency::Low]
        );
    }

    #[test]
    fn urgency_rank_matches_order() {
        assert_eq!(Urgency::Critical.rank(), 0);
        assert_eq!(Urgency::High.rank(), 1);
        assert_eq!(Urgency::Medium.rank(), 2);
        assert_eq!(Urgency::Low.rank(), 3);
    }

    #[test]
    fn urgency_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Urgency::Critical).unwrap(), "\"critical\"");
        assert_eq!(serde_json::to_string(&Urgency::Low).unwrap(), "\"low\"");
    }

    #[test]
    fn surface_round_trips_through_strings() {
        for surface in [
            Surface::Dashboard,
            Surface::inline("profile"),
            Surface::Mobile,
            Surface::Celebration,
        ] {
            let parsed: Surface = surface.to_string().parse().unwrap();
            assert_eq!(parsed, surface);
        }
    }

    #[test]
    fn surface_inline_formats_with_page_key() {
        assert_eq!(Surface::inline("profile").to_string(), "inline:profile");
        assert_eq!(Surface::inline("profile").page_key(), Some("profile"));
        assert_eq!(Surface::Dashboard.page_key(), None);
    }

    #[test]
    fn surface_rejects_unknown_and_empty_inline() {
        assert!("banner".parse::<Surface>().is_err());
        assert!("inline:".parse::<Surface>().is_err());
    }

    #[test]
    fn surface_serde_uses_string_form() {
        let json = serde_json::to_string(&Surface::inline("programs")).unwrap();
        assert_eq!(json, "\"inline:programs\"");
        let back: Surface = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Surface::inline("programs"));
    }

    #[test]
    fn payload_builder_sets_fields() {
        let payload = NudgePayload::new("Log your hours", "4 days since your last entry")
            .with_link("/trackers/clinical")
            .with_param("days", "4");
        assert_eq!(payload.link.as_deref(), Some("/trackers/clinical"));
        assert_eq!(payload.params["days"], "4");
    }

    #[test]
    fn new_nudge_has_empty_engine_id() {
        let nudge = Nudge::new(
            "clinical_catchup",
            Urgency::Medium,
            Surface::Dashboard,
            NudgePayload::new("a", "b"),
        );
        assert!(nudge.engine_id.is_empty());
        assert!(!nudge.is_celebration());
    }

    #[test]
    fn nudge_serializes_engine_id_camel_case() {
        let mut nudge = Nudge::new(
            "clinical_catchup",
            Urgency::Medium,
            Surface::Dashboard,
            NudgePayload::new("a", "b"),
        );
        nudge.engine_id = "clinical_catchup".into();

        let value: serde_json::Value = serde_json::to_value(&nudge).unwrap();
        assert_eq!(value["engineId"], "clinical_catchup");
        assert_eq!(value["urgency"], "medium");
        assert_eq!(value["surface"], "dashboard");
    }
}
