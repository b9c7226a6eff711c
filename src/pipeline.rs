//! SP-04: Filter / dedup / priority stage.
//!
//! Turns raw engine candidates into the categorized, render-ready
//! [`GuidanceSet`] consumers receive. Pure function of
//! `(candidates, StateBlob, now)`: suppression state is read from the blob
//! the caller already loaded, so one evaluation sees one consistent state
//! snapshot no matter what the interaction API does concurrently.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::nudge::{Nudge, Surface, Urgency};
use crate::store::StateBlob;

// ─── Output types ────────────────────────────────────────────────────────────

/// Urgency tallies over the actionable (non-celebration) output, for badge
/// and summary UI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuidanceStats {
    pub total: usize,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl GuidanceStats {
    fn bump(&mut self, urgency: Urgency) {
        self.total += 1;
        match urgency {
            Urgency::Critical => self.critical += 1,
            Urgency::High => self.high += 1,
            Urgency::Medium => self.medium += 1,
            Urgency::Low => self.low += 1,
        }
    }
}

/// Categorized evaluation output, shaped for direct serialization to the
/// host UI: `dashboard`, `inline` (keyed by page), `mobile` (zero or one),
/// `celebrations`, `stats`, `byEngine`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuidanceSet {
    pub dashboard: Vec<Nudge>,
    pub inline: BTreeMap<String, Vec<Nudge>>,
    pub mobile: Vec<Nudge>,
    pub celebrations: Vec<Nudge>,
    pub stats: GuidanceStats,
    pub by_engine: BTreeMap<String, Vec<Nudge>>,
}

impl GuidanceSet {
    /// Nudges for one page's inline slot, empty when the page has none.
    pub fn inline_for(&self, page_key: &str) -> &[Nudge] {
        self.inline.get(page_key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The single nudge chosen for the mobile slot, if any.
    pub fn mobile_nudge(&self) -> Option<&Nudge> {
        self.mobile.first()
    }

    /// No nudges on any surface.
    pub fn is_empty(&self) -> bool {
        self.dashboard.is_empty()
            && self.inline.values().all(Vec::is_empty)
            && self.mobile.is_empty()
            && self.celebrations.is_empty()
    }
}

// ─── Stage ───────────────────────────────────────────────────────────────────

/// Filter, dedup, sort, and partition raw candidates.
///
/// 1. Drop candidates the blob suppresses at `now` (permanent flag, future
///    snooze, or a dismissal inside the 24 h window; any one suffices).
/// 2. Dedup by id, first occurrence wins.
/// 3. Stable sort by urgency, critical first. Stability keeps engine
///    registration order as the tie-break within a rank.
/// 4. Partition by surface. The mobile slot takes the single top actionable
///    nudge across all surfaces; a nudge declared `Surface::Mobile` competes
///    for that slot and renders nowhere else. Celebrations already present
///    in `celebrated_events` are dropped for good.
///
/// `stats` counts actionable output only; `by_engine` groups every
/// surviving nudge, celebrations included.
pub fn categorize(candidates: Vec<Nudge>, blob: &StateBlob, now: DateTime<Utc>) -> GuidanceSet {
    let mut nudges: Vec<Nudge> = candidates
        .into_iter()
        .filter(|nudge| {
            blob.tracker_nudges
                .get(&nudge.id)
                .map_or(true, |state| !state.is_suppressed(now))
        })
        .collect();

    let mut seen = HashSet::new();
    nudges.retain(|nudge| seen.insert(nudge.id.clone()));

    nudges.sort_by_key(|nudge| nudge.urgency);

    let mut set = GuidanceSet::default();
    for nudge in nudges {
        if nudge.is_celebration() {
            if blob.is_celebrated(&nudge.id) {
                continue;
            }
        } else {
            set.stats.bump(nudge.urgency);
            if set.mobile.is_empty() {
                set.mobile.push(nudge.clone());
            }
        }

        set.by_engine
            .entry(nudge.engine_id.clone())
            .or_default()
            .push(nudge.clone());

        match nudge.surface {
            Surface::Dashboard => set.dashboard.push(nudge),
            Surface::Inline(ref key) => {
                let key = key.clone();
                set.inline.entry(key).or_default().push(nudge);
            }
            Surface::Mobile => {}
            Surface::Celebration => set.celebrations.push(nudge),
        }
    }

    set
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nudge::NudgePayload;
    use crate::store::NudgeState;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    fn nudge(id: &str, engine: &str, urgency: Urgency, surface: Surface) -> Nudge {
        let mut nudge = Nudge::new(id, urgency, surface, NudgePayload::new(id, "body"));
        nudge.engine_id = engine.into();
        nudge
    }

    fn blob_with(id: &str, state: NudgeState) -> StateBlob {
        let mut blob = StateBlob::default();
        blob.tracker_nudges.insert(id.into(), state);
        blob
    }

    #[test]
    fn empty_candidates_yield_empty_set() {
        let set = categorize(Vec::new(), &StateBlob::default(), now());
        assert!(set.is_empty());
        assert_eq!(set.stats, GuidanceStats::default());
    }

    #[test]
    fn priority_sort_is_stable() {
        let candidates = vec![
            nudge("a", "e1", Urgency::Low, Surface::Dashboard),
            nudge("b", "e2", Urgency::Critical, Surface::Dashboard),
            nudge("c", "e3", Urgency::Medium, Surface::Dashboard),
            nudge("d", "e4", Urgency::Critical, Surface::Dashboard),
        ];
        let set = categorize(candidates, &StateBlob::default(), now());
        let order: Vec<_> = set.dashboard.iter().map(|n| n.id.as_str()).collect();
        // Both criticals first, original relative order kept between them
        assert_eq!(order, vec!["b", "d", "c", "a"]);
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let candidates = vec![
            nudge("x", "engine_one", Urgency::Medium, Surface::Dashboard),
            nudge("x", "engine_two", Urgency::Critical, Surface::Dashboard),
        ];
        let set = categorize(candidates, &StateBlob::default(), now());
        assert_eq!(set.dashboard.len(), 1);
        assert_eq!(set.dashboard[0].engine_id, "engine_one");
        assert_eq!(set.stats.total, 1);
    }

    #[test]
    fn permanent_dismissal_suppresses_everywhere() {
        let blob = blob_with(
            "x",
            NudgeState {
                permanently_dismissed: true,
                ..Default::default()
            },
        );
        let candidates = vec![nudge("x", "e", Urgency::Critical, Surface::Dashboard)];
        let set = categorize(candidates, &blob, now());
        assert!(set.is_empty());
        assert!(set.by_engine.is_empty());
        assert_eq!(set.stats.total, 0);
    }

    #[test]
    fn dismissal_window_boundary() {
        let candidates = || vec![nudge("x", "e", Urgency::Medium, Surface::Dashboard)];

        // Dismissed 23h59m ago: still hidden
        let blob = blob_with(
            "x",
            NudgeState {
                dismiss_count: 1,
                last_dismissed_at: Some(now() - Duration::hours(23) - Duration::minutes(59)),
                ..Default::default()
            },
        );
        assert!(categorize(candidates(), &blob, now()).is_empty());

        // Dismissed 24h01m ago: visible again
        let blob = blob_with(
            "x",
            NudgeState {
                dismiss_count: 1,
                last_dismissed_at: Some(now() - Duration::hours(24) - Duration::minutes(1)),
                ..Default::default()
            },
        );
        assert_eq!(categorize(candidates(), &blob, now()).dashboard.len(), 1);
    }

    #[test]
    fn snooze_boundary() {
        let candidates = || vec![nudge("x", "e", Urgency::Medium, Surface::Dashboard)];

        let blob = blob_with(
            "x",
            NudgeState {
                snoozed_until: Some(now() + Duration::minutes(1)),
                ..Default::default()
            },
        );
        assert!(categorize(candidates(), &blob, now()).is_empty());

        let blob = blob_with(
            "x",
            NudgeState {
                snoozed_until: Some(now() - Duration::minutes(1)),
                ..Default::default()
            },
        );
        assert_eq!(categorize(candidates(), &blob, now()).dashboard.len(), 1);
    }

    #[test]
    fn partitions_by_surface() {
        let candidates = vec![
            nudge("d1", "e1", Urgency::High, Surface::Dashboard),
            nudge("p1", "e2", Urgency::Low, Surface::inline("profile")),
            nudge("p2", "e2", Urgency::Medium, Surface::inline("profile")),
            nudge("g1", "e3", Urgency::Low, Surface::inline("programs")),
            nudge("c1", "e4", Urgency::Low, Surface::Celebration),
        ];
        let set = categorize(candidates, &StateBlob::default(), now());

        assert_eq!(set.dashboard.len(), 1);
        assert_eq!(set.inline_for("profile").len(), 2);
        assert_eq!(set.inline_for("programs").len(), 1);
        assert_eq!(set.inline_for("unknown").len(), 0);
        assert_eq!(set.celebrations.len(), 1);
        // Inline lists inherit the global sort
        assert_eq!(set.inline_for("profile")[0].id, "p2");
    }

    #[test]
    fn mobile_slot_takes_single_top_actionable_nudge() {
        let candidates = vec![
            nudge("c1", "e1", Urgency::Critical, Surface::Celebration),
            nudge("d1", "e2", Urgency::Low, Surface::Dashboard),
            nudge("d2", "e3", Urgency::High, Surface::Dashboard),
        ];
        let set = categorize(candidates, &StateBlob::default(), now());

        // Celebrations never take the slot, even at higher urgency
        assert_eq!(set.mobile.len(), 1);
        assert_eq!(set.mobile_nudge().unwrap().id, "d2");
        // The chosen nudge still renders on its home surface
        assert_eq!(set.dashboard.len(), 2);
    }

    #[test]
    fn mobile_only_nudge_competes_for_the_slot() {
        let candidates = vec![
            nudge("m1", "e1", Urgency::Critical, Surface::Mobile),
            nudge("d1", "e2", Urgency::High, Surface::Dashboard),
        ];
        let set = categorize(candidates, &StateBlob::default(), now());
        assert_eq!(set.mobile_nudge().unwrap().id, "m1");
        assert_eq!(set.dashboard.len(), 1);
        // Counted in stats and grouped by engine, but rendered only on mobile
        assert_eq!(set.stats.total, 2);
        assert_eq!(set.by_engine["e1"].len(), 1);
    }

    #[test]
    fn celebrated_events_are_filtered_for_good() {
        let mut blob = StateBlob::default();
        blob.celebrated_events.insert("milestone_hours_100".into());

        let candidates = vec![
            nudge("milestone_hours_100", "milestones", Urgency::Medium, Surface::Celebration),
            nudge("milestone_hours_500", "milestones", Urgency::Medium, Surface::Celebration),
        ];
        let set = categorize(candidates, &blob, now());

        assert_eq!(set.celebrations.len(), 1);
        assert_eq!(set.celebrations[0].id, "milestone_hours_500");
        assert_eq!(set.by_engine["milestones"].len(), 1);
    }

    #[test]
    fn stats_count_actionable_output_only() {
        let candidates = vec![
            nudge("d1", "e1", Urgency::Critical, Surface::Dashboard),
            nudge("d2", "e1", Urgency::Medium, Surface::Dashboard),
            nudge("p1", "e2", Urgency::Medium, Surface::inline("profile")),
            nudge("c1", "e3", Urgency::High, Surface::Celebration),
        ];
        let set = categorize(candidates, &StateBlob::default(), now());

        assert_eq!(set.stats.total, 3);
        assert_eq!(set.stats.critical, 1);
        assert_eq!(set.stats.high, 0);
        assert_eq!(set.stats.medium, 2);
        assert_eq!(set.stats.low, 0);
    }

    #[test]
    fn by_engine_groups_all_survivors() {
        let candidates = vec![
            nudge("d1", "alpha", Urgency::High, Surface::Dashboard),
            nudge("d2", "alpha", Urgency::Low, Surface::Dashboard),
            nudge("c1", "beta", Urgency::Low, Surface::Celebration),
        ];
        let set = categorize(candidates, &StateBlob::default(), now());
        assert_eq!(set.by_engine["alpha"].len(), 2);
        assert_eq!(set.by_engine["beta"].len(), 1);
    }

    #[test]
    fn serialized_shape_matches_consumer_contract() {
        let candidates = vec![
            nudge("d1", "clinical_catchup", Urgency::Medium, Surface::Dashboard),
            nudge("p1", "profile_completeness", Urgency::Low, Surface::inline("profile")),
        ];
        let set = categorize(candidates, &StateBlob::default(), now());
        let value = serde_json::to_value(&set).unwrap();

        assert!(value["dashboard"].is_array());
        assert!(value["inline"]["profile"].is_array());
        assert!(value["mobile"].is_array());
        assert!(value["celebrations"].is_array());
        assert_eq!(value["stats"]["total"], 2);
        assert_eq!(value["stats"]["medium"], 1);
        assert!(value["byEngine"]["clinical_catchup"].is_array());
        assert_eq!(value["dashboard"][0]["engineId"], "clinical_catchup");
    }
}
