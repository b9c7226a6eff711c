//! SP-01: Applicant snapshot, the read-only input to every rule engine.
//!
//! Callers assemble a `UserSnapshot` from their own domain records (profile
//! rows, tracker timestamps, target-program lists) and pass it in per
//! evaluation. The snapshot carries its own `captured_at` anchor so engine
//! output is a pure function of the snapshot value; engines never read the
//! wall clock. Missing fields mean "rule does not fire", never an error.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::store::StoreError;

// ─── Stage enum ──────────────────────────────────────────────────────────────

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = StoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(StoreError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(ApplicationStage {
    Exploring => "exploring",
    Preparing => "preparing",
    Applying => "applying",
    Interviewing => "interviewing",
    Accepted => "accepted",
});

impl Default for ApplicationStage {
    fn default() -> Self {
        Self::Exploring
    }
}

// ─── Snapshot building blocks ────────────────────────────────────────────────

/// Profile completeness flags, derived by the caller from the profile record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileFacets {
    pub has_photo: bool,
    pub has_bio: bool,
    pub has_icu_experience: bool,
    pub has_certifications: bool,
    pub has_gpa: bool,
}

impl ProfileFacets {
    /// All facets present.
    pub fn complete() -> Self {
        Self {
            has_photo: true,
            has_bio: true,
            has_icu_experience: true,
            has_certifications: true,
            has_gpa: true,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }

    /// Human-readable labels of the facets still missing.
    pub fn missing(&self) -> Vec<&'static str> {
        let facets = [
            (self.has_photo, "profile photo"),
            (self.has_bio, "bio"),
            (self.has_icu_experience, "ICU experience"),
            (self.has_certifications, "certifications"),
            (self.has_gpa, "GPA"),
        ];
        facets
            .iter()
            .filter(|(present, _)| !present)
            .map(|(_, label)| *label)
            .collect()
    }
}

/// One program the applicant is targeting, with its application deadline
/// when known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetProgram {
    pub name: String,
    pub deadline: Option<NaiveDate>,
}

impl TargetProgram {
    pub fn new(name: impl Into<String>, deadline: Option<NaiveDate>) -> Self {
        Self {
            name: name.into(),
            deadline,
        }
    }
}

/// Weekly clinical-hours goal and progress within the current week.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeeklyGoal {
    pub target_hours: f64,
    pub logged_hours: f64,
}

// ─── UserSnapshot ────────────────────────────────────────────────────────────

/// Point-in-time summary of one applicant, assembled by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSnapshot {
    /// When the snapshot was assembled. All staleness math is relative to
    /// this instant, not the wall clock.
    pub captured_at: DateTime<Utc>,
    pub stage: ApplicationStage,
    pub profile: ProfileFacets,
    pub last_clinical_log: Option<DateTime<Utc>>,
    pub last_eq_reflection: Option<DateTime<Utc>>,
    pub last_shadow_log: Option<DateTime<Utc>>,
    pub clinical_hours_total: f64,
    pub shadow_cases_total: u32,
    pub target_programs: Vec<TargetProgram>,
    pub weekly_goal: Option<WeeklyGoal>,
}

impl UserSnapshot {
    /// An empty snapshot anchored at `captured_at`. Tests and callers fill
    /// in the fields they care about.
    pub fn empty(captured_at: DateTime<Utc>) -> Self {
        Self {
            captured_at,
            stage: ApplicationStage::default(),
            profile: ProfileFacets::default(),
            last_clinical_log: None,
            last_eq_reflection: None,
            last_shadow_log: None,
            clinical_hours_total: 0.0,
            shadow_cases_total: 0,
            target_programs: Vec::new(),
            weekly_goal: None,
        }
    }

    /// Whole days elapsed between `timestamp` and the snapshot anchor.
    /// Truncates toward zero, so 4.9 elapsed days reads as 4.
    pub fn days_since(&self, timestamp: Option<DateTime<Utc>>) -> Option<i64> {
        timestamp.map(|t| self.captured_at.signed_duration_since(t).num_days())
    }

    /// Calendar days until `date`, negative once it has passed.
    pub fn days_until(&self, date: NaiveDate) -> i64 {
        date.signed_duration_since(self.captured_at.date_naive())
            .num_days()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn anchor() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn stage_round_trips_through_strings() {
        for stage in [
            ApplicationStage::Exploring,
            ApplicationStage::Preparing,
            ApplicationStage::Applying,
            ApplicationStage::Interviewing,
            ApplicationStage::Accepted,
        ] {
            let parsed: ApplicationStage = stage.as_str().parse().unwrap();
            assert_eq!(parsed, stage);
        }
    }

    #[test]
    fn stage_rejects_unknown_value() {
        let err = "graduated".parse::<ApplicationStage>().unwrap_err();
        assert!(err.to_string().contains("graduated"));
    }

    #[test]
    fn stage_progression_is_ordered() {
        assert!(ApplicationStage::Exploring < ApplicationStage::Applying);
        assert!(ApplicationStage::Accepted > ApplicationStage::Interviewing);
    }

    #[test]
    fn stage_serializes_lowercase() {
        let json = serde_json::to_string(&ApplicationStage::Interviewing).unwrap();
        assert_eq!(json, "\"interviewing\"");
    }

    #[test]
    fn facets_missing_labels() {
        let facets = ProfileFacets {
            has_photo: true,
            has_bio: false,
            has_icu_experience: true,
            has_certifications: false,
            has_gpa: true,
        };
        assert_eq!(facets.missing(), vec!["bio", "certifications"]);
        assert!(!facets.is_complete());
        assert!(ProfileFacets::complete().is_complete());
    }

    #[test]
    fn days_since_truncates_toward_zero() {
        let snapshot = UserSnapshot::empty(anchor());
        let almost_five = anchor() - Duration::days(5) + Duration::hours(2);
        assert_eq!(snapshot.days_since(Some(almost_five)), Some(4));
        assert_eq!(snapshot.days_since(None), None);
    }

    #[test]
    fn days_until_goes_negative_after_deadline() {
        let snapshot = UserSnapshot::empty(anchor());
        let past = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let ahead = NaiveDate::from_ymd_opt(2026, 3, 17).unwrap();
        assert_eq!(snapshot.days_until(past), -9);
        assert_eq!(snapshot.days_until(ahead), 7);
        assert_eq!(snapshot.days_until(anchor().date_naive()), 0);
    }

    #[test]
    fn empty_snapshot_fires_nothing_shaped_fields() {
        let snapshot = UserSnapshot::empty(anchor());
        assert!(snapshot.last_clinical_log.is_none());
        assert!(snapshot.target_programs.is_empty());
        assert!(snapshot.weekly_goal.is_none());
        assert_eq!(snapshot.stage, ApplicationStage::Exploring);
    }

    #[test]
    fn snapshot_serde_round_trip() {
        let mut snapshot = UserSnapshot::empty(anchor());
        snapshot.stage = ApplicationStage::Applying;
        snapshot.target_programs = vec![TargetProgram::new(
            "Duke DNP",
            NaiveDate::from_ymd_opt(2026, 6, 1),
        )];
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: UserSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }
}
