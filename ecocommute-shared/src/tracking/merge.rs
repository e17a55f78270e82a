/// Weekly commute-log merge
///
/// A second submission for a week that already has a log is folded into that
/// log instead of creating a duplicate row. How the day flags combine depends
/// on whether the commute type changed:
///
/// | incoming flag | same type     | different type |
/// |---------------|---------------|----------------|
/// | `true`        | true          | true           |
/// | `false`       | false         | prior value    |
/// | absent        | prior value   | prior value    |
///
/// `days_logged` is always recounted from the merged flags and `co2_saved_kg`
/// recomputed from the merged record.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::scoring::co2_saved_kg;
use crate::models::commute_log::{CommuteLog, CommuteType, MergeCommuteLog, WeekDays};

/// How long after its `week_start` a log still accepts merges
pub const MERGE_WINDOW_DAYS: i64 = 7;

/// Day flags as submitted; `None` means the day wasn't mentioned
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaySelection {
    pub monday: Option<bool>,
    pub tuesday: Option<bool>,
    pub wednesday: Option<bool>,
    pub thursday: Option<bool>,
    pub friday: Option<bool>,
    pub saturday: Option<bool>,
    pub sunday: Option<bool>,
}

impl DaySelection {
    fn as_array(&self) -> [Option<bool>; 7] {
        [
            self.monday,
            self.tuesday,
            self.wednesday,
            self.thursday,
            self.friday,
            self.saturday,
            self.sunday,
        ]
    }

    /// Flags for a fresh log (absent days are false)
    pub fn to_week_days(&self) -> WeekDays {
        WeekDays::from_array(self.as_array().map(|day| day.unwrap_or(false)))
    }

    /// Number of days explicitly selected
    pub fn selected_count(&self) -> i32 {
        self.to_week_days().count()
    }

    /// Combines the selection with a log's prior flags
    pub fn merge_into(&self, prior: WeekDays, same_type: bool) -> WeekDays {
        let prior = prior.as_array();
        let incoming = self.as_array();
        let mut merged = [false; 7];

        for (i, slot) in merged.iter_mut().enumerate() {
            *slot = match incoming[i] {
                Some(true) => true,
                Some(false) if same_type => false,
                _ => prior[i],
            };
        }

        WeekDays::from_array(merged)
    }
}

/// Whether a log for `week_start` still accepts merges on `today`
pub fn is_mergeable(week_start: NaiveDate, today: NaiveDate) -> bool {
    (today - week_start).num_days() <= MERGE_WINDOW_DAYS
}

/// Computes the merged state of `existing` after a new submission
pub fn merge_week(
    existing: &CommuteLog,
    commute_type: CommuteType,
    distance_km: f64,
    selection: &DaySelection,
) -> MergeCommuteLog {
    let same_type = existing.commute_type == commute_type;
    let days = selection.merge_into(existing.days(), same_type);
    let days_logged = days.count();

    MergeCommuteLog {
        commute_type,
        days_logged,
        distance_km,
        co2_saved_kg: co2_saved_kg(commute_type, distance_km, days_logged),
        days,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn log(commute_type: CommuteType, days: WeekDays, distance_km: f64) -> CommuteLog {
        let now = Utc::now();
        let mut log = CommuteLog {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            week_start: date(2025, 6, 2),
            commute_type,
            days_logged: days.count(),
            distance_km,
            co2_saved_kg: co2_saved_kg(commute_type, distance_km, days.count()),
            monday: false,
            tuesday: false,
            wednesday: false,
            thursday: false,
            friday: false,
            saturday: false,
            sunday: false,
            created_at: now,
            updated_at: now,
        };
        log.set_days(days);
        log
    }

    fn mon_to_wed() -> WeekDays {
        WeekDays {
            monday: true,
            tuesday: true,
            wednesday: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_merge_window_boundary() {
        let week_start = date(2025, 6, 2);
        assert!(is_mergeable(week_start, date(2025, 6, 2)));
        assert!(is_mergeable(week_start, date(2025, 6, 9)));
        assert!(!is_mergeable(week_start, date(2025, 6, 10)));
        // Future weeks are still open
        assert!(is_mergeable(week_start, date(2025, 5, 20)));
    }

    #[test]
    fn test_different_type_only_adds_selected_days() {
        let existing = log(CommuteType::Cycle, mon_to_wed(), 10.0);
        let selection = DaySelection {
            monday: Some(false),
            thursday: Some(true),
            friday: Some(true),
            ..Default::default()
        };

        let merged = merge_week(&existing, CommuteType::PublicTransport, 10.0, &selection);

        assert_eq!(merged.commute_type, CommuteType::PublicTransport);
        assert_eq!(
            merged.days,
            WeekDays {
                monday: true,
                tuesday: true,
                wednesday: true,
                thursday: true,
                friday: true,
                ..Default::default()
            }
        );
        assert_eq!(merged.days_logged, 5);
    }

    #[test]
    fn test_same_type_explicit_flags_override() {
        let existing = log(CommuteType::Walk, mon_to_wed(), 2.0);
        let selection = DaySelection {
            tuesday: Some(false),
            saturday: Some(true),
            ..Default::default()
        };

        let merged = merge_week(&existing, CommuteType::Walk, 2.0, &selection);

        assert!(merged.days.monday);
        assert!(!merged.days.tuesday);
        assert!(merged.days.wednesday);
        assert!(merged.days.saturday);
        assert_eq!(merged.days_logged, merged.days.count());
        assert_eq!(merged.days_logged, 3);
    }

    #[test]
    fn test_resubmitting_same_entry_is_stable() {
        let existing = log(CommuteType::Cycle, mon_to_wed(), 10.0);
        let selection = DaySelection {
            monday: Some(true),
            tuesday: Some(true),
            wednesday: Some(true),
            ..Default::default()
        };

        let merged = merge_week(&existing, CommuteType::Cycle, 10.0, &selection);

        assert_eq!(merged.days, existing.days());
        assert_eq!(merged.days_logged, existing.days_logged);
        assert_eq!(merged.co2_saved_kg, existing.co2_saved_kg);
    }

    #[test]
    fn test_merge_recomputes_co2_from_merged_days() {
        let existing = log(CommuteType::Cycle, mon_to_wed(), 10.0);
        let selection = DaySelection {
            thursday: Some(true),
            friday: Some(true),
            ..Default::default()
        };

        let merged = merge_week(&existing, CommuteType::Cycle, 10.0, &selection);

        // 0.19 * 10 * 5
        assert_eq!(merged.co2_saved_kg, 10);
    }

    #[test]
    fn test_selection_deserializes_missing_and_null_days() {
        let selection: DaySelection =
            serde_json::from_str(r#"{"monday": true, "tuesday": null}"#).unwrap();

        assert_eq!(selection.monday, Some(true));
        assert_eq!(selection.tuesday, None);
        assert_eq!(selection.sunday, None);
        assert_eq!(selection.selected_count(), 1);
    }
}
