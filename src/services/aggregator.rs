//! Aggregator service for computing milk-production statistics

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;

use crate::services::dates;
use crate::types::{CowProduction, DailyAggregate, MilkingSession};

/// Field predicates applied before aggregation or listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionFilter {
    /// Keep only these cows (`None` keeps all)
    pub cow_ids: Option<HashSet<u64>>,
    /// Keep only this local calendar day
    pub date: Option<NaiveDate>,
    /// Inclusive local-date bounds
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl SessionFilter {
    pub fn for_cows(ids: impl IntoIterator<Item = u64>) -> Self {
        Self {
            cow_ids: Some(ids.into_iter().collect()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cow_ids.is_none() && self.date.is_none() && self.start.is_none() && self.end.is_none()
    }

    /// A session with no timestamp fails every date predicate
    pub fn matches(&self, session: &MilkingSession) -> bool {
        if let Some(ids) = &self.cow_ids {
            match session.cow_id {
                Some(id) if ids.contains(&id) => {}
                _ => return false,
            }
        }

        if self.date.is_none() && self.start.is_none() && self.end.is_none() {
            return true;
        }

        let Some(day) = session.local_date() else {
            return false;
        };
        self.date.map_or(true, |d| day == d)
            && self.start.map_or(true, |s| day >= s)
            && self.end.map_or(true, |e| day <= e)
    }
}

/// Aggregator for milking-session statistics.
///
/// All functions are pure: the same input always yields the same output, and
/// malformed records are skipped or count as zero volume rather than failing.
pub struct Aggregator;

impl Aggregator {
    /// One entry per local calendar day in `[start, end]`, ascending.
    /// Days without sessions are zero-filled.
    pub fn daily_series(
        sessions: &[MilkingSession],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Vec<DailyAggregate> {
        if start > end {
            return Vec::new();
        }

        let mut buckets: HashMap<NaiveDate, (f64, u64)> = HashMap::new();
        for session in sessions {
            let Some(day) = session.local_date() else {
                log::debug!("session {} has no milking time, skipped", session.id);
                continue;
            };
            if day < start || day > end {
                continue;
            }
            let bucket = buckets.entry(day).or_insert((0.0, 0));
            bucket.0 += session.volume;
            bucket.1 = bucket.1.saturating_add(1);
        }

        dates::day_range(start, end)
            .map(|date| match buckets.get(&date) {
                Some(&(total_volume, session_count)) => DailyAggregate {
                    date,
                    total_volume,
                    session_count,
                },
                None => DailyAggregate::empty(date),
            })
            .collect()
    }

    /// The `days`-day trend ending on `reference` (inclusive)
    pub fn last_days(
        sessions: &[MilkingSession],
        reference: NaiveDate,
        days: u32,
    ) -> Vec<DailyAggregate> {
        let (start, end) = dates::window_ending(reference, days);
        Self::daily_series(sessions, start, end)
    }

    /// Totals per cow. Keys are `cow_ids` plus every cow seen in `sessions`;
    /// requested cows with no sessions get zeroed totals.
    pub fn per_cow_totals(
        sessions: &[MilkingSession],
        cow_ids: &[u64],
        reference: NaiveDate,
    ) -> BTreeMap<u64, CowProduction> {
        let mut totals: BTreeMap<u64, CowProduction> = cow_ids
            .iter()
            .map(|&id| (id, CowProduction::empty(id)))
            .collect();

        for session in sessions {
            let Some(cow_id) = session.cow_id else {
                log::debug!("session {} has no cow, skipped", session.id);
                continue;
            };
            let is_today = session.local_date() == Some(reference);
            totals
                .entry(cow_id)
                .or_insert_with(|| CowProduction::empty(cow_id))
                .add(session.volume, is_today);
        }

        for production in totals.values_mut() {
            production.finish();
        }
        totals
    }

    /// Volume milked on the local calendar day `reference`
    pub fn today_total(sessions: &[MilkingSession], reference: NaiveDate) -> f64 {
        sessions
            .iter()
            .filter(|s| s.local_date() == Some(reference))
            .map(|s| s.volume)
            .sum()
    }

    /// Sessions passing `filter`, in input order
    pub fn filter<'a>(
        sessions: &'a [MilkingSession],
        filter: &SessionFilter,
    ) -> Vec<&'a MilkingSession> {
        sessions.iter().filter(|s| filter.matches(s)).collect()
    }

    /// Same as [`Aggregator::filter`] but owned, for feeding back into the aggregator
    pub fn filtered(sessions: &[MilkingSession], filter: &SessionFilter) -> Vec<MilkingSession> {
        if filter.is_empty() {
            return sessions.to_vec();
        }
        Self::filter(sessions, filter).into_iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::dates::parse_timestamp;

    fn make_session(id: u64, cow_id: Option<u64>, volume: f64, time: &str) -> MilkingSession {
        MilkingSession {
            id,
            cow_id,
            milker_id: Some(1),
            volume,
            milking_time: parse_timestamp(time),
            notes: None,
            cow_name: None,
            milker_name: None,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ========== daily_series() tests ==========

    #[test]
    fn test_daily_series_empty_is_zero_filled() {
        let result = Aggregator::daily_series(&[], date(2024, 1, 1), date(2024, 1, 7));

        assert_eq!(result.len(), 7);
        for (i, day) in result.iter().enumerate() {
            assert_eq!(day.date, date(2024, 1, 1 + i as u32));
            assert_eq!(day.session_count, 0);
            assert!((day.total_volume - 0.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn test_daily_series_buckets_by_local_day() {
        let sessions = vec![
            make_session(1, Some(1), 4.0, "2024-01-03T06:00:00"),
            make_session(2, Some(2), 6.0, "2024-01-03T18:00:00"),
            make_session(3, Some(1), 5.0, "2024-01-01T06:00:00"),
            make_session(4, Some(1), 9.0, "2024-01-09T06:00:00"), // outside
        ];

        let result = Aggregator::daily_series(&sessions, date(2024, 1, 1), date(2024, 1, 3));

        assert_eq!(result.len(), 3);
        assert!((result[0].total_volume - 5.0).abs() < f64::EPSILON);
        assert_eq!(result[1].session_count, 0);
        assert!((result[2].total_volume - 10.0).abs() < f64::EPSILON);
        assert_eq!(result[2].session_count, 2);
    }

    #[test]
    fn test_daily_series_midnight_boundary() {
        let sessions = vec![
            make_session(1, Some(1), 3.0, "2024-03-10T23:59:00"),
            make_session(2, Some(1), 2.0, "2024-03-11T00:00:00"),
        ];

        let result = Aggregator::daily_series(&sessions, date(2024, 3, 10), date(2024, 3, 11));

        assert_eq!(result[0].session_count, 1);
        assert!((result[0].total_volume - 3.0).abs() < f64::EPSILON);
        assert_eq!(result[1].session_count, 1);
        assert!((result[1].total_volume - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_daily_series_skips_missing_time() {
        let mut bad = make_session(1, Some(1), 3.0, "2024-01-01T06:00:00");
        bad.milking_time = None;

        let result = Aggregator::daily_series(&[bad], date(2024, 1, 1), date(2024, 1, 1));
        assert_eq!(result[0].session_count, 0);
    }

    #[test]
    fn test_daily_series_is_pure() {
        let sessions = vec![make_session(1, Some(1), 4.0, "2024-01-02T06:00:00")];
        let a = Aggregator::daily_series(&sessions, date(2024, 1, 1), date(2024, 1, 7));
        let b = Aggregator::daily_series(&sessions, date(2024, 1, 1), date(2024, 1, 7));
        assert_eq!(a, b);
    }

    #[test]
    fn test_daily_series_reversed_range_is_empty() {
        let result = Aggregator::daily_series(&[], date(2024, 1, 7), date(2024, 1, 1));
        assert!(result.is_empty());
    }

    #[test]
    fn test_last_days_window() {
        let sessions = vec![
            make_session(1, Some(1), 4.0, "2024-01-01T06:00:00"),
            make_session(2, Some(1), 4.0, "2023-12-31T06:00:00"), // before window
        ];
        let result = Aggregator::last_days(&sessions, date(2024, 1, 7), 7);

        assert_eq!(result.len(), 7);
        assert_eq!(result[0].date, date(2024, 1, 1));
        assert_eq!(result[0].session_count, 1);
        assert_eq!(result[6].date, date(2024, 1, 7));
    }

    #[test]
    fn test_last_days_huge_window_is_capped() {
        let result = Aggregator::last_days(&[], date(2024, 1, 7), u32::MAX);
        assert_eq!(result.len(), dates::MAX_WINDOW_DAYS as usize);
        assert_eq!(result.last().map(|d| d.date), Some(date(2024, 1, 7)));
    }

    // ========== per_cow_totals() tests ==========

    #[test]
    fn test_per_cow_totals_scenario() {
        let json = r#"[
            {"id": 1, "cow_id": 1, "volume": "4.5", "milking_time": "2024-01-01T06:00:00"},
            {"id": 2, "cow_id": 1, "volume": "5.5", "milking_time": "2024-01-01T18:00:00"}
        ]"#;
        let sessions: Vec<MilkingSession> = serde_json::from_str(json).unwrap();

        let result = Aggregator::per_cow_totals(&sessions, &[], date(2024, 1, 1));
        let cow = result.get(&1).unwrap();

        assert!((cow.total_volume - 10.0).abs() < f64::EPSILON);
        assert_eq!(cow.sessions_count, 2);
        assert!((cow.avg_per_session - 5.0).abs() < f64::EPSILON);
        assert!((cow.today_volume - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_per_cow_totals_zero_for_requested_absent_cows() {
        let sessions = vec![make_session(1, Some(1), 4.0, "2024-01-01T06:00:00")];

        let result = Aggregator::per_cow_totals(&sessions, &[1, 42], date(2024, 1, 1));

        assert_eq!(result.len(), 2);
        let absent = result.get(&42).unwrap();
        assert_eq!(absent.sessions_count, 0);
        assert_eq!(absent.total_volume, 0.0);
        assert_eq!(absent.avg_per_session, 0.0);
        assert_eq!(absent.today_volume, 0.0);
    }

    #[test]
    fn test_per_cow_totals_skips_missing_cow() {
        let sessions = vec![
            make_session(1, None, 4.0, "2024-01-01T06:00:00"),
            make_session(2, Some(3), 2.0, "2024-01-01T06:00:00"),
        ];
        let result = Aggregator::per_cow_totals(&sessions, &[], date(2024, 1, 1));
        assert_eq!(result.keys().copied().collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn test_per_cow_totals_sum_invariant_any_order() {
        let volumes = [0.1, 7.3, 2.25, 11.0, 0.7, 3.3333, 5.5];
        let mut sessions: Vec<MilkingSession> = volumes
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let cow = if i % 2 == 0 { 1 } else { 2 };
                make_session(i as u64, Some(cow), *v, "2024-01-05T06:00:00")
            })
            .collect();

        let expected_cow1: f64 = sessions
            .iter()
            .filter(|s| s.cow_id == Some(1))
            .map(|s| s.volume)
            .sum();

        let forward = Aggregator::per_cow_totals(&sessions, &[], date(2024, 1, 5));
        sessions.reverse();
        let backward = Aggregator::per_cow_totals(&sessions, &[], date(2024, 1, 5));

        assert!((forward[&1].total_volume - expected_cow1).abs() < 1e-9);
        assert!((forward[&1].total_volume - backward[&1].total_volume).abs() < 1e-9);
        assert!((forward[&2].total_volume - backward[&2].total_volume).abs() < 1e-9);
    }

    #[test]
    fn test_per_cow_totals_today_volume_only_reference_day() {
        let sessions = vec![
            make_session(1, Some(1), 4.0, "2024-01-01T06:00:00"),
            make_session(2, Some(1), 6.0, "2024-01-02T06:00:00"),
        ];
        let result = Aggregator::per_cow_totals(&sessions, &[], date(2024, 1, 2));
        assert!((result[&1].today_volume - 6.0).abs() < f64::EPSILON);
        assert!((result[&1].total_volume - 10.0).abs() < f64::EPSILON);
    }

    // ========== today_total() tests ==========

    #[test]
    fn test_today_total() {
        let sessions = vec![
            make_session(1, Some(1), 4.0, "2024-01-02T06:00:00"),
            make_session(2, Some(2), 3.5, "2024-01-02T23:59:59"),
            make_session(3, Some(1), 6.0, "2024-01-03T00:00:01"),
        ];
        let total = Aggregator::today_total(&sessions, date(2024, 1, 2));
        assert!((total - 7.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_today_total_empty() {
        assert_eq!(Aggregator::today_total(&[], date(2024, 1, 2)), 0.0);
    }

    // ========== filter() tests ==========

    #[test]
    fn test_filter_by_cow_and_range() {
        let sessions = vec![
            make_session(1, Some(1), 4.0, "2024-01-01T06:00:00"),
            make_session(2, Some(2), 4.0, "2024-01-02T06:00:00"),
            make_session(3, Some(1), 4.0, "2024-01-05T06:00:00"),
            make_session(4, None, 4.0, "2024-01-02T06:00:00"),
        ];
        let filter = SessionFilter {
            cow_ids: Some([1].into_iter().collect()),
            start: Some(date(2024, 1, 1)),
            end: Some(date(2024, 1, 3)),
            ..Default::default()
        };

        let ids: Vec<u64> = Aggregator::filter(&sessions, &filter)
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn test_filter_exact_date_excludes_untimed() {
        let mut untimed = make_session(9, Some(1), 4.0, "2024-01-01T06:00:00");
        untimed.milking_time = None;
        let sessions = vec![make_session(1, Some(1), 4.0, "2024-01-01T06:00:00"), untimed];
        let filter = SessionFilter {
            date: Some(date(2024, 1, 1)),
            ..Default::default()
        };
        assert_eq!(Aggregator::filter(&sessions, &filter).len(), 1);
    }

    #[test]
    fn test_filtered_empty_filter_keeps_all() {
        let sessions = vec![make_session(1, None, 1.0, "garbage")];
        assert_eq!(Aggregator::filtered(&sessions, &SessionFilter::default()).len(), 1);
        assert_eq!(
            Aggregator::filtered(&sessions, &SessionFilter::for_cows([2])).len(),
            0
        );
    }
}
