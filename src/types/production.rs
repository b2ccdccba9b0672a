//! Derived milk-production aggregates (never persisted)

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Volume collected on one local calendar day
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyAggregate {
    pub date: NaiveDate,
    pub total_volume: f64,
    pub session_count: u64,
}

impl DailyAggregate {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            total_volume: 0.0,
            session_count: 0,
        }
    }
}

/// Per-cow production totals
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CowProduction {
    pub cow_id: u64,
    pub total_volume: f64,
    pub sessions_count: u64,
    pub avg_per_session: f64,
    pub today_volume: f64,
}

impl CowProduction {
    pub fn empty(cow_id: u64) -> Self {
        Self {
            cow_id,
            total_volume: 0.0,
            sessions_count: 0,
            avg_per_session: 0.0,
            today_volume: 0.0,
        }
    }

    pub(crate) fn add(&mut self, volume: f64, is_today: bool) {
        self.total_volume += volume;
        self.sessions_count = self.sessions_count.saturating_add(1);
        if is_today {
            self.today_volume += volume;
        }
    }

    pub(crate) fn finish(&mut self) {
        self.avg_per_session = if self.sessions_count == 0 {
            0.0
        } else {
            self.total_volume / self.sessions_count as f64
        };
    }
}

/// Headline numbers over a daily series
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProductionStats {
    pub total_volume: f64,
    pub total_sessions: u64,
    /// Days with at least one session
    pub active_days: u32,
    pub daily_avg_volume: f64,
    pub peak_day: Option<(NaiveDate, f64)>,
}

impl ProductionStats {
    pub fn from_daily(series: &[DailyAggregate]) -> Self {
        let mut total_volume = 0.0;
        let mut total_sessions: u64 = 0;
        let mut active_days: u32 = 0;
        let mut peak_day: Option<(NaiveDate, f64)> = None;

        for day in series.iter().filter(|d| d.session_count > 0) {
            active_days += 1;
            total_volume += day.total_volume;
            total_sessions = total_sessions.saturating_add(day.session_count);

            match &peak_day {
                None => peak_day = Some((day.date, day.total_volume)),
                Some((_, max)) if day.total_volume > *max => {
                    peak_day = Some((day.date, day.total_volume));
                }
                _ => {}
            }
        }

        let daily_avg_volume = if active_days == 0 {
            0.0
        } else {
            total_volume / active_days as f64
        };

        Self {
            total_volume,
            total_sessions,
            active_days,
            daily_avg_volume,
            peak_day,
        }
    }
}
