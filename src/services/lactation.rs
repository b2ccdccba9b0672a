//! Lactation-phase heuristic
//!
//! The farm has no authoritative source for a cow's phase; the web client
//! guessed it from age, sex and recent yield. The thresholds below are those
//! guesses made configurable and are pending confirmation by the product owner.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::services::Aggregator;
use crate::types::{Cow, LactationPhase, MilkingSession, ProductionStats};

/// Configurable thresholds for [`LactationPolicy::classify`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LactationPolicy {
    /// Younger than this is a calf
    pub calf_max_months: u32,
    /// Females younger than this with no recent yield are heifers
    pub heifer_max_months: u32,
    /// Average daily liters at or above this is early lactation
    pub early_min_liters: f64,
    /// At or above this (and below early) is mid lactation
    pub mid_min_liters: f64,
    /// Days of history used for the recent average
    pub window_days: u32,
}

impl Default for LactationPolicy {
    fn default() -> Self {
        Self {
            calf_max_months: 12,
            heifer_max_months: 24,
            early_min_liters: 15.0,
            mid_min_liters: 8.0,
            window_days: 7,
        }
    }
}

impl LactationPolicy {
    /// Average daily volume over the window ending on `reference`,
    /// counting only days with at least one session
    pub fn recent_daily_average(
        &self,
        cow_id: u64,
        sessions: &[MilkingSession],
        reference: NaiveDate,
    ) -> f64 {
        let own: Vec<MilkingSession> = sessions
            .iter()
            .filter(|s| s.cow_id == Some(cow_id))
            .cloned()
            .collect();
        let series = Aggregator::last_days(&own, reference, self.window_days);
        ProductionStats::from_daily(&series).daily_avg_volume
    }

    /// Phase from a recent average alone
    pub fn phase_for_yield(&self, daily_avg: f64) -> LactationPhase {
        if daily_avg >= self.early_min_liters {
            LactationPhase::Early
        } else if daily_avg >= self.mid_min_liters {
            LactationPhase::Mid
        } else if daily_avg > 0.0 {
            LactationPhase::Late
        } else {
            LactationPhase::Dry
        }
    }

    /// Suggest a phase for `cow` on `reference`
    pub fn classify(
        &self,
        cow: &Cow,
        sessions: &[MilkingSession],
        reference: NaiveDate,
    ) -> LactationPhase {
        let age = cow.age_months(reference);

        if age.is_some_and(|m| m < self.calf_max_months) {
            return LactationPhase::Calf;
        }
        if cow.is_male() {
            return LactationPhase::Bull;
        }

        let avg = self.recent_daily_average(cow.id, sessions, reference);
        if avg <= 0.0 && age.is_some_and(|m| m < self.heifer_max_months) {
            return LactationPhase::Heifer;
        }
        self.phase_for_yield(avg)
    }
}
