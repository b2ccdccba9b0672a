//! Cattle records

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

use super::lenient;

/// Milk-production stage of an animal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LactationPhase {
    Early,
    Mid,
    Late,
    Dry,
    Heifer,
    Calf,
    Bull,
}

impl LactationPhase {
    pub const ALL: [LactationPhase; 7] = [
        Self::Early,
        Self::Mid,
        Self::Late,
        Self::Dry,
        Self::Heifer,
        Self::Calf,
        Self::Bull,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Early => "Early",
            Self::Mid => "Mid",
            Self::Late => "Late",
            Self::Dry => "Dry",
            Self::Heifer => "Heifer",
            Self::Calf => "Calf",
            Self::Bull => "Bull",
        }
    }
}

impl fmt::Display for LactationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for LactationPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        // Server labels look like "Early Lactation" or "mid"
        let head = needle.split_whitespace().next().unwrap_or("");
        Self::ALL
            .iter()
            .copied()
            .find(|phase| phase.label().eq_ignore_ascii_case(head))
            .ok_or_else(|| format!("unknown lactation phase '{}'", s))
    }
}

fn opt_phase<'de, D>(deserializer: D) -> Result<Option<LactationPhase>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::String(s)) => s.parse().ok(),
        _ => None,
    })
}

/// A cow (or bull/calf) in the herd
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cow {
    #[serde(default, deserialize_with = "lenient::id")]
    pub id: u64,
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub breed: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub birth: Option<NaiveDate>,
    #[serde(default, deserialize_with = "opt_phase")]
    pub lactation_phase: Option<LactationPhase>,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub weight: f64,
}

impl Cow {
    pub fn is_male(&self) -> bool {
        self.gender
            .as_deref()
            .map(|g| matches!(g.trim().to_ascii_lowercase().as_str(), "male" | "m" | "bull"))
            .unwrap_or(false)
    }

    /// Whole months between birth and `on`; `None` without a birth date
    pub fn age_months(&self, on: NaiveDate) -> Option<u32> {
        let birth = self.birth?;
        if birth > on {
            return Some(0);
        }
        on.years_since(birth)
            .map(|years| years * 12)
            .map(|months| {
                let mut extra = (on.month0() + 12 - birth.month0()) % 12;
                if on.day() < birth.day() {
                    extra = (extra + 11) % 12;
                }
                months + extra
            })
    }
}
