//! Milking session records

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::lenient;

/// One recorded milking of one cow
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MilkingSession {
    #[serde(default, deserialize_with = "lenient::id")]
    pub id: u64,
    #[serde(default, deserialize_with = "lenient::opt_id")]
    pub cow_id: Option<u64>,
    #[serde(default, deserialize_with = "lenient::opt_id")]
    pub milker_id: Option<u64>,
    /// Liters; unparsable values are stored as `0.0`
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub volume: f64,
    #[serde(default, deserialize_with = "lenient::opt_timestamp")]
    pub milking_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub notes: Option<String>,
    /// Joined by some list endpoints
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub cow_name: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub milker_name: Option<String>,
}

impl MilkingSession {
    /// Milking time in the viewer's timezone
    pub fn local_time(&self) -> Option<DateTime<Local>> {
        self.milking_time.map(|ts| ts.with_timezone(&Local))
    }

    /// Convert the UTC timestamp to a local calendar date.
    /// Day buckets follow the viewer's calendar, not UTC.
    pub fn local_date(&self) -> Option<NaiveDate> {
        self.local_time().map(|ts| ts.date_naive())
    }
}

/// Request body for creating or replacing a milking session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewMilkingSession {
    pub cow_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milker_id: Option<u64>,
    pub volume: f64,
    /// Local wall-clock time, `YYYY-MM-DDTHH:MM:SS`
    pub milking_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// `{id, message}` answer to a create request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Created {
    #[serde(default, deserialize_with = "lenient::opt_id")]
    pub id: Option<u64>,
    #[serde(default)]
    pub message: Option<String>,
}
