use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{BookingError, Result};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DateFormat {
    /// `Saturday May, 21, 2019 at 9:30PM`
    Full,
    /// `Sat 05, 21, 2019 9:30PM`
    #[default]
    Medium,
}

impl DateFormat {
    fn pattern(self) -> &'static str {
        match self {
            DateFormat::Full => "%A %B, %-d, %Y at %-I:%M%p",
            DateFormat::Medium => "%a %m, %d, %Y %-I:%M%p",
        }
    }
}

/// Render a stored timestamp for display in `tz`.
pub fn format_datetime(value: DateTime<Utc>, format: DateFormat, tz: Tz) -> String {
    value.with_timezone(&tz).format(format.pattern()).to_string()
}

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parse a submitted start time. Offsets are honoured; naive values are read in `tz`.
pub fn parse_timestamp(input: &str, tz: Tz) -> Result<DateTime<Utc>> {
    let trimmed = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_FORMATS.iter() {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return match tz.from_local_datetime(&naive) {
                LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
                LocalResult::Ambiguous(dt, _) => Ok(dt.with_timezone(&Utc)),
                LocalResult::None => Err(BookingError::Validation(format!(
                    "start_time {trimmed} does not exist in {tz}"
                ))),
            };
        }
    }
    Err(BookingError::Validation(format!(
        "start_time {trimmed:?} is not an ISO-8601 timestamp"
    )))
}
