use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// A non-negative duration, stored in seconds.
#[derive(Debug, Eq, PartialEq, Clone, Copy, Ord, PartialOrd, Serialize, Deserialize)]
pub struct PositiveDuration {
    pub(crate) seconds: u32,
}

impl PositiveDuration {
    pub fn zero() -> Self {
        Self { seconds: 0 }
    }

    pub const fn from_hms(hours: u32, minutes: u32, seconds: u32) -> PositiveDuration {
        let total_seconds = seconds + 60 * minutes + 60 * 60 * hours;
        PositiveDuration {
            seconds: total_seconds,
        }
    }

    pub const fn from_seconds(seconds: u32) -> PositiveDuration {
        PositiveDuration { seconds }
    }

    pub fn total_seconds(&self) -> u64 {
        u64::from(self.seconds)
    }
}

impl Display for PositiveDuration {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let hours = self.seconds / (60 * 60);
        let minutes_in_secs = self.seconds % (60 * 60);
        let minutes = minutes_in_secs / 60;
        let seconds = minutes_in_secs % 60;
        if hours != 0 {
            write!(f, "{}h{:02}m{:02}s", hours, minutes, seconds)
        } else if minutes != 0 {
            write!(f, "{}m{:02}s", minutes, seconds)
        } else {
            write!(f, "{}s", seconds)
        }
    }
}

impl FromStr for PositiveDuration {
    type Err = DurationParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut parts = input.split(':');
        let hours = parts.next();
        let minutes = parts.next();
        let seconds = parts.next();
        match (hours, minutes, seconds, parts.next()) {
            (Some(h), Some(m), Some(s), None) => {
                let hours: u32 = h
                    .parse()
                    .map_err(|_| DurationParseError(input.to_string()))?;
                let minutes: u32 = m
                    .parse()
                    .map_err(|_| DurationParseError(input.to_string()))?;
                let seconds: u32 = s
                    .parse()
                    .map_err(|_| DurationParseError(input.to_string()))?;
                if minutes >= 60 || seconds >= 60 {
                    return Err(DurationParseError(input.to_string()));
                }
                Ok(PositiveDuration::from_hms(hours, minutes, seconds))
            }
            _ => Err(DurationParseError(input.to_string())),
        }
    }
}

#[derive(Debug)]
pub struct DurationParseError(String);

impl Display for DurationParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Unable to parse '{}' as a duration. Expected format is hh:mm:ss",
            self.0
        )
    }
}

impl std::error::Error for DurationParseError {}

/// A point in time within one service day, in seconds since the day's
/// midnight. May exceed 24h for trips running past midnight.
pub type SecondsSinceDayStart = i32;

pub const SECONDS_IN_A_DAY: i32 = 24 * 60 * 60;

/// Parses a "hh:mm:ss" timetable string into seconds since day start.
pub fn parse_day_time(input: &str) -> Option<SecondsSinceDayStart> {
    let time = NaiveTime::parse_from_str(input, "%H:%M:%S").ok()?;
    use chrono::Timelike;
    Some(time.num_seconds_from_midnight() as i32)
}

pub fn display_day_time(seconds: SecondsSinceDayStart) -> String {
    let in_day = seconds.rem_euclid(SECONDS_IN_A_DAY);
    format!(
        "{:02}:{:02}:{:02}",
        in_day / 3600,
        (in_day % 3600) / 60,
        in_day % 60
    )
}

/// One service day. Anchors day-local timetable seconds to epoch seconds.
///
/// Epoch conversions are naive (no timezone shift) : the engine operates in
/// the timetable's own local clock, and the embedding layer is responsible
/// for mapping requests into it.
#[derive(Debug, Eq, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub struct ServiceDay {
    pub date: NaiveDate,
}

impl ServiceDay {
    pub fn new(date: NaiveDate) -> Self {
        Self { date }
    }

    /// The service day containing the given epoch second.
    pub fn of_epoch(epoch_seconds: i64) -> Self {
        let datetime = NaiveDateTime::from_timestamp(epoch_seconds, 0);
        Self {
            date: datetime.date(),
        }
    }

    /// Epoch second of the given day-local time.
    pub fn time(&self, seconds: SecondsSinceDayStart) -> i64 {
        self.midnight() + i64::from(seconds)
    }

    /// Day-local time of the given epoch second.
    pub fn seconds_since_day_start(&self, epoch_seconds: i64) -> SecondsSinceDayStart {
        (epoch_seconds - self.midnight()) as SecondsSinceDayStart
    }

    fn midnight(&self) -> i64 {
        self.date.and_hms(0, 0, 0).timestamp()
    }
}
