use std::fmt::{Display, Formatter};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const MINUTES_PER_DAY: u32 = 24 * 60;
pub const DEFAULT_START_MINUTES: u32 = 9 * 60;
pub const DEFAULT_STAY_MINUTES: u32 = 90;

static FIRST_INTEGER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid integer regex"));

/// Wall-clock time of day with minute resolution.
///
/// Arithmetic wraps at midnight onto the same day; there is no date carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime(u16);

impl ClockTime {
    pub fn from_minutes(minutes: u32) -> Self {
        Self((minutes % MINUTES_PER_DAY) as u16)
    }

    pub fn from_hm(hour: u32, minute: u32) -> Self {
        Self::from_minutes(hour * 60 + minute)
    }

    pub fn minutes(self) -> u32 {
        u32::from(self.0)
    }

    pub fn hour(self) -> u32 {
        self.minutes() / 60
    }

    pub fn minute(self) -> u32 {
        self.minutes() % 60
    }

    /// Parses `HH:MM`, substituting `09:00` when the hour field is unusable.
    ///
    /// A missing or malformed minute field counts as zero and out-of-range
    /// totals wrap modulo 24h. Saved data depends on this never failing.
    pub fn parse_lenient(input: &str) -> Self {
        match split_fields(input) {
            Some((hours, minutes)) => Self::from_minutes(hours.saturating_mul(60).saturating_add(minutes)),
            None => Self::default(),
        }
    }

    /// Strict `HH:MM` with `HH < 24` and `MM < 60`.
    pub fn parse(input: &str) -> Option<Self> {
        let (hours, minutes) = input.trim().split_once(':')?;
        let hours = hours.trim().parse::<u32>().ok()?;
        let minutes = minutes.trim().parse::<u32>().ok()?;
        if hours >= 24 || minutes >= 60 {
            return None;
        }
        Some(Self::from_hm(hours, minutes))
    }

    /// Adds any number of minutes; only the remainder past whole days counts.
    pub fn add_minutes(self, minutes: u32) -> Self {
        Self::from_minutes(self.minutes() + minutes % MINUTES_PER_DAY)
    }

    pub fn add_stay(self, stay: StayDuration) -> Self {
        self.add_minutes(stay.minutes())
    }

    /// Rounds up to the next multiple of `step` minutes, then wraps.
    pub fn round_up_to(self, step: u32) -> Self {
        Self::from_minutes(round_up(self.minutes(), step))
    }
}

impl Default for ClockTime {
    fn default() -> Self {
        Self::from_minutes(DEFAULT_START_MINUTES)
    }
}

impl Display for ClockTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse_lenient(&raw))
    }
}

/// How long an activity occupies, in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StayDuration(u32);

impl StayDuration {
    pub fn from_minutes(minutes: u32) -> Self {
        Self(minutes)
    }

    pub fn minutes(self) -> u32 {
        self.0
    }

    /// Parses `HH:MM`; anything without a usable hour field is 1h30m.
    pub fn parse_lenient(input: &str) -> Self {
        match split_fields(input) {
            Some((hours, minutes)) => Self::from_minutes(hours.saturating_mul(60).saturating_add(minutes)),
            None => Self::default(),
        }
    }
}

impl Default for StayDuration {
    fn default() -> Self {
        Self(DEFAULT_STAY_MINUTES)
    }
}

impl Display for StayDuration {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl Serialize for StayDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for StayDuration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse_lenient(&raw))
    }
}

/// First run of digits in a free-text estimate such as `"25 mins"`.
pub fn first_integer(input: &str) -> Option<u32> {
    FIRST_INTEGER_RE
        .find(input)
        .and_then(|found| found.as_str().parse::<u32>().ok())
}

fn round_up(minutes: u32, step: u32) -> u32 {
    if step == 0 {
        return minutes;
    }
    minutes.div_ceil(step) * step
}

fn split_fields(input: &str) -> Option<(u32, u32)> {
    let trimmed = input.trim();
    let (hours, minutes) = match trimmed.split_once(':') {
        Some((hours, minutes)) => (hours, Some(minutes)),
        None => (trimmed, None),
    };
    let hours = hours.trim().parse::<u32>().ok()?;
    let minutes = minutes
        .and_then(|value| value.trim().parse::<u32>().ok())
        .unwrap_or(0);
    Some((hours, minutes))
}

#[cfg(test)]
mod tests {
    use super::{ClockTime, StayDuration, first_integer, round_up};

    #[test]
    fn parses_and_formats_zero_padded() {
        let time = ClockTime::parse_lenient("9:5");
        assert_eq!(time.minutes(), 9 * 60 + 5);
        assert_eq!(time.to_string(), "09:05");
        assert_eq!(ClockTime::from_minutes(0).to_string(), "00:00");
        assert_eq!(ClockTime::from_minutes(1439).to_string(), "23:59");
    }

    #[test]
    fn malformed_time_falls_back_to_nine() {
        assert_eq!(ClockTime::parse_lenient("").to_string(), "09:00");
        assert_eq!(ClockTime::parse_lenient("noon").to_string(), "09:00");
        assert_eq!(ClockTime::parse_lenient(":30").to_string(), "09:00");
        assert_eq!(ClockTime::parse_lenient("14").to_string(), "14:00");
        assert_eq!(ClockTime::parse_lenient("14:xx").to_string(), "14:00");
    }

    #[test]
    fn out_of_range_totals_wrap_into_the_day() {
        assert_eq!(ClockTime::parse_lenient("25:00").to_string(), "01:00");
        assert_eq!(ClockTime::parse_lenient("23:75").to_string(), "00:15");
    }

    #[test]
    fn strict_parse_rejects_out_of_range() {
        assert_eq!(ClockTime::parse("07:45"), Some(ClockTime::from_hm(7, 45)));
        assert_eq!(ClockTime::parse("24:00"), None);
        assert_eq!(ClockTime::parse("12:60"), None);
        assert_eq!(ClockTime::parse("1230"), None);
    }

    #[test]
    fn minutes_round_trip_for_every_clock_value() {
        for minutes in 0..super::MINUTES_PER_DAY {
            let text = ClockTime::from_minutes(minutes).to_string();
            let parsed = ClockTime::parse_lenient(&text);
            assert_eq!(ClockTime::from_minutes(parsed.minutes()).minutes(), parsed.minutes());
            assert_eq!(parsed.minutes(), minutes);
        }
    }

    #[test]
    fn adding_past_midnight_wraps_to_same_day() {
        let late = ClockTime::parse_lenient("23:50");
        assert_eq!(late.add_minutes(20).to_string(), "00:10");
        assert_eq!(late.add_minutes(1440).to_string(), "23:50");
        assert_eq!(late.add_minutes(1450).to_string(), "00:00");
    }

    #[test]
    fn rounds_up_to_ten_minute_steps() {
        assert_eq!(ClockTime::from_hm(10, 55).round_up_to(10).to_string(), "11:00");
        assert_eq!(ClockTime::from_hm(11, 0).round_up_to(10).to_string(), "11:00");
        assert_eq!(ClockTime::from_hm(23, 55).round_up_to(10).to_string(), "00:00");
        assert_eq!(round_up(7, 0), 7);
    }

    #[test]
    fn stay_defaults_to_ninety_minutes() {
        assert_eq!(StayDuration::default().to_string(), "01:30");
        assert_eq!(StayDuration::parse_lenient("").minutes(), 90);
        assert_eq!(StayDuration::parse_lenient("02:15").minutes(), 135);
        assert_eq!(StayDuration::parse_lenient("26:00").to_string(), "26:00");
    }

    #[test]
    fn extracts_first_integer_from_estimates() {
        assert_eq!(first_integer("25 mins"), Some(25));
        assert_eq!(first_integer("about 1 hr 20 min"), Some(1));
        assert_eq!(first_integer("short walk"), None);
    }

    #[test]
    fn serializes_as_clock_strings() {
        let json = serde_json::to_string(&ClockTime::from_hm(8, 5)).expect("serialize");
        assert_eq!(json, "\"08:05\"");
        let parsed: ClockTime = serde_json::from_str("\"garbage\"").expect("lenient deserialize");
        assert_eq!(parsed.to_string(), "09:00");
        let stay: StayDuration = serde_json::from_str("\"00:45\"").expect("deserialize stay");
        assert_eq!(stay.minutes(), 45);
    }
}
