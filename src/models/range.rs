use chrono::{DateTime, Duration, Months, NaiveTime, TimeZone, Timelike, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::telemetry::TelemetrySample;

/// Dashboard chart window, always ending now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum TimeRange {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "3d")]
    ThreeDays,
    #[serde(rename = "1w")]
    OneWeek,
    #[serde(rename = "1m")]
    OneMonth,
}

impl TimeRange {
    /// Unknown or missing values fall back to one day.
    pub fn parse_lenient(value: Option<&str>) -> Self {
        match value {
            Some("3d") => TimeRange::ThreeDays,
            Some("1w") => TimeRange::OneWeek,
            Some("1m") => TimeRange::OneMonth,
            _ => TimeRange::OneDay,
        }
    }

    pub fn start<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DateTime<Utc> {
        let now = now.with_timezone(&Utc);
        match self {
            TimeRange::OneDay => now - Duration::days(1),
            TimeRange::ThreeDays => now - Duration::days(3),
            TimeRange::OneWeek => now - Duration::days(7),
            TimeRange::OneMonth => now.checked_sub_months(Months::new(1)).unwrap_or(now - Duration::days(30)),
        }
    }
}

/// Report window; calendar based in the server's time zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReportRange {
    Today,
    Yesterday,
    Week,
    Month,
}

impl ReportRange {
    pub fn parse_lenient(value: Option<&str>) -> Self {
        match value {
            Some("yesterday") => ReportRange::Yesterday,
            Some("week") => ReportRange::Week,
            Some("month") => ReportRange::Month,
            _ => ReportRange::Today,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportRange::Today => "today",
            ReportRange::Yesterday => "yesterday",
            ReportRange::Week => "week",
            ReportRange::Month => "month",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ReportRange::Today => "Today",
            ReportRange::Yesterday => "Yesterday",
            ReportRange::Week => "Week",
            ReportRange::Month => "Month",
        }
    }

    /// Inclusive `[start, end]` bounds.
    pub fn window<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> (DateTime<Utc>, DateTime<Utc>) {
        let tz = now.timezone();
        let midnight = |date: chrono::NaiveDate| -> DateTime<Utc> {
            date.and_time(NaiveTime::MIN)
                .and_local_timezone(tz.clone())
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|| date.and_time(NaiveTime::MIN).and_utc())
        };
        let today = now.date_naive();
        let now_utc = now.with_timezone(&Utc);
        match self {
            ReportRange::Today => (midnight(today), now_utc),
            ReportRange::Yesterday => {
                let start = midnight(today - Duration::days(1));
                (start, midnight(today) - Duration::milliseconds(1))
            }
            ReportRange::Week => (midnight(today - Duration::days(7)), now_utc),
            ReportRange::Month => {
                let day = today.checked_sub_months(Months::new(1)).unwrap_or(today - Duration::days(30));
                (midnight(day), now_utc)
            }
        }
    }
}

/// Daylight split used by the dashboard: day is [06:00, 18:00) local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DayPart {
    All,
    Day,
    Night,
}

impl DayPart {
    pub fn parse_lenient(value: Option<&str>) -> Self {
        match value {
            Some("day") => DayPart::Day,
            Some("night") => DayPart::Night,
            _ => DayPart::All,
        }
    }

    pub fn contains<Tz: TimeZone>(&self, sample: &TelemetrySample, tz: &Tz) -> bool {
        let hour = sample.timestamp.with_timezone(tz).hour();
        let daylight = (6..18).contains(&hour);
        match self {
            DayPart::All => true,
            DayPart::Day => daylight,
            DayPart::Night => !daylight,
        }
    }
}
