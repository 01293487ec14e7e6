use chrono::{DateTime, Local, SecondsFormat, TimeZone, Utc};

/// Wall-clock time shown in the activity log, `HH:MM:SS`.
pub fn format_clock<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    time.format("%H:%M:%S").to_string()
}

pub fn clock_now() -> String {
    format_clock(&Local::now())
}

/// ISO-8601 UTC timestamp with millisecond precision, e.g.
/// `2024-05-01T09:30:00.000Z`. Used in bundle metadata.
pub fn iso_timestamp(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Milliseconds since the UNIX epoch. Bundle archives are named after it.
pub fn unix_millis(time: &DateTime<Utc>) -> i64 {
    time.timestamp_millis()
}
