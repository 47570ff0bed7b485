use crate::error::{ConfigError, MomentError};
use std::fmt;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");
const TIME_HM: &[FormatItem<'static>] = format_description!("[hour]:[minute]");
const TIME_HMS: &[FormatItem<'static>] = format_description!("[hour]:[minute]:[second]");
const OFFSET_FORMAT: &[FormatItem<'static>] =
    format_description!("[offset_hour sign:mandatory]:[offset_minute]");
/// Shape accepted by `git rev-list --before`, with an explicit zone so the
/// result does not depend on the host's local timezone.
const GIT_FORMAT: &[FormatItem<'static>] = format_description!(
    "[year]-[month]-[day] [hour]:[minute]:[second] [offset_hour sign:mandatory][offset_minute]"
);
const DISPLAY_FORMAT: &[FormatItem<'static>] = format_description!(
    "[year]-[month]-[day] [hour]:[minute] [offset_hour sign:mandatory]:[offset_minute]"
);

/// Format a timestamp the way `git log --format=%ci` prints it.
pub fn format_git_date(at: OffsetDateTime) -> String {
    at.format(GIT_FORMAT).unwrap_or_default()
}

/// Parse a configured UTC offset such as `"-05:00"`.
pub fn parse_utc_offset(raw: &str) -> Result<UtcOffset, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
        return Ok(UtcOffset::UTC);
    }
    UtcOffset::parse(trimmed, OFFSET_FORMAT).map_err(|_| ConfigError::InvalidOffset(raw.into()))
}

/// The single due moment shared by every repository of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetMoment {
    due: OffsetDateTime,
}

impl TargetMoment {
    pub fn new(date: Date, time: Time, offset: UtcOffset) -> Self {
        Self {
            due: PrimitiveDateTime::new(date, time).assume_offset(offset),
        }
    }

    /// Build from operator input: `yyyy-mm-dd` and 24h `HH:MM[:SS]`, read at `offset`.
    pub fn parse(date: &str, time: &str, offset: UtcOffset) -> Result<Self, MomentError> {
        let date_str = date.trim();
        let time_str = time.trim();
        let date = Date::parse(date_str, DATE_FORMAT)
            .map_err(|_| MomentError::InvalidDate(date.into()))?;
        let time = Time::parse(time_str, TIME_HMS)
            .or_else(|_| Time::parse(time_str, TIME_HM))
            .map_err(|_| MomentError::InvalidTime(time.into()))?;
        Ok(Self::new(date, time, offset))
    }

    /// Fill in whichever of date/time the operator left out with the current
    /// wall clock at `offset`, truncated to the minute.
    pub fn parse_or_now(
        date: Option<&str>,
        time: Option<&str>,
        offset: UtcOffset,
    ) -> Result<Self, MomentError> {
        let now = OffsetDateTime::now_utc().to_offset(offset);
        let today = now
            .date()
            .format(DATE_FORMAT)
            .unwrap_or_default();
        let this_minute = format!("{:02}:{:02}", now.hour(), now.minute());
        Self::parse(
            date.filter(|d| !d.trim().is_empty()).unwrap_or(&today),
            time.filter(|t| !t.trim().is_empty()).unwrap_or(&this_minute),
            offset,
        )
    }

    pub fn due(&self) -> OffsetDateTime {
        self.due
    }

    pub fn offset(&self) -> UtcOffset {
        self.due.offset()
    }

    /// True when `created_at`, viewed at the run's offset, is strictly later than the due moment.
    pub fn is_before(&self, created_at: OffsetDateTime) -> bool {
        created_at.to_offset(self.offset()) > self.due
    }

    /// Timestamp argument for `git rev-list --before=`.
    pub fn git_timestamp(&self) -> String {
        format_git_date(self.due)
    }
}

impl fmt::Display for TargetMoment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.due.format(DISPLAY_FORMAT).map_err(|_| fmt::Error)?;
        f.write_str(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime, offset, time};

    #[test]
    fn parse_minutes_and_seconds() {
        let a = TargetMoment::parse("2024-02-01", "23:59", offset!(-5)).unwrap();
        let b = TargetMoment::parse(" 2024-02-01 ", "23:59:00", offset!(-5)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.due(), datetime!(2024-02-01 23:59 -5));
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert_eq!(
            TargetMoment::parse("02/01/2024", "23:59", UtcOffset::UTC),
            Err(MomentError::InvalidDate("02/01/2024".into()))
        );
        assert_eq!(
            TargetMoment::parse("2024-02-01", "11pm", UtcOffset::UTC),
            Err(MomentError::InvalidTime("11pm".into()))
        );
    }

    #[test]
    fn git_timestamp_carries_offset() {
        let m = TargetMoment::new(date!(2024 - 02 - 01), time!(9:05), offset!(-5));
        assert_eq!(m.git_timestamp(), "2024-02-01 09:05:00 -0500");
        assert_eq!(m.to_string(), "2024-02-01 09:05 -05:00");
    }

    #[test]
    fn created_after_due_is_strict() {
        let m = TargetMoment::new(date!(2024 - 02 - 01), time!(12:00), offset!(-5));
        // 17:00 UTC == 12:00 -05:00
        assert!(!m.is_before(datetime!(2024-02-01 17:00 UTC)));
        assert!(m.is_before(datetime!(2024-02-01 17:00:01 UTC)));
        assert!(!m.is_before(datetime!(2024-01-30 08:00 UTC)));
    }

    #[test]
    fn offset_parsing() {
        assert_eq!(parse_utc_offset("-05:00").unwrap(), offset!(-5));
        assert_eq!(parse_utc_offset("+05:30").unwrap(), offset!(+5:30));
        assert_eq!(parse_utc_offset("UTC").unwrap(), UtcOffset::UTC);
        assert!(matches!(
            parse_utc_offset("EST"),
            Err(ConfigError::InvalidOffset(_))
        ));
    }

    #[test]
    fn parse_or_now_keeps_given_parts() {
        let m = TargetMoment::parse_or_now(Some("2023-09-10"), None, UtcOffset::UTC).unwrap();
        assert_eq!(m.due().date(), date!(2023 - 09 - 10));
        let m = TargetMoment::parse_or_now(Some(""), Some("08:30"), UtcOffset::UTC).unwrap();
        assert_eq!(m.due().time(), time!(8:30));
    }
}
