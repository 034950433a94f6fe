//! Temporal types for XSD dateTime and date
//!
//! These types:
//! - Preserve the original lexical form
//! - Remember whether the lexical form carried a timezone
//! - Normalize to UTC instants when a timezone is present
//! - Support SPARQL accessor functions (YEAR, MONTH, DAY, HOURS, MINUTES, SECONDS, TZ)
//!
//! ## Comparison Semantics
//!
//! XSD values with and without timezone are only partially ordered. Two values
//! that both carry a timezone compare by UTC instant; two values that both lack
//! one compare by wall-clock time. A mixed pair is incomparable
//! (`compare` returns `None`). `total_cmp` supplies a deterministic tie-break
//! for ORDER BY: the instant treating a missing timezone as UTC, then
//! timezone-less before timezone-bearing.

use chrono::{
    DateTime as ChronoDateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime,
    Timelike, Utc,
};
use std::cmp::Ordering;
use std::fmt;

/// XSD dateTime
#[derive(Clone, Debug)]
pub struct DateTime {
    /// Wall-clock time as written
    local: NaiveDateTime,
    /// Timezone offset (None = no timezone in input)
    tz_offset: Option<FixedOffset>,
    /// Original string
    original: String,
}

impl DateTime {
    /// Parse an XSD dateTime string
    ///
    /// Accepts:
    /// - RFC3339 with timezone: `2024-01-15T10:30:00Z`, `2024-01-15T10:30:00+05:00`
    /// - Without timezone: `2024-01-15T10:30:00`
    /// - With fractional seconds: `2024-01-15T10:30:00.123Z`
    pub fn parse(s: &str) -> Result<Self, String> {
        if let Ok(dt) = ChronoDateTime::parse_from_rfc3339(s) {
            return Ok(Self {
                local: dt.naive_local(),
                tz_offset: Some(*dt.offset()),
                original: s.to_string(),
            });
        }

        for fmt in &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%dT%H:%M:%S%z"] {
            if let Ok(dt) = ChronoDateTime::parse_from_str(s, fmt) {
                return Ok(Self {
                    local: dt.naive_local(),
                    tz_offset: Some(*dt.offset()),
                    original: s.to_string(),
                });
            }
        }

        for fmt in &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"] {
            if let Ok(local) = NaiveDateTime::parse_from_str(s, fmt) {
                return Ok(Self {
                    local,
                    tz_offset: None,
                    original: s.to_string(),
                });
            }
        }

        Err(format!("Cannot parse dateTime: {}", s))
    }

    /// Build from a chrono instant, keeping its offset
    pub fn from_chrono(dt: ChronoDateTime<FixedOffset>) -> Self {
        Self {
            local: dt.naive_local(),
            tz_offset: Some(*dt.offset()),
            original: dt.to_rfc3339(),
        }
    }

    /// Current time in UTC
    pub fn now() -> Self {
        Self::from_chrono(Utc::now().fixed_offset())
    }

    /// Build from a date at midnight, carrying the date's timezone
    pub fn from_date(date: &Date) -> Self {
        let local = date.date.and_time(NaiveTime::MIN);
        let original = match date.timezone() {
            Some(tz) => format!("{}T00:00:00{}", date.date.format("%Y-%m-%d"), tz),
            None => format!("{}T00:00:00", date.date.format("%Y-%m-%d")),
        };
        Self {
            local,
            tz_offset: date.tz_offset,
            original,
        }
    }

    pub fn has_timezone(&self) -> bool {
        self.tz_offset.is_some()
    }

    pub fn tz_offset(&self) -> Option<FixedOffset> {
        self.tz_offset
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    /// UTC instant; a missing timezone is read as UTC
    pub fn instant(&self) -> ChronoDateTime<Utc> {
        match self.tz_offset {
            Some(offset) => (self.local - offset).and_utc(),
            None => self.local.and_utc(),
        }
    }

    /// XSD partial order: `None` when exactly one side carries a timezone
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self.tz_offset, other.tz_offset) {
            (Some(_), Some(_)) => Some(self.instant().cmp(&other.instant())),
            (None, None) => Some(self.local.cmp(&other.local)),
            _ => None,
        }
    }

    /// Total order used where an answer is always required
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        self.compare(other).unwrap_or_else(|| {
            self.instant()
                .cmp(&other.instant())
                .then_with(|| self.has_timezone().cmp(&other.has_timezone()))
        })
    }

    // === SPARQL accessor functions (wall-clock components) ===

    pub fn year(&self) -> i32 {
        self.local.year()
    }

    pub fn month(&self) -> u32 {
        self.local.month()
    }

    pub fn day(&self) -> u32 {
        self.local.day()
    }

    pub fn hours(&self) -> u32 {
        self.local.hour()
    }

    pub fn minutes(&self) -> u32 {
        self.local.minute()
    }

    /// Seconds component with fractional part, as a decimal lexical form
    pub fn seconds_lexical(&self) -> String {
        let secs = self.local.second();
        let nanos = self.local.nanosecond();
        if nanos == 0 {
            secs.to_string()
        } else {
            let frac = format!("{:09}", nanos);
            format!("{}.{}", secs, frac.trim_end_matches('0'))
        }
    }

    /// Timezone string (`"Z"`, `"+05:00"`) or None if no timezone
    pub fn timezone(&self) -> Option<String> {
        self.tz_offset.map(format_offset)
    }

    /// Offset in seconds east of UTC
    pub fn offset_seconds(&self) -> Option<i32> {
        self.tz_offset.map(|o| o.local_minus_utc())
    }
}

impl PartialEq for DateTime {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original)
    }
}

/// XSD date (year-month-day with optional timezone)
#[derive(Clone, Debug)]
pub struct Date {
    date: NaiveDate,
    tz_offset: Option<FixedOffset>,
    original: String,
}

impl Date {
    /// Parse an XSD date string
    ///
    /// Accepts:
    /// - With timezone: `2024-01-15Z`, `2024-01-15+05:00`
    /// - Without timezone: `2024-01-15`
    pub fn parse(s: &str) -> Result<Self, String> {
        if let Some(date_part) = s.strip_suffix('Z') {
            if let Ok(date) = NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
                return Ok(Self {
                    date,
                    tz_offset: FixedOffset::east_opt(0),
                    original: s.to_string(),
                });
            }
        }

        // Offset suffix is always the final six characters (`+05:00`)
        if s.len() > 6 && s.is_char_boundary(s.len() - 6) {
            let (date_part, offset_part) = s.split_at(s.len() - 6);
            if let (Ok(date), Some(offset)) = (
                NaiveDate::parse_from_str(date_part, "%Y-%m-%d"),
                parse_offset(offset_part),
            ) {
                return Ok(Self {
                    date,
                    tz_offset: Some(offset),
                    original: s.to_string(),
                });
            }
        }

        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(Self {
                date,
                tz_offset: None,
                original: s.to_string(),
            });
        }

        Err(format!("Cannot parse date: {}", s))
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn has_timezone(&self) -> bool {
        self.tz_offset.is_some()
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    /// Dates compare on year, month and day; a timezone carries no time of
    /// day to normalize, so mixed pairs are still comparable.
    pub fn compare(&self, other: &Self) -> Ordering {
        self.date.cmp(&other.date)
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn month(&self) -> u32 {
        self.date.month()
    }

    pub fn day(&self) -> u32 {
        self.date.day()
    }

    pub fn timezone(&self) -> Option<String> {
        self.tz_offset.map(format_offset)
    }

    pub fn offset_seconds(&self) -> Option<i32> {
        self.tz_offset.map(|o| o.local_minus_utc())
    }
}

impl PartialEq for Date {
    fn eq(&self, other: &Self) -> bool {
        self.date == other.date
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original)
    }
}

fn parse_offset(s: &str) -> Option<FixedOffset> {
    let sign = match s.as_bytes().first()? {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };
    let (hours, mins) = s[1..].split_once(':')?;
    let total = sign * (hours.parse::<i32>().ok()? * 3600 + mins.parse::<i32>().ok()? * 60);
    FixedOffset::east_opt(total)
}

fn format_offset(tz: FixedOffset) -> String {
    let secs = tz.local_minus_utc();
    if secs == 0 {
        "Z".to_string()
    } else {
        let hours = secs.abs() / 3600;
        let mins = (secs.abs() % 3600) / 60;
        let sign = if secs >= 0 { '+' } else { '-' };
        format!("{}{:02}:{:02}", sign, hours, mins)
    }
}
