//! Source date formats and canonical ISO 8601 emission.
//!
//! Collected dates arrive in whatever shape the acquisition system used;
//! rules name the format explicitly and the engine re-emits canonical
//! ISO 8601 extended form, preserving partial precision (2008-09 stays
//! 2008-09). A numeric input shorter than a year-leading token degrades to
//! a partial date rather than being rejected: 8 digits give a full date,
//! 6 give a year-month, 4 give a year.

use chrono::{NaiveDate, NaiveDateTime};

/// A named source date format, as referenced from rule expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    /// `YYYYMMDD`, degrading to year-month and year.
    CompactYmd,
    /// `DDMMYYYY`
    CompactDmy,
    /// `MMDDYYYY`
    CompactMdy,
    /// `YYYY-MM-DD`
    DashedYmd,
    /// `DD-MON-YYYY` (e.g. `10-SEP-2008`)
    DayMonYear,
    /// `MM/DD/YYYY`
    SlashMdy,
    /// `DD/MM/YYYY`
    SlashDmy,
    /// `DD.MM.YYYY`
    DottedDmy,
    /// Any canonical full-or-partial ISO 8601 value, passed through.
    Iso8601,
    /// `YYYY-MM-DDTHH:MM:SS`
    IsoDateTime,
    /// `YYYY-MM-DD HH:MM:SS`
    SpacedDateTime,
    /// `YYYY-MM-DD HH:MM`
    SpacedDateTimeMinutes,
    /// `DD-MON-YYYY HH:MM`
    DayMonYearTime,
    /// `MM/DD/YYYY HH:MM`
    SlashMdyTime,
}

impl DateFormat {
    /// Resolve a format name as written in a rule expression.
    pub fn parse_name(name: &str) -> Option<Self> {
        match name.trim().to_uppercase().as_str() {
            "YYYYMMDD" => Some(Self::CompactYmd),
            "DDMMYYYY" => Some(Self::CompactDmy),
            "MMDDYYYY" => Some(Self::CompactMdy),
            "YYYY-MM-DD" => Some(Self::DashedYmd),
            "DD-MON-YYYY" => Some(Self::DayMonYear),
            "MM/DD/YYYY" => Some(Self::SlashMdy),
            "DD/MM/YYYY" => Some(Self::SlashDmy),
            "DD.MM.YYYY" => Some(Self::DottedDmy),
            "ISO8601" => Some(Self::Iso8601),
            "YYYY-MM-DDTHH:MM:SS" => Some(Self::IsoDateTime),
            "YYYY-MM-DD HH:MM:SS" => Some(Self::SpacedDateTime),
            "YYYY-MM-DD HH:MM" => Some(Self::SpacedDateTimeMinutes),
            "DD-MON-YYYY HH:MM" => Some(Self::DayMonYearTime),
            "MM/DD/YYYY HH:MM" => Some(Self::SlashMdyTime),
            _ => None,
        }
    }

    fn chrono_date_pattern(&self) -> Option<&'static str> {
        match self {
            Self::CompactYmd => Some("%Y%m%d"),
            Self::CompactDmy => Some("%d%m%Y"),
            Self::CompactMdy => Some("%m%d%Y"),
            Self::DashedYmd => Some("%Y-%m-%d"),
            Self::DayMonYear => Some("%d-%b-%Y"),
            Self::SlashMdy => Some("%m/%d/%Y"),
            Self::SlashDmy => Some("%d/%m/%Y"),
            Self::DottedDmy => Some("%d.%m.%Y"),
            _ => None,
        }
    }

    fn chrono_datetime_pattern(&self) -> Option<&'static str> {
        match self {
            Self::IsoDateTime => Some("%Y-%m-%dT%H:%M:%S"),
            Self::SpacedDateTime => Some("%Y-%m-%d %H:%M:%S"),
            Self::SpacedDateTimeMinutes => Some("%Y-%m-%d %H:%M"),
            Self::DayMonYearTime => Some("%d-%b-%Y %H:%M"),
            Self::SlashMdyTime => Some("%m/%d/%Y %H:%M"),
            _ => None,
        }
    }

    /// True when shorter numeric input can drop trailing precision.
    fn degrades(&self) -> bool {
        matches!(self, Self::CompactYmd | Self::DashedYmd)
    }
}

/// A parsed calendar value with its collected precision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParsedDate {
    Year(i32),
    YearMonth { year: i32, month: u32 },
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl ParsedDate {
    /// Canonical ISO 8601 extended form, preserving precision.
    pub fn to_iso8601(&self) -> String {
        match self {
            Self::Year(year) => format!("{year:04}"),
            Self::YearMonth { year, month } => format!("{year:04}-{month:02}"),
            Self::Date(date) => date.format("%Y-%m-%d").to_string(),
            Self::DateTime(dt) => dt.format("%Y-%m-%dT%H:%M:%S").to_string(),
        }
    }

    /// The complete calendar date, when precision allows one.
    pub fn complete(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(date) => Some(*date),
            Self::DateTime(dt) => Some(dt.date()),
            _ => None,
        }
    }
}

/// Parse a collected value by one declared format.
pub fn parse_with(value: &str, format: DateFormat) -> Option<ParsedDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if format == DateFormat::Iso8601 {
        return parse_canonical(trimmed);
    }

    if let Some(pattern) = format.chrono_datetime_pattern() {
        return NaiveDateTime::parse_from_str(trimmed, pattern).ok().map(ParsedDate::DateTime);
    }

    let pattern = format.chrono_date_pattern()?;
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, pattern) {
        return Some(ParsedDate::Date(date));
    }

    if format.degrades() {
        return degrade_year_leading(trimmed);
    }
    None
}

/// Right-truncated numeric input under a year-leading token: six digits
/// carry year and month, four carry the year alone.
fn degrade_year_leading(value: &str) -> Option<ParsedDate> {
    let digits: String = value.chars().filter(|c| *c != '-').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    match digits.len() {
        6 => {
            let year = digits[0..4].parse().ok()?;
            let month: u32 = digits[4..6].parse().ok()?;
            (1..=12).contains(&month).then_some(ParsedDate::YearMonth { year, month })
        }
        4 => digits.parse().ok().map(ParsedDate::Year),
        _ => None,
    }
}

/// Parse a value by the declared format and re-emit canonical ISO 8601.
///
/// Already-canonical input is returned unchanged whatever the declared
/// format, which makes the operation idempotent.
pub fn reformat(value: &str, format: DateFormat) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(parsed) = parse_canonical(trimmed) {
        return Some(parsed.to_iso8601());
    }
    parse_with(trimmed, format).map(|parsed| parsed.to_iso8601())
}

/// Parse a canonical full-or-partial ISO 8601 extended value.
///
/// Accepted shapes: `YYYY`, `YYYY-MM`, `YYYY-MM-DD`, and a full date with
/// `THH:MM` or `THH:MM:SS`. Basic format (no delimiters) is not canonical.
pub fn parse_canonical(value: &str) -> Option<ParsedDate> {
    let trimmed = value.trim();
    let (date_part, time_part) = match trimmed.split_once('T') {
        Some((date, time)) => (date, Some(time)),
        None => (trimmed, None),
    };

    let date = match date_part.len() {
        4 => {
            let year = parse_digits(date_part)?;
            if time_part.is_some() {
                return None;
            }
            return Some(ParsedDate::Year(year as i32));
        }
        7 => {
            if date_part.as_bytes()[4] != b'-' {
                return None;
            }
            let year = parse_digits(&date_part[0..4])? as i32;
            let month = parse_digits(&date_part[5..7])?;
            if !(1..=12).contains(&month) || time_part.is_some() {
                return None;
            }
            return Some(ParsedDate::YearMonth { year, month });
        }
        10 => {
            let bytes = date_part.as_bytes();
            if bytes[4] != b'-' || bytes[7] != b'-' {
                return None;
            }
            let year = parse_digits(&date_part[0..4])? as i32;
            let month = parse_digits(&date_part[5..7])?;
            let day = parse_digits(&date_part[8..10])?;
            NaiveDate::from_ymd_opt(year, month, day)?
        }
        _ => return None,
    };

    match time_part {
        None => Some(ParsedDate::Date(date)),
        Some(time) => {
            let (hour, minute, second) = parse_time(time)?;
            date.and_hms_opt(hour, minute, second).map(ParsedDate::DateTime)
        }
    }
}

fn parse_time(time: &str) -> Option<(u32, u32, u32)> {
    let bytes = time.as_bytes();
    match bytes.len() {
        5 => {
            if bytes[2] != b':' {
                return None;
            }
            let hour = parse_digits(&time[0..2])?;
            let minute = parse_digits(&time[3..5])?;
            (hour < 24 && minute < 60).then_some((hour, minute, 0))
        }
        8 => {
            if bytes[2] != b':' || bytes[5] != b':' {
                return None;
            }
            let hour = parse_digits(&time[0..2])?;
            let minute = parse_digits(&time[3..5])?;
            let second = parse_digits(&time[6..8])?;
            (hour < 24 && minute < 60 && second < 60).then_some((hour, minute, second))
        }
        _ => None,
    }
}

fn parse_digits(text: &str) -> Option<u32> {
    text.chars().all(|c| c.is_ascii_digit()).then(|| text.parse().ok())?
}

/// Whether a populated value is canonical full-or-partial ISO 8601.
pub fn is_canonical(value: &str) -> bool {
    parse_canonical(value).is_some()
}

/// The complete calendar date carried by a canonical value, if any.
/// Partial dates have no complete date and return `None`.
pub fn complete_date(value: &str) -> Option<NaiveDate> {
    parse_canonical(value.trim()).and_then(|parsed| parsed.complete())
}
