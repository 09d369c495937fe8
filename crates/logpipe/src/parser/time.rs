//! strptime-style timestamp parsing on top of chrono.
//!
//! Plain chrono directives are supported as-is, including exact-width
//! fractions (`%3f` milliseconds, `%6f` microseconds, `%9f` nanoseconds).
//! Two extra directives cover what log formats need and chrono lacks:
//!
//! - `%L` fractional seconds of any width, after any separator
//!   (`10:42:29.902022`, `18:25:21,107`)
//! - `%Z` a zone token: a numeric offset, `UTC`/`GMT`/`Z`, or one of the
//!   common abbreviations in [`ZONE_ABBREVIATIONS`]
//!
//! A format without a year directive takes the current UTC year. A format
//! without an offset directive is read as UTC.

use chrono::format::{self, Item, Parsed, StrftimeItems};
use chrono::{DateTime, Datelike, TimeZone, Utc};
use thiserror::Error;

/// Directives that pin the year (directly or as part of a composite).
const YEAR_DIRECTIVES: &[char] = &['Y', 'y', 'C', 'G', 'g', 'F', 'D', 'x', 'c', 's', '+'];

/// Fixed offsets (seconds east of UTC) for zone abbreviations `%Z` accepts.
/// Ambiguous names (`IST`, `CST` in China) take their most common reading
/// in server logs; anything not listed fails to parse.
pub const ZONE_ABBREVIATIONS: &[(&str, i64)] = &[
    ("UTC", 0),
    ("UT", 0),
    ("GMT", 0),
    ("Z", 0),
    ("WET", 0),
    ("WEST", 3600),
    ("BST", 3600),
    ("CET", 3600),
    ("CEST", 2 * 3600),
    ("MET", 3600),
    ("MEST", 2 * 3600),
    ("EET", 2 * 3600),
    ("EEST", 3 * 3600),
    ("MSK", 3 * 3600),
    ("IST", 5 * 3600 + 1800),
    ("HKT", 8 * 3600),
    ("SGT", 8 * 3600),
    ("JST", 9 * 3600),
    ("KST", 9 * 3600),
    ("AEST", 10 * 3600),
    ("AEDT", 11 * 3600),
    ("NZST", 12 * 3600),
    ("NZDT", 13 * 3600),
    ("AST", -4 * 3600),
    ("ADT", -3 * 3600),
    ("EST", -5 * 3600),
    ("EDT", -4 * 3600),
    ("CST", -6 * 3600),
    ("CDT", -5 * 3600),
    ("MST", -7 * 3600),
    ("MDT", -6 * 3600),
    ("PST", -8 * 3600),
    ("PDT", -7 * 3600),
    ("AKST", -9 * 3600),
    ("AKDT", -8 * 3600),
    ("HST", -10 * 3600),
];

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TimeFormatError {
    #[error("time format {0:?} ends with a dangling '%'")]
    Dangling(String),

    #[error("time format {0:?} contains an unsupported directive")]
    Unsupported(String),

    #[error("time format is empty")]
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Chrono(String),
    Fraction,
    Zone,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeFormat {
    source: String,
    segments: Vec<Segment>,
    has_year: bool,
}

impl TimeFormat {
    pub fn new(format: &str) -> Result<Self, TimeFormatError> {
        if format.is_empty() {
            return Err(TimeFormatError::Empty);
        }

        let mut segments = Vec::new();
        let mut current = String::new();
        let mut has_year = false;
        let mut chars = format.chars();

        while let Some(c) = chars.next() {
            if c != '%' {
                current.push(c);
                continue;
            }
            match chars.next() {
                Some('L') => {
                    push_chrono(&mut segments, &mut current);
                    segments.push(Segment::Fraction);
                }
                Some('Z') => {
                    push_chrono(&mut segments, &mut current);
                    segments.push(Segment::Zone);
                }
                Some(d) => {
                    if YEAR_DIRECTIVES.contains(&d) {
                        has_year = true;
                    }
                    current.push('%');
                    current.push(d);
                }
                None => return Err(TimeFormatError::Dangling(format.to_string())),
            }
        }
        push_chrono(&mut segments, &mut current);

        for segment in &segments {
            if let Segment::Chrono(fmt) = segment {
                if StrftimeItems::new(fmt).any(|item| matches!(item, Item::Error)) {
                    return Err(TimeFormatError::Unsupported(format.to_string()));
                }
            }
        }

        Ok(Self {
            source: format.to_string(),
            segments,
            has_year,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Parse `text` into a UTC instant. The error string is diagnostic only.
    pub fn parse(&self, text: &str) -> Result<DateTime<Utc>, String> {
        let mut parsed = Parsed::new();
        let mut rest = text;

        for segment in &self.segments {
            match segment {
                Segment::Chrono(fmt) => {
                    rest = format::parse_and_remainder(&mut parsed, rest, StrftimeItems::new(fmt))
                        .map_err(|e| e.to_string())?;
                }
                Segment::Fraction => {
                    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
                    if digits == 0 {
                        return Err("expected fractional seconds".to_string());
                    }
                    let (fraction, tail) = rest.split_at(digits);
                    parsed
                        .set_nanosecond(fraction_nanos(fraction))
                        .map_err(|e| e.to_string())?;
                    rest = tail;
                }
                Segment::Zone => {
                    let (offset, tail) = take_zone(rest)?;
                    parsed.set_offset(offset).map_err(|e| e.to_string())?;
                    rest = tail;
                }
            }
        }

        if !rest.trim().is_empty() {
            return Err(format!("trailing input {rest:?}"));
        }

        if !self.has_year {
            parsed
                .set_year(i64::from(Utc::now().year()))
                .map_err(|e| e.to_string())?;
        }

        match parsed.to_datetime() {
            Ok(dt) => Ok(dt.with_timezone(&Utc)),
            Err(_) => parsed
                .to_naive_datetime_with_offset(0)
                .map(|naive| Utc.from_utc_datetime(&naive))
                .map_err(|e| e.to_string()),
        }
    }
}

fn push_chrono(segments: &mut Vec<Segment>, current: &mut String) {
    if !current.is_empty() {
        segments.push(Segment::Chrono(std::mem::take(current)));
    }
}

/// Scale a run of fractional digits to nanoseconds, ignoring digits past the ninth.
fn fraction_nanos(digits: &str) -> i64 {
    let mut nanos: i64 = 0;
    let mut width = 0;
    for b in digits.bytes().take(9) {
        nanos = nanos * 10 + i64::from(b - b'0');
        width += 1;
    }
    while width < 9 {
        nanos *= 10;
        width += 1;
    }
    nanos
}

/// Consume a zone token and return its offset in seconds.
fn take_zone(text: &str) -> Result<(i64, &str), String> {
    let text = text.trim_start();

    if text.starts_with('+') || text.starts_with('-') {
        let sign: i64 = if text.starts_with('-') { -1 } else { 1 };
        let body = &text[1..];
        let len = body
            .bytes()
            .take_while(|b| b.is_ascii_digit() || *b == b':')
            .count();
        let digits: String = body[..len].chars().filter(char::is_ascii_digit).collect();
        if digits.len() != 2 && digits.len() != 4 {
            return Err(format!("invalid offset {:?}", &text[..len + 1]));
        }
        let hours: i64 = digits[..2].parse().map_err(|_| "invalid offset hours".to_string())?;
        let minutes: i64 = if digits.len() == 4 {
            digits[2..].parse().map_err(|_| "invalid offset minutes".to_string())?
        } else {
            0
        };
        return Ok((sign * (hours * 3600 + minutes * 60), &body[len..]));
    }

    let len = text.bytes().take_while(u8::is_ascii_alphabetic).count();
    let name = &text[..len];
    if name.is_empty() {
        return Err("expected a time zone".to_string());
    }
    ZONE_ABBREVIATIONS
        .iter()
        .find(|(abbr, _)| abbr.eq_ignore_ascii_case(name))
        .map(|(_, offset)| (*offset, &text[len..]))
        .ok_or_else(|| format!("unknown time zone {name:?}"))
}
