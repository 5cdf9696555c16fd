//! Date formatting

use chrono::{DateTime, TimeZone};
use std::fmt::Display;

/// Format a date with a Moment.js style pattern
///
/// ```ignore
/// format_date(&date, "MMM D, YYYY") // -> "Jan 5, 2024"
/// ```
pub fn format_date<Tz: TimeZone>(date: &DateTime<Tz>, format: &str) -> String
where
    Tz::Offset: Display,
{
    date.format(&moment_to_chrono(format)).to_string()
}

/// ISO 8601 timestamp, as used in sitemaps
pub fn date_xml<Tz: TimeZone>(date: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    date.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}

/// Translate Moment.js tokens into chrono's strftime syntax
///
/// Tokens are matched longest first; text in `[brackets]` is literal.
fn moment_to_chrono(format: &str) -> String {
    const TOKENS: &[(&str, &str)] = &[
        ("YYYY", "%Y"),
        ("YY", "%y"),
        ("MMMM", "%B"),
        ("MMM", "%b"),
        ("MM", "%m"),
        ("M", "%-m"),
        ("dddd", "%A"),
        ("ddd", "%a"),
        ("DDDD", "%j"),
        ("DD", "%d"),
        ("Do", "%-d"),
        ("D", "%-d"),
        ("HH", "%H"),
        ("H", "%-H"),
        ("hh", "%I"),
        ("h", "%-I"),
        ("mm", "%M"),
        ("ss", "%S"),
        ("SSS", "%3f"),
        ("A", "%p"),
        ("a", "%P"),
        ("ZZ", "%z"),
        ("Z", "%:z"),
        ("LL", "%B %-d, %Y"),
        ("L", "%m/%d/%Y"),
    ];

    let mut out = String::with_capacity(format.len() * 2);
    let mut rest = format;

    'outer: while !rest.is_empty() {
        if let Some(literal) = rest.strip_prefix('[') {
            if let Some(end) = literal.find(']') {
                out.push_str(&literal[..end].replace('%', "%%"));
                rest = &literal[end + 1..];
                continue;
            }
        }
        // Longest token wins at this position
        let mut best: Option<(&str, &str)> = None;
        for &(token, strftime) in TOKENS {
            if rest.starts_with(token) && best.map_or(true, |(b, _)| token.len() > b.len()) {
                best = Some((token, strftime));
            }
        }
        if let Some((token, strftime)) = best {
            out.push_str(strftime);
            rest = &rest[token.len()..];
            continue 'outer;
        }

        let c = rest.chars().next().unwrap_or_default();
        if c == '%' {
            out.push_str("%%");
        } else {
            out.push(c);
        }
        rest = &rest[c.len_utf8()..];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    fn date() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 5, 14, 7, 9)
            .unwrap()
    }

    #[test]
    fn test_format_date() {
        let date = date();
        assert_eq!(format_date(&date, "YYYY-MM-DD"), "2024-01-05");
        assert_eq!(format_date(&date, "MMM D, YYYY"), "Jan 5, 2024");
        assert_eq!(format_date(&date, "LL"), "January 5, 2024");
        assert_eq!(format_date(&date, "HH:mm:ss"), "14:07:09");
        assert_eq!(format_date(&date, "dddd"), "Friday");
        assert_eq!(format_date(&date, "[Day] D"), "Day 5");
    }

    #[test]
    fn test_date_xml() {
        assert_eq!(date_xml(&date()), "2024-01-05T14:07:09+01:00");
    }

    #[test]
    fn test_moment_to_chrono() {
        assert_eq!(moment_to_chrono("YYYY-MM-DD"), "%Y-%m-%d");
        assert_eq!(moment_to_chrono("HH:mm"), "%H:%M");
        assert_eq!(moment_to_chrono("100%"), "100%%");
    }
}
