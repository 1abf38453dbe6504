use chrono::{DateTime, NaiveDate, NaiveDateTime};
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::path::Path;

/// Format used when writing dates back into EXIF fields and when asking the user for one.
pub const EXIF_DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

lazy_static! {
    // Greedy prefix so the rightmost timestamp in the name wins.
    static ref FILENAME_TIMESTAMP: Regex =
        Regex::new(r"^.*([12][0-9]{3}[01][0-9][0-3][0-9][-_T][0-9]{6})").unwrap();
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y:%m:%d %H:%M:%S",
    "%Y%m%dT%H%M%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d", "%Y:%m:%d"];

/// The metadata source a candidate date was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateSource {
    Filename,
    DateTime,
    DateTimeDigitized,
    DateTimeOriginal,
}

impl DateSource {
    pub const ALL: [DateSource; 4] = [
        DateSource::Filename,
        DateSource::DateTime,
        DateSource::DateTimeDigitized,
        DateSource::DateTimeOriginal,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DateSource::Filename => "Filename",
            DateSource::DateTime => "DateTime",
            DateSource::DateTimeDigitized => "DateTimeDigitized",
            DateSource::DateTimeOriginal => "DateTimeOriginal",
        }
    }

    /// Name of the decoded tag holding this date, `None` for the filename heuristic.
    pub fn tag_name(self) -> Option<&'static str> {
        match self {
            DateSource::Filename => None,
            DateSource::DateTime => Some("Image DateTime"),
            DateSource::DateTimeDigitized => Some("EXIF DateTimeDigitized"),
            DateSource::DateTimeOriginal => Some("EXIF DateTimeOriginal"),
        }
    }

    /// Writer key for the EXIF field, `None` for the filename heuristic.
    pub fn writer_key(self) -> Option<&'static str> {
        match self {
            DateSource::Filename => None,
            DateSource::DateTime => Some("Exif.Image.DateTime"),
            DateSource::DateTimeDigitized => Some("Exif.Photo.DateTimeDigitized"),
            DateSource::DateTimeOriginal => Some("Exif.Photo.DateTimeOriginal"),
        }
    }
}

impl fmt::Display for DateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateCandidate {
    pub source: DateSource,
    pub date: Option<NaiveDateTime>,
}

/// The four labelled candidate dates of one file, in `DateSource::ALL` order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateCandidates {
    candidates: Vec<DateCandidate>,
}

impl DateCandidates {
    pub fn new(candidates: Vec<DateCandidate>) -> Self {
        Self { candidates }
    }

    pub fn get(&self, source: DateSource) -> Option<NaiveDateTime> {
        self.candidates
            .iter()
            .find(|c| c.source == source)
            .and_then(|c| c.date)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DateCandidate> {
        self.candidates.iter()
    }

    fn values(&self) -> Vec<Option<NaiveDateTime>> {
        self.candidates.iter().map(|c| c.date).collect()
    }

    pub fn all_equal(&self) -> bool {
        all_equal(&self.values())
    }

    pub fn canonical(&self) -> Option<NaiveDateTime> {
        canonical(&self.values())
    }

    /// Distinct present dates, oldest first.
    pub fn distinct(&self) -> Vec<NaiveDateTime> {
        let mut dates: Vec<NaiveDateTime> = self.iter().filter_map(|c| c.date).collect();
        dates.sort();
        dates.dedup();
        dates
    }
}

/// True when at least one candidate is present and every present candidate is the same.
pub fn all_equal(candidates: &[Option<NaiveDateTime>]) -> bool {
    let mut present = candidates.iter().flatten();
    match present.next() {
        Some(first) => present.all(|d| d == first),
        None => false,
    }
}

pub fn canonical(candidates: &[Option<NaiveDateTime>]) -> Option<NaiveDateTime> {
    if all_equal(candidates) {
        candidates.iter().flatten().next().copied()
    } else {
        None
    }
}

/// Parse a date leniently, retrying with `-` and `_` turned into `T`.
pub fn parse_date(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    parse_iso(text).or_else(|| parse_iso(&text.replace(['-', '_'], "T")))
}

fn parse_iso(text: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(text, format) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Find a `YYYYMMDD?HHMMSS` timestamp (separator `-`, `_` or `T`) in the file's base name.
pub fn extract_filename_date(name: &str) -> Option<NaiveDateTime> {
    let basename = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(name);

    let caps = FILENAME_TIMESTAMP.captures(basename)?;
    parse_date(caps.get(1)?.as_str())
}
