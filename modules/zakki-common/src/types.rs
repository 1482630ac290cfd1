use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::annotation::TagAnnotation;
use crate::error::{Result, ZakkiError};

/// Longest accepted tag name, in characters.
pub const MAX_TAG_LEN: usize = 50;

/// Letters of any script, decimal digits, underscore and hyphen.
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{L}\p{Nd}_-]+$").expect("valid regex"));

// ---------------------------------------------------------------------------
// Tag
// ---------------------------------------------------------------------------

/// A tag name that passed the grammar check. Only constructible through
/// [`Tag::parse`], so holding one means no fetch can be driven by a bad name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Tag(String);

impl Tag {
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() || raw.chars().count() > MAX_TAG_LEN || !TAG_RE.is_match(raw) {
            return Err(ZakkiError::InvalidTag(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Tag {
    type Err = ZakkiError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl AsRef<str> for Tag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Relevance
// ---------------------------------------------------------------------------

/// How strongly a section pertains to a tag, always within `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Relevance(u8);

impl Relevance {
    pub const MIN: Relevance = Relevance(0);
    pub const MAX: Relevance = Relevance(100);

    /// Annotation policy: anything outside `0..=100` becomes 100.
    pub fn clamped(value: i64) -> Self {
        if (0..=100).contains(&value) {
            Self(value as u8)
        } else {
            Self::MAX
        }
    }

    /// Parse an annotation value. Non-numeric input becomes 100.
    pub fn parse_lenient(raw: &str) -> Self {
        raw.trim()
            .parse::<i64>()
            .map(Self::clamped)
            .unwrap_or(Self::MAX)
    }

    /// Threshold policy: saturates at the bounds instead of resetting.
    pub fn saturating(value: i64) -> Self {
        Self(value.clamp(0, 100) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_max(self) -> bool {
        self == Self::MAX
    }
}

impl Default for Relevance {
    fn default() -> Self {
        Self::MAX
    }
}

impl fmt::Display for Relevance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// MonthKey
// ---------------------------------------------------------------------------

/// One (year, month) slot of the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// Every month of every year in `start_year..=end_year`, oldest first.
    pub fn range(start_year: i32, end_year: i32) -> Vec<MonthKey> {
        (start_year..=end_year)
            .flat_map(|year| (1..=12).map(move |month| MonthKey { year, month }))
            .collect()
    }

    /// The calendar date for `day` within this month, if it exists.
    pub fn date(self, day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, day)
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

// ---------------------------------------------------------------------------
// CandidateSection
// ---------------------------------------------------------------------------

/// An untrusted section lifted out of a day page, before dedup and sanitizing.
#[derive(Debug, Clone)]
pub struct CandidateSection {
    pub date: NaiveDate,
    /// Enclosing `<article id>`, or `"unknown"`. Diagnostics only.
    pub article_id: String,
    /// Relevance of the queried tag, from this section's own annotation.
    pub relevance: Relevance,
    /// Every tag the section carries.
    pub annotation: TagAnnotation,
    /// Serialized outer markup of the section. Untrusted.
    pub markup: String,
}

// ---------------------------------------------------------------------------
// SortMethod
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortMethod {
    #[default]
    DateDesc,
    DateAsc,
    RelevanceDesc,
    RelevanceAsc,
}

impl SortMethod {
    pub const ALL: [SortMethod; 4] = [
        SortMethod::DateDesc,
        SortMethod::DateAsc,
        SortMethod::RelevanceDesc,
        SortMethod::RelevanceAsc,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortMethod::DateDesc => "date-desc",
            SortMethod::DateAsc => "date-asc",
            SortMethod::RelevanceDesc => "relevance-desc",
            SortMethod::RelevanceAsc => "relevance-asc",
        }
    }

    /// Button caption in the control panel.
    pub fn label(self) -> &'static str {
        match self {
            SortMethod::DateDesc => "Newest first",
            SortMethod::DateAsc => "Oldest first",
            SortMethod::RelevanceDesc => "Most relevant",
            SortMethod::RelevanceAsc => "Least relevant",
        }
    }
}

impl fmt::Display for SortMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortMethod {
    type Err = ZakkiError;

    fn from_str(s: &str) -> Result<Self> {
        SortMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| ZakkiError::Config(format!("unknown sort method: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_accepts_latin_digits_and_japanese() {
        assert!(Tag::parse("music").is_ok());
        assert!(Tag::parse("anime_2025").is_ok());
        assert!(Tag::parse("day-log").is_ok());
        assert!(Tag::parse("音楽").is_ok());
        assert!(Tag::parse("アニメーション").is_ok());
    }

    #[test]
    fn tag_rejects_injection_and_punctuation() {
        assert!(Tag::parse("\"; DROP").is_err());
        assert!(Tag::parse("music tag").is_err());
        assert!(Tag::parse("../etc").is_err());
        assert!(Tag::parse("a/b").is_err());
        assert!(Tag::parse("<script>").is_err());
        assert!(Tag::parse("").is_err());
    }

    #[test]
    fn tag_length_is_counted_in_characters() {
        assert!(Tag::parse(&"a".repeat(MAX_TAG_LEN)).is_ok());
        assert!(Tag::parse(&"a".repeat(MAX_TAG_LEN + 1)).is_err());
        assert!(Tag::parse(&"音".repeat(MAX_TAG_LEN)).is_ok());
    }

    #[test]
    fn relevance_out_of_range_becomes_max() {
        assert_eq!(Relevance::clamped(70).value(), 70);
        assert_eq!(Relevance::clamped(0).value(), 0);
        assert_eq!(Relevance::clamped(101), Relevance::MAX);
        assert_eq!(Relevance::clamped(-5), Relevance::MAX);
    }

    #[test]
    fn relevance_non_numeric_becomes_max() {
        assert_eq!(Relevance::parse_lenient("high"), Relevance::MAX);
        assert_eq!(Relevance::parse_lenient(" 40 "), Relevance::clamped(40));
        assert_eq!(Relevance::parse_lenient(""), Relevance::MAX);
    }

    #[test]
    fn relevance_saturating_keeps_bounds() {
        assert_eq!(Relevance::saturating(-3), Relevance::MIN);
        assert_eq!(Relevance::saturating(250), Relevance::MAX);
        assert_eq!(Relevance::saturating(30).value(), 30);
    }

    #[test]
    fn month_range_covers_every_month() {
        let months = MonthKey::range(2024, 2025);
        assert_eq!(months.len(), 24);
        assert_eq!(months[0].to_string(), "2024-01");
        assert_eq!(months[23].to_string(), "2025-12");
    }

    #[test]
    fn month_date_rejects_impossible_days() {
        let feb = MonthKey::new(2025, 2).unwrap();
        assert!(feb.date(28).is_some());
        assert!(feb.date(30).is_none());
        assert!(MonthKey::new(2025, 13).is_none());
    }

    #[test]
    fn sort_method_round_trips_through_str() {
        for method in SortMethod::ALL {
            assert_eq!(method.as_str().parse::<SortMethod>().unwrap(), method);
        }
        assert!("newest".parse::<SortMethod>().is_err());
        assert_eq!(SortMethod::default(), SortMethod::DateDesc);
    }
}
