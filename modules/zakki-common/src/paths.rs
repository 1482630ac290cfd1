//! Site-relative paths of the diary archive and the internal-URL allowlist.
//!
//! Every path the tag loader requests is built here, and every path is
//! checked against [`is_internal_url`] again before it goes on the wire.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

use crate::error::{Result, ZakkiError};
use crate::types::{MonthKey, Tag};

/// `/zakki/{yyyy}/{mm}/` followed by a plain relative file path.
static INTERNAL_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/zakki/\d{4}/\d{2}/[A-Za-z0-9_\-][A-Za-z0-9_\-./]*$").expect("valid regex")
});

/// Tag-page link, with or without the legacy `/txt` prefix.
static TAG_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/zakki/tag/([^/?#]+)\.html").expect("valid regex"));

pub fn day_page_path(date: NaiveDate) -> String {
    format!(
        "/zakki/{:04}/{:02}/days/{}.html",
        date.year(),
        date.month(),
        date.format("%Y-%m-%d")
    )
}

pub fn manifest_path(month: MonthKey) -> String {
    format!(
        "/zakki/{:04}/{:02}/zakki{:02}.js",
        month.year, month.month, month.month
    )
}

pub fn tag_page_path(tag: &Tag) -> String {
    format!("/zakki/tag/{tag}.html")
}

/// True when `path` has the `/zakki/{year}/{month}/...` shape and no
/// dot segments.
pub fn is_internal_url(path: &str) -> bool {
    INTERNAL_URL_RE.is_match(path) && !path.split('/').any(|seg| seg == "." || seg == "..")
}

pub fn ensure_internal(path: &str) -> Result<()> {
    if is_internal_url(path) {
        Ok(())
    } else {
        Err(ZakkiError::InvalidPath(path.to_string()))
    }
}

/// The tag named by a tag-page link, if `href` contains one.
pub fn tag_in_link(href: &str) -> Option<&str> {
    TAG_LINK_RE
        .captures(href)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feb_6() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, 6).unwrap()
    }

    #[test]
    fn builders_produce_internal_paths() {
        let day = day_page_path(feb_6());
        assert_eq!(day, "/zakki/2025/02/days/2025-02-06.html");
        assert!(is_internal_url(&day));

        let manifest = manifest_path(MonthKey::new(2025, 2).unwrap());
        assert_eq!(manifest, "/zakki/2025/02/zakki02.js");
        assert!(is_internal_url(&manifest));
    }

    #[test]
    fn foreign_and_traversal_paths_are_rejected() {
        assert!(!is_internal_url("https://evil.example/zakki/2025/02/x.html"));
        assert!(!is_internal_url("//evil.example/zakki/2025/02/x.html"));
        assert!(!is_internal_url("/zakki/2025/02/../../../etc/passwd"));
        assert!(!is_internal_url("/zakki/2025/02/./days/x.html"));
        assert!(!is_internal_url("/zakki/25/2/days/x.html"));
        assert!(!is_internal_url("/zakki/2025/02/days/x.html?q=1"));
        assert!(!is_internal_url("/other/2025/02/days/x.html"));
        assert!(ensure_internal("javascript:alert(1)").is_err());
    }

    #[test]
    fn internal_images_pass() {
        assert!(is_internal_url("/zakki/2024/12/img/cat_01.png"));
    }

    #[test]
    fn tag_link_segment_is_extracted() {
        assert_eq!(tag_in_link("/zakki/tag/music.html"), Some("music"));
        assert_eq!(tag_in_link("/txt/zakki/tag/timeline.html"), Some("timeline"));
        assert_eq!(tag_in_link("https://example.com/zakki/tag/a.html#x"), Some("a"));
        assert_eq!(tag_in_link("/zakki/2025/02/days/2025-02-06.html"), None);
    }

    #[test]
    fn tag_page_path_uses_tag_name() {
        let tag = Tag::parse("music").unwrap();
        assert_eq!(tag_page_path(&tag), "/zakki/tag/music.html");
        assert_eq!(tag_in_link(&tag_page_path(&tag)), Some("music"));
    }
}
