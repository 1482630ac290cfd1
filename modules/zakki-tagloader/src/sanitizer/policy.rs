//! Attribute and URL rules for fetched markup.

use std::sync::LazyLock;

use regex::Regex;

use zakki_common::paths::is_internal_url;

use super::embeds::trusted_provider;
use super::tree::ElementKind;

const DENIED_SCHEMES: &[&str] = &["javascript:", "data:", "vbscript:", "file:", "ftp:"];

/// Internal absolute path, http(s), mailto, or an in-page anchor.
static HREF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:/(?:[^/\\]|$)|https?://|mailto:|#)").expect("valid regex")
});

static DIMENSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{1,4}%?$").expect("valid regex"));

const REFERRER_POLICIES: &[&str] = &[
    "no-referrer",
    "no-referrer-when-downgrade",
    "origin",
    "origin-when-cross-origin",
    "same-origin",
    "strict-origin",
    "strict-origin-when-cross-origin",
    "unsafe-url",
];

/// Attributes that may be copied for each kind, in output order.
pub fn allowed_attrs(kind: ElementKind) -> &'static [&'static str] {
    match kind {
        ElementKind::Anchor => &["href", "title", "class"],
        ElementKind::Iframe => &[
            "src",
            "width",
            "height",
            "frameborder",
            "allow",
            "allowfullscreen",
            "referrerpolicy",
            "title",
        ],
        ElementKind::Heading(_) | ElementKind::Section => &["id", "class"],
        ElementKind::LineBreak | ElementKind::Rule => &[],
        _ => &["class"],
    }
}

/// Attributes written without escaping. Their values must pass
/// [`verbatim_value_ok`] first.
pub fn is_verbatim(name: &str) -> bool {
    matches!(
        name,
        "allow" | "referrerpolicy" | "title" | "width" | "height" | "frameborder" | "allowfullscreen"
    )
}

pub fn verbatim_value_ok(name: &str, value: &str) -> bool {
    match name {
        "width" | "height" => DIMENSION_RE.is_match(value),
        "frameborder" => matches!(value, "0" | "1"),
        "allowfullscreen" => value.is_empty() || value.eq_ignore_ascii_case("allowfullscreen") || value == "true",
        "referrerpolicy" => REFERRER_POLICIES.contains(&value),
        "allow" | "title" => !value.contains(['"', '<', '>', '&']),
        _ => false,
    }
}

/// True when the URL starts with a denied scheme, ignoring case and any
/// whitespace or control characters a browser would skip.
pub fn has_denied_scheme(url: &str) -> bool {
    let normalized: String = url
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .take(16)
        .flat_map(char::to_lowercase)
        .collect();
    DENIED_SCHEMES.iter().any(|s| normalized.starts_with(s))
}

pub fn href_allowed(href: &str) -> bool {
    !has_denied_scheme(href) && HREF_RE.is_match(href)
}

/// An iframe source is allowed when it is an archive path or the player
/// URL of a trusted provider.
pub fn src_allowed(src: &str) -> bool {
    !has_denied_scheme(src) && (is_internal_url(src) || trusted_provider(src).is_some())
}
