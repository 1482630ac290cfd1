//! Content identity for sections.
//!
//! The same section is often served by several day pages (a month index
//! repeats the latest entries, for example). Two sections with equal
//! [`Signature`]s are the same content; the first one seen is kept.

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{Html, Selector};
use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};
use tracing::debug;

use zakki_common::CandidateSection;

const MAX_HEADINGS: usize = 3;
const MAX_LINKS: usize = 3;
const TEXT_SAMPLE_CHARS: usize = 50;

static HEADING_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h2, h3, h4, h5, h6").expect("valid selector"));
static LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").expect("valid selector"));

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    /// `(level, text)` of the leading headings.
    pub headings: Vec<(u8, String)>,
    /// `href`, or the link text when there is none, of the leading links.
    pub links: Vec<String>,
    /// Whitespace-collapsed text, truncated.
    pub text_sample: String,
    /// Length of the raw markup, in characters.
    pub length: usize,
}

impl Signature {
    pub fn of(markup: &str) -> Self {
        let fragment = Html::parse_fragment(markup);

        let headings: Vec<(u8, String)> = fragment
            .select(&HEADING_SEL)
            .take(MAX_HEADINGS)
            .map(|h| {
                let level = h.value().name()[1..].parse().unwrap_or(0);
                (level, collapse_whitespace(&h.text().collect::<String>()))
            })
            .collect();

        let links: Vec<String> = fragment
            .select(&LINK_SEL)
            .take(MAX_LINKS)
            .map(|a| match a.value().attr("href") {
                Some(href) if !href.is_empty() => href.to_string(),
                _ => collapse_whitespace(&a.text().collect::<String>()),
            })
            .collect();

        let text = collapse_whitespace(&fragment.root_element().text().collect::<String>());
        let text_sample = text.chars().take(TEXT_SAMPLE_CHARS).collect();

        Self {
            headings,
            links,
            text_sample,
            length: markup.chars().count(),
        }
    }

    /// Hex SHA-256 over the signature fields.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for (level, text) in &self.headings {
            hasher.update(format!("h{level}:{text}|"));
        }
        hasher.update(b"\x1f");
        for link in &self.links {
            hasher.update(link.as_bytes());
            hasher.update(b"|");
        }
        hasher.update(b"\x1f");
        hasher.update(self.text_sample.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(self.length.to_string());
        hex::encode(hasher.finalize())
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.digest())
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drop sections whose signature was already seen, keeping first-seen order.
pub fn dedup_sections(sections: Vec<CandidateSection>) -> Vec<(CandidateSection, Signature)> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(sections.len());

    for section in sections {
        let signature = Signature::of(&section.markup);
        if seen.insert(signature.clone()) {
            out.push((section, signature));
        } else {
            debug!(
                date = %section.date,
                article = section.article_id.as_str(),
                "Skipped duplicate section"
            );
        }
    }
    out
}
