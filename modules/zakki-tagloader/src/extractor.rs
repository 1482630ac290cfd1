//! Pull the sections that carry a given tag out of a day page.
//!
//! Two annotation forms exist in the archive:
//!
//! * `<section data-tags="music=80,timeline">`, the current form, parsed by
//!   [`TagAnnotation::parse`].
//! * `<span class="hashtag" data-relevance="80"><a href="/zakki/tag/music.html">`
//!   inside a section, on older pages. The hashtag marks the section chosen by
//!   [`best_parent_section`].
//!
//! A section with a `data-tags` attribute is governed by it alone.

use std::sync::LazyLock;

use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use zakki_common::paths::tag_in_link;
use zakki_common::{CandidateSection, Relevance, Tag, TagAnnotation};

pub const TAGS_ATTR: &str = "data-tags";

static SECTION_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("section").expect("valid selector"));
static HASHTAG_LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.hashtag a[href]").expect("valid selector"));
static HEADING_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h2, h3, h4, h5, h6").expect("valid selector"));

pub struct TagSectionExtractor {
    tag: Tag,
}

impl TagSectionExtractor {
    pub fn new(tag: Tag) -> Self {
        Self { tag }
    }

    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    /// Candidate sections for the tag, in document order.
    pub fn extract(&self, html: &str, date: NaiveDate) -> Vec<CandidateSection> {
        let doc = Html::parse_document(html);
        let legacy = self.legacy_matches(&doc);

        let mut out = Vec::new();
        for section in doc.select(&SECTION_SEL) {
            let (annotation, relevance) = match section.value().attr(TAGS_ATTR) {
                Some(raw) => {
                    let annotation = TagAnnotation::parse(raw);
                    match annotation.get(self.tag.as_str()) {
                        Some(relevance) => (annotation, relevance),
                        None => continue,
                    }
                }
                None => match legacy.iter().find(|(s, _)| *s == section) {
                    Some(&(_, relevance)) => (legacy_annotation(section), relevance),
                    None => continue,
                },
            };

            let article_id = enclosing_article_id(section);
            debug!(
                date = %date,
                article = article_id.as_str(),
                tag = self.tag.as_str(),
                relevance = relevance.value(),
                "Matched section"
            );
            out.push(CandidateSection {
                date,
                article_id,
                relevance,
                annotation,
                markup: section.html(),
            });
        }
        out
    }

    /// Sections selected through legacy hashtags for our tag, with the
    /// highest relevance among their hashtags.
    fn legacy_matches<'a>(&self, doc: &'a Html) -> Vec<(ElementRef<'a>, Relevance)> {
        let mut matches: Vec<(ElementRef<'a>, Relevance)> = Vec::new();

        for link in doc.select(&HASHTAG_LINK_SEL) {
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            if tag_in_link(href) != Some(self.tag.as_str()) {
                continue;
            }
            let Some(span) = closest(link, |e| is_hashtag_span(e)) else {
                continue;
            };
            let Some(section) = closest(span, |e| e.value().name() == "section") else {
                continue;
            };
            let best = best_parent_section(section);
            if best.value().attr(TAGS_ATTR).is_some() {
                continue;
            }

            let relevance = span_relevance(span);
            match matches.iter_mut().find(|(s, _)| *s == best) {
                Some((_, r)) => *r = (*r).max(relevance),
                None => matches.push((best, relevance)),
            }
        }
        matches
    }
}

/// Walk from `section` up to its article, moving to any ancestor section
/// whose first heading has a larger level number than the best so far.
pub fn best_parent_section(section: ElementRef<'_>) -> ElementRef<'_> {
    let mut best = section;
    let mut best_level = heading_level(section);

    for ancestor in section.ancestors().filter_map(ElementRef::wrap) {
        match ancestor.value().name() {
            "article" => break,
            "section" => {
                let level = heading_level(ancestor);
                if level > best_level {
                    best = ancestor;
                    best_level = level;
                }
            }
            _ => {}
        }
    }
    best
}

/// Level of the first `h2`–`h6` inside, or 0 when there is none.
fn heading_level(section: ElementRef<'_>) -> u8 {
    section
        .select(&HEADING_SEL)
        .next()
        .and_then(|h| h.value().name().strip_prefix('h'))
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

/// Every hashtag inside a legacy section, so cross-links can be relabelled
/// with their own relevance.
fn legacy_annotation(section: ElementRef<'_>) -> TagAnnotation {
    let mut annotation = TagAnnotation::default();
    for link in section.select(&HASHTAG_LINK_SEL) {
        let Some(name) = link.value().attr("href").and_then(tag_in_link) else {
            continue;
        };
        let relevance = closest(link, |e| is_hashtag_span(e))
            .map(span_relevance)
            .unwrap_or_default();
        annotation.merge_max(name, relevance);
    }
    annotation
}

fn span_relevance(span: ElementRef<'_>) -> Relevance {
    span.value()
        .attr("data-relevance")
        .map(Relevance::parse_lenient)
        .unwrap_or_default()
}

fn is_hashtag_span(el: ElementRef<'_>) -> bool {
    el.value().name() == "span" && el.value().classes().any(|c| c == "hashtag")
}

fn closest<'a>(el: ElementRef<'a>, pred: impl Fn(ElementRef<'a>) -> bool) -> Option<ElementRef<'a>> {
    el.ancestors().filter_map(ElementRef::wrap).find(|e| pred(*e))
}

fn enclosing_article_id(section: ElementRef<'_>) -> String {
    closest(section, |e| e.value().name() == "article")
        .and_then(|a| a.value().attr("id"))
        .filter(|id| !id.is_empty())
        .unwrap_or("unknown")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, 6).unwrap()
    }

    fn extract(tag: &str, html: &str) -> Vec<CandidateSection> {
        TagSectionExtractor::new(Tag::parse(tag).unwrap()).extract(html, date())
    }

    const ANNOTATED: &str = r#"
        <html><body>
        <article id="a1">
          <section data-tags="tech=70,music"><h2>Synths</h2><p>one</p></section>
          <section data-tags="musical=90"><h2>Other</h2></section>
          <section><h2>Untagged</h2></section>
        </article>
        </body></html>"#;

    #[test]
    fn selects_by_exact_tag_with_own_relevance() {
        let music = extract("music", ANNOTATED);
        assert_eq!(music.len(), 1);
        assert_eq!(music[0].relevance, Relevance::MAX);
        assert_eq!(music[0].article_id, "a1");
        assert!(music[0].markup.starts_with("<section"));
        assert!(music[0].markup.contains("Synths"));

        let tech = extract("tech", ANNOTATED);
        assert_eq!(tech[0].relevance.value(), 70);
        assert!(tech[0].annotation.contains("music"));
    }

    #[test]
    fn no_partial_matches() {
        assert!(extract("mus", ANNOTATED).is_empty());
        assert_eq!(extract("musical", ANNOTATED).len(), 1);
    }

    #[test]
    fn json_annotation_is_accepted() {
        let html = r#"<article><section data-tags='{"music": 35}'><p>x</p></section></article>"#;
        let found = extract("music", html);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].relevance.value(), 35);
        assert_eq!(found[0].article_id, "unknown");
    }

    #[test]
    fn legacy_hashtag_picks_best_parent_and_max_relevance() {
        let html = r#"
            <article id="old">
              <section id="outer"><h2>Day</h2>
                <section id="inner"><h3>Topic</h3>
                  <p>text
                    <span class="hashtag" data-relevance="40"><a href="/txt/zakki/tag/music.html">#music</a></span>
                    <span class="hashtag" data-relevance="80"><a href="/zakki/tag/music.html">#music</a></span>
                    <span class="hashtag"><a href="/zakki/tag/anime.html">#anime</a></span>
                  </p>
                </section>
              </section>
            </article>"#;
        let found = extract("music", html);
        assert_eq!(found.len(), 1);
        assert!(found[0].markup.contains(r#"id="inner""#));
        assert!(!found[0].markup.contains(r#"id="outer""#));
        assert_eq!(found[0].relevance.value(), 80);
        assert_eq!(found[0].annotation.get("anime"), Some(Relevance::MAX));
    }

    #[test]
    fn best_parent_moves_to_deeper_heading_level() {
        let html = r#"
            <article>
              <section id="outer"><h4>Minor</h4>
                <section id="inner"><h2>Major</h2>
                  <span class="hashtag"><a href="/zakki/tag/music.html">#music</a></span>
                </section>
              </section>
            </article>"#;
        let found = extract("music", html);
        assert_eq!(found.len(), 1);
        assert!(found[0].markup.contains(r#"id="outer""#));
    }

    #[test]
    fn data_tags_section_ignores_hashtags() {
        let html = r#"
            <article>
              <section data-tags="anime"><h2>x</h2>
                <span class="hashtag"><a href="/zakki/tag/music.html">#music</a></span>
              </section>
            </article>"#;
        assert!(extract("music", html).is_empty());
    }

    #[test]
    fn document_order_is_kept() {
        let html = r#"
            <article id="a">
              <section data-tags="music=10"><p>first</p></section>
              <section><p>second <span class="hashtag"><a href="/zakki/tag/music.html">#music</a></span></p></section>
              <section data-tags="music=30"><p>third</p></section>
            </article>"#;
        let found = extract("music", html);
        let rel: Vec<u8> = found.iter().map(|c| c.relevance.value()).collect();
        assert_eq!(rel, vec![10, 100, 30]);
    }

    #[test]
    fn garbage_document_yields_nothing() {
        assert!(extract("music", "<<<not html").is_empty());
        assert!(extract("music", "").is_empty());
    }
}
