//! Rebuilds untrusted section markup as a [`Fragment`].
//!
//! The fetched markup is parsed once and walked; each node is either copied
//! into a new [`SafeElement`] through the allowlists in [`policy`], or
//! degraded to its text. The output is never produced by editing or
//! re-parsing the input string.

pub mod embeds;
pub mod policy;
pub mod tree;

use scraper::{ElementRef, Html, Node};

use zakki_common::paths::tag_in_link;
use zakki_common::{Relevance, SortMethod, Tag, TagAnnotation};

pub use tree::{AttrValue, ElementKind, Fragment, SafeAttr, SafeElement, SafeNode};

/// Query tag whose entries are chronological logs.
pub const TIMELINE_TAG: &str = "timeline";
/// Marker class of the lists that follow the date ordering.
pub const TIMELINE_LIST_CLASS: &str = "timeline_md";
/// Elements nested deeper than this are flattened to their text.
pub const MAX_DEPTH: usize = 128;

/// What the sanitizer needs to know about the entry being rewritten.
#[derive(Debug, Clone, Copy)]
pub struct SanitizeContext<'a> {
    pub query_tag: &'a Tag,
    pub sort: SortMethod,
    /// Relevance of the entry for the query tag.
    pub relevance: Relevance,
    /// The section's own annotation.
    pub annotation: &'a TagAnnotation,
}

impl SanitizeContext<'_> {
    pub fn reverses_timeline_lists(&self) -> bool {
        reverses_timeline_lists(self.query_tag, self.sort)
    }
}

pub fn reverses_timeline_lists(tag: &Tag, sort: SortMethod) -> bool {
    tag.as_str() == TIMELINE_TAG && sort == SortMethod::DateDesc
}

/// `#music` at full relevance, `#music:70` otherwise.
pub fn tag_label(tag: &str, relevance: Relevance) -> String {
    if relevance.is_max() {
        format!("#{tag}")
    } else {
        format!("#{tag}:{relevance}")
    }
}

pub fn sanitize(markup: &str, ctx: &SanitizeContext<'_>) -> Fragment {
    let doc = Html::parse_fragment(markup);
    Fragment::new(visit_children(doc.root_element(), ctx, 0))
}

fn visit_children(parent: ElementRef<'_>, ctx: &SanitizeContext<'_>, depth: usize) -> Vec<SafeNode> {
    let mut out = Vec::new();
    for child in parent.children() {
        match child.value() {
            Node::Text(text) => out.push(SafeNode::Text(text.text.to_string())),
            Node::Element(_) => {
                if let Some(el) = ElementRef::wrap(child) {
                    out.push(visit_element(el, ctx, depth));
                }
            }
            // comments, doctypes and processing instructions
            _ => {}
        }
    }
    out
}

fn visit_element(el: ElementRef<'_>, ctx: &SanitizeContext<'_>, depth: usize) -> SafeNode {
    if depth >= MAX_DEPTH {
        return degrade(el);
    }
    let Some(kind) = ElementKind::from_allowlisted(el.value().name()) else {
        return degrade(el);
    };

    match kind {
        ElementKind::Anchor => anchor(el, ctx, depth + 1),
        ElementKind::Iframe => iframe(el),
        ElementKind::UnorderedList => unordered_list(el, ctx, depth + 1),
        k if k.is_void() => SafeElement {
            kind: k,
            attrs: copy_attrs(k, el),
            children: Vec::new(),
        }
        .into(),
        k => container(k, el, ctx, depth + 1),
    }
}

/// Anything not on the allowlist becomes the text it contains.
fn degrade(el: ElementRef<'_>) -> SafeNode {
    SafeNode::Text(el.text().collect())
}

fn container(kind: ElementKind, el: ElementRef<'_>, ctx: &SanitizeContext<'_>, depth: usize) -> SafeNode {
    SafeElement {
        kind,
        attrs: copy_attrs(kind, el),
        children: visit_children(el, ctx, depth),
    }
    .into()
}

/// Tag cross-links get their label regenerated from the relevance we hold,
/// whatever the source text claimed.
fn anchor(el: ElementRef<'_>, ctx: &SanitizeContext<'_>, depth: usize) -> SafeNode {
    let attrs = copy_attrs(ElementKind::Anchor, el);
    let kept_href = attrs
        .iter()
        .find(|a| a.name == "href")
        .map(|a| a.value.as_str());

    let linked = kept_href
        .and_then(tag_in_link)
        .and_then(|name| Tag::parse(name).ok());

    match linked {
        Some(tag) => {
            let relevance = ctx.annotation.get(tag.as_str()).unwrap_or(ctx.relevance);
            SafeElement {
                kind: ElementKind::Anchor,
                attrs,
                children: vec![SafeNode::Text(tag_label(tag.as_str(), relevance))],
            }
            .into()
        }
        None => SafeElement {
            kind: ElementKind::Anchor,
            attrs,
            children: visit_children(el, ctx, depth),
        }
        .into(),
    }
}

/// Fallback content inside an iframe is never rendered, so it is dropped.
fn iframe(el: ElementRef<'_>) -> SafeNode {
    SafeElement {
        kind: ElementKind::Iframe,
        attrs: copy_attrs(ElementKind::Iframe, el),
        children: Vec::new(),
    }
    .into()
}

fn unordered_list(el: ElementRef<'_>, ctx: &SanitizeContext<'_>, depth: usize) -> SafeNode {
    let mut children = visit_children(el, ctx, depth);
    let marked = el.value().classes().any(|c| c == TIMELINE_LIST_CLASS);

    if marked && ctx.reverses_timeline_lists() {
        // swap items only; whitespace text nodes keep their slots
        let slots: Vec<usize> = children
            .iter()
            .enumerate()
            .filter(|(_, n)| n.is_kind(ElementKind::ListItem))
            .map(|(i, _)| i)
            .collect();
        for k in 0..slots.len() / 2 {
            children.swap(slots[k], slots[slots.len() - 1 - k]);
        }
    }

    SafeElement {
        kind: ElementKind::UnorderedList,
        attrs: copy_attrs(ElementKind::UnorderedList, el),
        children,
    }
    .into()
}

/// Copy allowlisted attributes in allowlist order, applying the URL policy
/// to `href`/`src` and the value grammar to verbatim attributes.
fn copy_attrs(kind: ElementKind, el: ElementRef<'_>) -> Vec<SafeAttr> {
    let mut attrs = Vec::new();
    for &name in policy::allowed_attrs(kind) {
        let Some(value) = el.value().attr(name) else {
            continue;
        };
        let value = match name {
            "href" if policy::href_allowed(value) => AttrValue::Escaped(value.to_string()),
            "src" if policy::src_allowed(value) => AttrValue::Escaped(value.to_string()),
            "href" | "src" => continue,
            _ if policy::is_verbatim(name) => {
                if !policy::verbatim_value_ok(name, value) {
                    continue;
                }
                AttrValue::Verbatim(value.to_string())
            }
            _ => AttrValue::Escaped(value.to_string()),
        };
        attrs.push(SafeAttr { name, value });
    }
    attrs
}
