//! The output tree. Everything the crate emits is built from these nodes,
//! so markup only ever comes out of [`Fragment::to_html`].

use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Heading(u8),
    Paragraph,
    Anchor,
    Span,
    Div,
    UnorderedList,
    OrderedList,
    ListItem,
    LineBreak,
    Rule,
    Bold,
    Strong,
    Italic,
    Emphasis,
    Iframe,
    Section,
    Ruby,
    RubyText,
    // Emitted by the renderer only; never accepted from fetched markup.
    Article,
    Button,
    Input,
    Label,
}

impl ElementKind {
    /// Map an element name from fetched markup to a kind, if it may survive.
    pub fn from_allowlisted(name: &str) -> Option<Self> {
        let kind = match name {
            "h1" => Self::Heading(1),
            "h2" => Self::Heading(2),
            "h3" => Self::Heading(3),
            "h4" => Self::Heading(4),
            "h5" => Self::Heading(5),
            "h6" => Self::Heading(6),
            "p" => Self::Paragraph,
            "a" => Self::Anchor,
            "span" => Self::Span,
            "div" => Self::Div,
            "ul" => Self::UnorderedList,
            "ol" => Self::OrderedList,
            "li" => Self::ListItem,
            "br" => Self::LineBreak,
            "hr" => Self::Rule,
            "b" => Self::Bold,
            "strong" => Self::Strong,
            "i" => Self::Italic,
            "em" => Self::Emphasis,
            "iframe" => Self::Iframe,
            "section" => Self::Section,
            "ruby" => Self::Ruby,
            "rt" => Self::RubyText,
            _ => return None,
        };
        Some(kind)
    }

    pub fn tag_name(self) -> &'static str {
        match self {
            Self::Heading(1) => "h1",
            Self::Heading(2) => "h2",
            Self::Heading(3) => "h3",
            Self::Heading(4) => "h4",
            Self::Heading(5) => "h5",
            Self::Heading(_) => "h6",
            Self::Paragraph => "p",
            Self::Anchor => "a",
            Self::Span => "span",
            Self::Div => "div",
            Self::UnorderedList => "ul",
            Self::OrderedList => "ol",
            Self::ListItem => "li",
            Self::LineBreak => "br",
            Self::Rule => "hr",
            Self::Bold => "b",
            Self::Strong => "strong",
            Self::Italic => "i",
            Self::Emphasis => "em",
            Self::Iframe => "iframe",
            Self::Section => "section",
            Self::Ruby => "ruby",
            Self::RubyText => "rt",
            Self::Article => "article",
            Self::Button => "button",
            Self::Input => "input",
            Self::Label => "label",
        }
    }

    pub fn is_void(self) -> bool {
        matches!(self, Self::LineBreak | Self::Rule | Self::Input)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    /// Arbitrary text, escaped on output.
    Escaped(String),
    /// Checked against a closed grammar before construction, written as is.
    Verbatim(String),
}

impl AttrValue {
    pub fn as_str(&self) -> &str {
        match self {
            AttrValue::Escaped(v) | AttrValue::Verbatim(v) => v,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeAttr {
    pub name: &'static str,
    pub value: AttrValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeElement {
    pub kind: ElementKind,
    pub attrs: Vec<SafeAttr>,
    pub children: Vec<SafeNode>,
}

impl SafeElement {
    pub fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.attrs.push(SafeAttr {
            name,
            value: AttrValue::Escaped(value.into()),
        });
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(SafeNode::Text(text.into()));
        self
    }

    pub fn child(mut self, child: impl Into<SafeNode>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = SafeNode>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.get_attr("class")
            .is_some_and(|v| v.split_whitespace().any(|c| c == class))
    }

    fn write_html(&self, out: &mut String) {
        let tag = self.kind.tag_name();
        out.push('<');
        out.push_str(tag);
        for attr in &self.attrs {
            out.push(' ');
            out.push_str(attr.name);
            out.push_str("=\"");
            match &attr.value {
                AttrValue::Escaped(v) => escape_into(v, out),
                AttrValue::Verbatim(v) => out.push_str(v),
            }
            out.push('"');
        }
        out.push('>');
        if self.kind.is_void() {
            return;
        }
        for child in &self.children {
            child.write_html(out);
        }
        out.push_str("</");
        out.push_str(tag);
        out.push('>');
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SafeNode {
    Element(SafeElement),
    Text(String),
}

impl SafeNode {
    pub fn is_kind(&self, kind: ElementKind) -> bool {
        matches!(self, SafeNode::Element(el) if el.kind == kind)
    }

    fn write_html(&self, out: &mut String) {
        match self {
            SafeNode::Element(el) => el.write_html(out),
            SafeNode::Text(t) => escape_into(t, out),
        }
    }

    fn write_text(&self, out: &mut String) {
        match self {
            SafeNode::Element(el) => el.children.iter().for_each(|c| c.write_text(out)),
            SafeNode::Text(t) => out.push_str(t),
        }
    }
}

impl From<SafeElement> for SafeNode {
    fn from(el: SafeElement) -> Self {
        SafeNode::Element(el)
    }
}

/// A sequence of sibling nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    pub nodes: Vec<SafeNode>,
}

impl Fragment {
    pub fn new(nodes: Vec<SafeNode>) -> Self {
        Self { nodes }
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            node.write_html(&mut out);
        }
        out
    }

    pub fn text(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            node.write_text(&mut out);
        }
        out
    }

    /// Every element in the fragment, depth first.
    pub fn elements(&self) -> Vec<&SafeElement> {
        fn walk<'a>(nodes: &'a [SafeNode], out: &mut Vec<&'a SafeElement>) {
            for node in nodes {
                if let SafeNode::Element(el) = node {
                    out.push(el);
                    walk(&el.children, out);
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.nodes, &mut out);
        out
    }
}

impl Serialize for Fragment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_html())
    }
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    escape_into(s, &mut out);
    out
}

fn escape_into(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_escaping() {
        let frag = Fragment::new(vec![SafeElement::new(ElementKind::Paragraph)
            .attr("class", "a\"b")
            .text("1 < 2 & 3")
            .child(SafeElement::new(ElementKind::LineBreak))
            .into()]);
        assert_eq!(
            frag.to_html(),
            r#"<p class="a&quot;b">1 &lt; 2 &amp; 3<br></p>"#
        );
        assert_eq!(frag.text(), "1 < 2 & 3");
    }

    #[test]
    fn allowlist_excludes_renderer_kinds() {
        assert_eq!(ElementKind::from_allowlisted("h3"), Some(ElementKind::Heading(3)));
        assert!(ElementKind::from_allowlisted("button").is_none());
        assert!(ElementKind::from_allowlisted("input").is_none());
        assert!(ElementKind::from_allowlisted("script").is_none());
        assert!(ElementKind::from_allowlisted("img").is_none());
    }

    #[test]
    fn class_lookup_splits_tokens() {
        let el = SafeElement::new(ElementKind::UnorderedList).attr("class", "x timeline_md");
        assert!(el.has_class("timeline_md"));
        assert!(!el.has_class("timeline"));
    }
}
