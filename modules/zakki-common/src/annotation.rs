//! The `data-tags` annotation carried by diary sections.
//!
//! Two grammars are accepted: the compact `music=80,timeline,anime=60` form
//! and, when the value starts with `{`, a JSON object such as
//! `{"music": 80, "timeline": "100"}`. Both funnel through the same
//! relevance policy: missing or non-numeric scores are 100, out-of-range
//! scores are 100.

use serde::Serialize;
use serde_json::Value;

use crate::types::Relevance;

/// Tag name → relevance, in the order tags first appear in the attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TagAnnotation {
    entries: Vec<(String, Relevance)>,
}

impl TagAnnotation {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::default();
        }
        if trimmed.starts_with('{') {
            return Self::parse_json(trimmed);
        }
        Self::parse_compact(trimmed)
    }

    fn parse_compact(raw: &str) -> Self {
        let mut annotation = Self::default();
        for item in raw.split(',') {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }
            let (name, relevance) = match item.split_once('=') {
                Some((name, value)) => (name.trim(), Relevance::parse_lenient(value)),
                None => (item, Relevance::MAX),
            };
            annotation.insert(name, relevance);
        }
        annotation
    }

    /// Malformed JSON yields an empty annotation rather than an error.
    fn parse_json(raw: &str) -> Self {
        let Ok(Value::Object(map)) = serde_json::from_str::<Value>(raw) else {
            return Self::default();
        };
        let mut annotation = Self::default();
        for (name, value) in map {
            let relevance = match value {
                Value::Number(n) => match n.as_i64() {
                    Some(i) => Relevance::clamped(i),
                    None => n
                        .as_f64()
                        .map(|f| Relevance::clamped(f.trunc() as i64))
                        .unwrap_or(Relevance::MAX),
                },
                Value::String(s) => Relevance::parse_lenient(&s),
                _ => Relevance::MAX,
            };
            annotation.insert(name.trim(), relevance);
        }
        annotation
    }

    /// Later duplicates overwrite the score but keep the first position.
    fn insert(&mut self, name: &str, relevance: Relevance) {
        if name.is_empty() {
            return;
        }
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = relevance,
            None => self.entries.push((name.to_string(), relevance)),
        }
    }

    /// Add a tag collected from a legacy hashtag. Repeats keep the highest
    /// relevance seen.
    pub fn merge_max(&mut self, name: &str, relevance: Relevance) {
        match self.get(name) {
            Some(existing) if existing >= relevance => {}
            _ => self.insert(name, relevance),
        }
    }

    /// Exact-match lookup. No prefix or case folding.
    pub fn get(&self, tag: &str) -> Option<Relevance> {
        self.entries
            .iter()
            .find(|(n, _)| n == tag)
            .map(|(_, r)| *r)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.get(tag).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Relevance)> {
        self.entries.iter().map(|(n, r)| (n.as_str(), *r))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
