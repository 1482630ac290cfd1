//! Owns the aggregated entries of one tag query and derives the displayed
//! view from the current sort and relevance threshold.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use zakki_common::{CandidateSection, Relevance, SortMethod, Tag, TagAnnotation};

use crate::sanitizer::{self, Fragment, SanitizeContext};
use crate::signature::{dedup_sections, Signature};

/// One unique, sanitized section.
#[derive(Debug, Clone, Serialize)]
pub struct AggregatedEntry {
    pub date: NaiveDate,
    pub article_id: String,
    pub relevance: Relevance,
    pub signature: Signature,
    pub fragment: Fragment,
    #[serde(skip)]
    annotation: TagAnnotation,
    /// Untrusted source; kept only so the fragment can be rebuilt.
    #[serde(skip)]
    markup: String,
}

impl AggregatedEntry {
    fn sanitized(section: CandidateSection, signature: Signature, tag: &Tag, sort: SortMethod) -> Self {
        let fragment = sanitizer::sanitize(
            &section.markup,
            &SanitizeContext {
                query_tag: tag,
                sort,
                relevance: section.relevance,
                annotation: &section.annotation,
            },
        );
        Self {
            date: section.date,
            article_id: section.article_id,
            relevance: section.relevance,
            signature,
            fragment,
            annotation: section.annotation,
            markup: section.markup,
        }
    }

    fn resanitize(&mut self, tag: &Tag, sort: SortMethod) {
        self.fragment = sanitizer::sanitize(
            &self.markup,
            &SanitizeContext {
                query_tag: tag,
                sort,
                relevance: self.relevance,
                annotation: &self.annotation,
            },
        );
    }
}

#[derive(Debug)]
struct AggregationState {
    sort: SortMethod,
    min_relevance: Relevance,
    entries: Vec<AggregatedEntry>,
    /// Indices into `entries`, filtered then sorted.
    view: Vec<usize>,
}

pub struct AggregationController {
    tag: Tag,
    state: AggregationState,
}

/// Entries of one date, in view order.
#[derive(Debug, Serialize)]
pub struct DateGroup<'a> {
    pub date: NaiveDate,
    pub entries: Vec<&'a AggregatedEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewStats {
    pub total: usize,
    pub shown: usize,
    pub newest: Option<NaiveDate>,
    pub oldest: Option<NaiveDate>,
    pub average_relevance: Option<u8>,
}

#[derive(Debug, Serialize)]
pub struct TagView<'a> {
    pub tag: &'a Tag,
    pub sort: SortMethod,
    pub min_relevance: Relevance,
    pub groups: Vec<DateGroup<'a>>,
    pub stats: ViewStats,
}

impl TagView<'_> {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl AggregationController {
    /// Deduplicate and sanitize the scan result. `sections` must be in scan
    /// order; the first instance of repeated content wins.
    pub fn build(tag: Tag, sections: Vec<CandidateSection>) -> Self {
        let scanned = sections.len();
        let sort = SortMethod::default();
        let entries: Vec<AggregatedEntry> = dedup_sections(sections)
            .into_iter()
            .map(|(section, signature)| AggregatedEntry::sanitized(section, signature, &tag, sort))
            .collect();

        info!(
            tag = tag.as_str(),
            scanned,
            unique = entries.len(),
            "Aggregated tag entries"
        );

        let mut controller = Self {
            tag,
            state: AggregationState {
                sort,
                min_relevance: Relevance::MIN,
                entries,
                view: Vec::new(),
            },
        };
        controller.recompute();
        controller
    }

    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    pub fn sort_method(&self) -> SortMethod {
        self.state.sort
    }

    pub fn min_relevance(&self) -> Relevance {
        self.state.min_relevance
    }

    /// The full unique set, in scan order.
    pub fn entries(&self) -> &[AggregatedEntry] {
        &self.state.entries
    }

    /// The filtered and sorted entries.
    pub fn filtered(&self) -> impl Iterator<Item = &AggregatedEntry> {
        self.state.view.iter().map(|&i| &self.state.entries[i])
    }

    pub fn set_sort_method(&mut self, method: SortMethod) {
        self.apply_sort(method);
        self.recompute();
    }

    /// Values outside `0..=100` saturate at the nearest bound.
    pub fn set_min_relevance(&mut self, n: i64) {
        self.state.min_relevance = Relevance::saturating(n);
        self.recompute();
    }

    /// Back to newest-first with no threshold.
    pub fn reset(&mut self) {
        self.apply_sort(SortMethod::default());
        self.state.min_relevance = Relevance::MIN;
        self.recompute();
    }

    pub fn view(&self) -> TagView<'_> {
        let mut groups: Vec<DateGroup<'_>> = Vec::new();
        for entry in self.filtered() {
            match groups.iter_mut().find(|g| g.date == entry.date) {
                Some(group) => group.entries.push(entry),
                None => groups.push(DateGroup {
                    date: entry.date,
                    entries: vec![entry],
                }),
            }
        }

        TagView {
            tag: &self.tag,
            sort: self.state.sort,
            min_relevance: self.state.min_relevance,
            groups,
            stats: self.stats(),
        }
    }

    pub fn stats(&self) -> ViewStats {
        let shown: Vec<&AggregatedEntry> = self.filtered().collect();
        let average_relevance = (!shown.is_empty()).then(|| {
            let sum: usize = shown.iter().map(|e| e.relevance.value() as usize).sum();
            ((sum as f64) / (shown.len() as f64)).round() as u8
        });
        ViewStats {
            total: self.state.entries.len(),
            shown: shown.len(),
            newest: shown.iter().map(|e| e.date).max(),
            oldest: shown.iter().map(|e| e.date).min(),
            average_relevance,
        }
    }

    /// Switch sort method; fragments are rebuilt only when the timeline list
    /// direction changes with it.
    fn apply_sort(&mut self, method: SortMethod) {
        let before = sanitizer::reverses_timeline_lists(&self.tag, self.state.sort);
        let after = sanitizer::reverses_timeline_lists(&self.tag, method);
        self.state.sort = method;
        if before != after {
            debug!(tag = self.tag.as_str(), sort = %method, "Rebuilding fragments for list direction");
            for entry in &mut self.state.entries {
                entry.resanitize(&self.tag, method);
            }
        }
    }

    /// Filter then stable-sort the full set.
    fn recompute(&mut self) {
        let min = self.state.min_relevance;
        let entries = &self.state.entries;
        let mut view: Vec<usize> = (0..entries.len())
            .filter(|&i| entries[i].relevance >= min)
            .collect();
        let sort = self.state.sort;
        view.sort_by(|&a, &b| compare(sort, &entries[a], &entries[b]));
        self.state.view = view;
    }
}

/// Relevance sorts fall back to date in the same direction.
fn compare(sort: SortMethod, a: &AggregatedEntry, b: &AggregatedEntry) -> Ordering {
    match sort {
        SortMethod::DateDesc => b.date.cmp(&a.date),
        SortMethod::DateAsc => a.date.cmp(&b.date),
        SortMethod::RelevanceDesc => b
            .relevance
            .cmp(&a.relevance)
            .then_with(|| b.date.cmp(&a.date)),
        SortMethod::RelevanceAsc => a
            .relevance
            .cmp(&b.relevance)
            .then_with(|| a.date.cmp(&b.date)),
    }
}
