//! Turns the controller's current view into output.
//!
//! The control panel and group wrappers are built here as trusted nodes;
//! section content is only ever the already-sanitized fragments.

use zakki_common::paths::day_page_path;
use zakki_common::SortMethod;

use crate::controller::{AggregationController, TagView, ViewStats};
use crate::sanitizer::{ElementKind, Fragment, SafeElement, SafeNode};

pub const NO_RESULTS_TEXT: &str = "No matching articles";

const DATE_SORTS: [SortMethod; 2] = [SortMethod::DateDesc, SortMethod::DateAsc];
const RELEVANCE_SORTS: [SortMethod; 2] = [SortMethod::RelevanceDesc, SortMethod::RelevanceAsc];

/// Control panel followed by the date groups, or the no-results block.
pub fn render_page(controller: &AggregationController) -> Fragment {
    let view = controller.view();
    let mut nodes: Vec<SafeNode> = vec![control_panel(&view).into()];

    if view.is_empty() {
        nodes.push(
            SafeElement::new(ElementKind::Div)
                .attr("class", "tag-no-results")
                .child(SafeElement::new(ElementKind::Paragraph).text(NO_RESULTS_TEXT))
                .into(),
        );
    } else {
        let articles = view.groups.iter().map(|group| {
            let date = group.date.format("%Y-%m-%d").to_string();
            let heading = SafeElement::new(ElementKind::Heading(2)).child(
                SafeElement::new(ElementKind::Anchor)
                    .attr("href", day_page_path(group.date))
                    .text(date.clone()),
            );
            SafeNode::from(
                SafeElement::new(ElementKind::Article)
                    .attr("class", "tag-article")
                    .attr("data-date", date)
                    .child(heading)
                    .children(
                        group
                            .entries
                            .iter()
                            .flat_map(|entry| entry.fragment.nodes.iter().cloned()),
                    ),
            )
        });
        nodes.push(
            SafeElement::new(ElementKind::Div)
                .attr("class", "tag-articles-content")
                .children(articles)
                .into(),
        );
    }

    Fragment::new(nodes)
}

/// The current view as pretty-printed JSON.
pub fn view_json(controller: &AggregationController) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&controller.view())
}

fn control_panel(view: &TagView<'_>) -> SafeElement {
    let sort_row = SafeElement::new(ElementKind::Div)
        .attr("class", "tag-controls-row")
        .child(sort_group("Sort by date:", &DATE_SORTS, view.sort))
        .child(sort_group("Sort by relevance:", &RELEVANCE_SORTS, view.sort));

    let threshold = view.min_relevance.value().to_string();
    let slider = SafeElement::new(ElementKind::Div)
        .attr("class", "tag-slider-container")
        .child(
            SafeElement::new(ElementKind::Input)
                .attr("type", "range")
                .attr("class", "tag-slider")
                .attr("min", "0")
                .attr("max", "100")
                .attr("step", "10")
                .attr("value", threshold.clone()),
        )
        .child(
            SafeElement::new(ElementKind::Span)
                .attr("class", "tag-slider-value")
                .text(format!("{threshold}%")),
        );

    let filter_row = SafeElement::new(ElementKind::Div)
        .attr("class", "tag-controls-row")
        .child(
            SafeElement::new(ElementKind::Div)
                .attr("class", "tag-control-group")
                .child(SafeElement::new(ElementKind::Label).text("Minimum relevance:"))
                .child(slider),
        )
        .child(
            SafeElement::new(ElementKind::Div)
                .attr("class", "tag-control-group")
                .child(SafeElement::new(ElementKind::Label).text("Reset settings:"))
                .child(
                    SafeElement::new(ElementKind::Button)
                        .attr("type", "button")
                        .attr("class", "tag-reset-btn")
                        .text("Reset"),
                ),
        );

    let mut panel = SafeElement::new(ElementKind::Div)
        .attr("class", "tag-controls")
        .child(
            SafeElement::new(ElementKind::Heading(3))
                .attr("class", "tag-controls-heading")
                .text(format!("#{} display and sort settings", view.tag)),
        )
        .child(sort_row)
        .child(filter_row)
        .child(
            SafeElement::new(ElementKind::Paragraph)
                .attr("class", "tag-stats")
                .text(format!("Showing {} of {}", view.stats.shown, view.stats.total)),
        );
    if let Some(summary) = summary_line(&view.stats) {
        panel = panel.child(
            SafeElement::new(ElementKind::Paragraph)
                .attr("class", "tag-summary")
                .text(summary),
        );
    }
    panel
}

fn sort_group(label: &str, methods: &[SortMethod], active: SortMethod) -> SafeElement {
    let buttons = methods.iter().map(|&method| {
        let class = if method == active {
            "tag-sort-btn active"
        } else {
            "tag-sort-btn"
        };
        SafeNode::from(
            SafeElement::new(ElementKind::Button)
                .attr("type", "button")
                .attr("class", class)
                .attr("data-sort", method.as_str())
                .text(method.label()),
        )
    });

    SafeElement::new(ElementKind::Div)
        .attr("class", "tag-control-group")
        .child(SafeElement::new(ElementKind::Label).text(label))
        .child(
            SafeElement::new(ElementKind::Div)
                .attr("class", "tag-control-buttons")
                .children(buttons),
        )
}

fn summary_line(stats: &ViewStats) -> Option<String> {
    let (newest, oldest, average) = (stats.newest?, stats.oldest?, stats.average_relevance?);
    Some(format!(
        "Newest {}, oldest {}, average relevance {average}%",
        newest.format("%Y-%m-%d"),
        oldest.format("%Y-%m-%d"),
    ))
}
