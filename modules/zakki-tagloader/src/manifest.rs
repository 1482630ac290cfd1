//! Per-month manifests: which days of a month have a diary page.
//!
//! The manifest is the month script `zakki{MM}.js`, which contains an array
//! literal such as `const dates = ['03', "06", 13];`. Anything we cannot
//! read is treated as an empty month.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex};

use chrono::NaiveDate;
use regex::Regex;
use tracing::{debug, warn};

use zakki_common::paths::manifest_path;
use zakki_common::MonthKey;

use crate::fetcher::PageFetcher;

static DATES_ARRAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)const\s+dates\s*=\s*\[(.*?)\]").expect("valid regex"));

static DAY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid regex"));

/// Days listed by a manifest body, as calendar dates in `month`.
///
/// Impossible dates are dropped; the result is sorted and deduplicated.
pub fn parse_manifest(body: &str, month: MonthKey) -> Vec<NaiveDate> {
    let Some(list) = DATES_ARRAY_RE.captures(body).and_then(|c| c.get(1)) else {
        debug!(month = %month, "Manifest has no dates array");
        return Vec::new();
    };

    let mut dates: Vec<NaiveDate> = DAY_RE
        .find_iter(list.as_str())
        .filter_map(|m| m.as_str().parse::<u32>().ok())
        .filter_map(|day| month.date(day))
        .collect();
    dates.sort();
    dates.dedup();
    dates
}

/// Resolves months to their listed days, caching per month for the life of
/// one loader.
pub struct ManifestResolver {
    pages: Arc<PageFetcher>,
    cache: Mutex<HashMap<MonthKey, Vec<NaiveDate>>>,
}

impl ManifestResolver {
    pub fn new(pages: Arc<PageFetcher>) -> Self {
        Self {
            pages,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub async fn resolve(&self, month: MonthKey) -> Vec<NaiveDate> {
        if let Some(hit) = self.cached(month) {
            return hit;
        }

        let path = manifest_path(month);
        let dates = match self.pages.get(&path).await {
            Ok(Some(body)) => parse_manifest(&body, month),
            Ok(None) => {
                debug!(month = %month, "No manifest for month");
                Vec::new()
            }
            Err(e) => {
                warn!(month = %month, path = path.as_str(), error = %e, "Manifest fetch failed");
                // failures are not cached
                return Vec::new();
            }
        };

        if !dates.is_empty() {
            debug!(month = %month, days = dates.len(), "Resolved manifest");
        }
        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(month, dates.clone());
        dates
    }

    fn cached(&self, month: MonthKey) -> Option<Vec<NaiveDate>> {
        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&month)
            .cloned()
    }
}
