//! The multi-year scan.
//!
//! Months are processed in fixed-size batches: the months of one batch are
//! scanned concurrently, the next batch starts only after all of them have
//! settled. Within a month the listed days are fetched one after another,
//! so at most `batch_size` requests are in flight. Everything is gathered
//! before dedup and sorting, so the result never depends on completion
//! order.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use zakki_common::{CandidateSection, Config, MonthKey, Tag};

use crate::controller::AggregationController;
use crate::extractor::TagSectionExtractor;
use crate::fetcher::{PageFetcher, SiteFetcher};
use crate::manifest::ManifestResolver;
use crate::throttle::RequestThrottle;

/// Where one load currently is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum LoadPhase {
    Idle,
    Resolving {
        completed_months: usize,
        total_months: usize,
    },
    Aggregating,
    Rendered {
        entries: usize,
    },
}

impl LoadPhase {
    /// Coarse progress in percent.
    pub fn percent(&self) -> u8 {
        match self {
            LoadPhase::Idle => 0,
            LoadPhase::Resolving {
                completed_months,
                total_months,
            } => {
                if *total_months == 0 {
                    100
                } else {
                    ((completed_months * 100) / total_months).min(100) as u8
                }
            }
            LoadPhase::Aggregating | LoadPhase::Rendered { .. } => 100,
        }
    }
}

pub struct TagLoader {
    pages: Arc<PageFetcher>,
    manifests: ManifestResolver,
    months: Vec<MonthKey>,
    batch_size: usize,
    progress: watch::Sender<LoadPhase>,
}

impl TagLoader {
    pub fn new(site: Arc<dyn SiteFetcher>, config: &Config) -> Self {
        let throttle = Arc::new(RequestThrottle::from_config(config));
        let pages = Arc::new(PageFetcher::new(site, throttle, config.fetch_timeout));
        let (progress, _) = watch::channel(LoadPhase::Idle);
        Self {
            manifests: ManifestResolver::new(pages.clone()),
            pages,
            months: MonthKey::range(config.start_year, config.end_year),
            batch_size: config.batch_size.max(1),
            progress,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<LoadPhase> {
        self.progress.subscribe()
    }

    /// Log every phase change at debug level. The task ends when the loader
    /// is dropped.
    pub fn spawn_progress_reporter(&self) -> JoinHandle<()> {
        let mut progress = self.subscribe();
        tokio::spawn(async move {
            while progress.changed().await.is_ok() {
                let phase = progress.borrow_and_update().clone();
                debug!(percent = phase.percent(), phase = ?phase, "Load progress");
            }
        })
    }

    pub fn phase(&self) -> LoadPhase {
        self.progress.borrow().clone()
    }

    pub fn months(&self) -> &[MonthKey] {
        &self.months
    }

    /// Scan every month for `tag` and hand the result to a new controller.
    /// Missing or failing months contribute nothing.
    pub async fn load(&self, tag: &Tag) -> AggregationController {
        let extractor = TagSectionExtractor::new(tag.clone());
        let total = self.months.len();
        self.publish(LoadPhase::Resolving {
            completed_months: 0,
            total_months: total,
        });

        let mut per_month: Vec<Vec<CandidateSection>> = Vec::with_capacity(total);
        let mut completed = 0;
        for (index, batch) in self.months.chunks(self.batch_size).enumerate() {
            let results = join_all(batch.iter().map(|&month| self.scan_month(month, &extractor))).await;
            per_month.extend(results);

            completed += batch.len();
            info!(
                tag = tag.as_str(),
                batch = index + 1,
                completed_months = completed,
                total_months = total,
                "Batch complete"
            );
            self.publish(LoadPhase::Resolving {
                completed_months: completed,
                total_months: total,
            });
        }

        self.publish(LoadPhase::Aggregating);
        let sections: Vec<CandidateSection> = per_month.into_iter().flatten().collect();
        let controller = AggregationController::build(tag.clone(), sections);

        self.publish(LoadPhase::Rendered {
            entries: controller.entries().len(),
        });
        controller
    }

    async fn scan_month(&self, month: MonthKey, extractor: &TagSectionExtractor) -> Vec<CandidateSection> {
        let dates = self.manifests.resolve(month).await;
        let mut sections = Vec::new();
        for date in dates {
            if let Some(body) = self.pages.day_page(date).await {
                sections.extend(extractor.extract(&body, date));
            }
        }
        sections
    }

    fn publish(&self, phase: LoadPhase) {
        self.progress.send_replace(phase);
    }
}

/// Wait for a reporter task. A panic or cancellation is logged, and the
/// return value says whether the task finished cleanly.
pub async fn join_reporter(handle: JoinHandle<()>) -> bool {
    match handle.await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, panicked = e.is_panic(), "Progress reporter failed");
            false
        }
    }
}
