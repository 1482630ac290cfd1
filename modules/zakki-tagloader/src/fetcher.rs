// Content retrieval for the tag loader.
//
// SiteFetcher is the only network seam: production uses ZakkiClient,
// tests use testing::MockFetcher. PageFetcher layers the internal-URL
// allowlist, the request throttle and the per-fetch timeout on top.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{debug, warn};

use zakki_client::ZakkiClient;
use zakki_common::paths::{day_page_path, ensure_internal};
use zakki_common::{Result, ZakkiError};

use crate::throttle::RequestThrottle;

#[async_trait]
pub trait SiteFetcher: Send + Sync {
    /// GET a site-relative path. `Ok(None)` means the resource does not exist.
    async fn fetch(&self, path: &str) -> Result<Option<String>>;
}

#[async_trait]
impl SiteFetcher for ZakkiClient {
    async fn fetch(&self, path: &str) -> Result<Option<String>> {
        self.get_text(path)
            .await
            .map_err(|e| ZakkiError::Fetch(e.to_string()))
    }
}

/// Guarded access to archive documents.
pub struct PageFetcher {
    site: Arc<dyn SiteFetcher>,
    throttle: Arc<RequestThrottle>,
    timeout: Duration,
}

impl PageFetcher {
    pub fn new(site: Arc<dyn SiteFetcher>, throttle: Arc<RequestThrottle>, timeout: Duration) -> Self {
        Self {
            site,
            throttle,
            timeout,
        }
    }

    /// Fetch an archive path. The allowlist runs before the throttle, so a
    /// rejected path neither goes on the wire nor consumes a slot.
    pub async fn get(&self, path: &str) -> Result<Option<String>> {
        ensure_internal(path)?;
        self.throttle.acquire()?;

        match tokio::time::timeout(self.timeout, self.site.fetch(path)).await {
            Ok(result) => result,
            Err(_) => Err(ZakkiError::Fetch(format!(
                "{path} timed out after {}ms",
                self.timeout.as_millis()
            ))),
        }
    }

    /// A day's document, or `None` when it is missing or could not be
    /// retrieved. Failures stop here and never fail the month.
    pub async fn day_page(&self, date: NaiveDate) -> Option<String> {
        let path = day_page_path(date);
        match self.get(&path).await {
            Ok(Some(body)) => {
                debug!(path = path.as_str(), bytes = body.len(), "Fetched day page");
                Some(body)
            }
            Ok(None) => {
                debug!(path = path.as_str(), "Day page listed in manifest but missing");
                None
            }
            Err(e) => {
                warn!(path = path.as_str(), error = %e, "Day page fetch failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockFetcher;

    fn fetcher(mock: Arc<MockFetcher>, limit: usize, timeout: Duration) -> PageFetcher {
        PageFetcher::new(
            mock,
            Arc::new(RequestThrottle::new(limit, Duration::from_secs(60))),
            timeout,
        )
    }

    fn feb_6() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, 6).unwrap()
    }

    #[tokio::test]
    async fn non_internal_path_is_never_requested() {
        let mock = Arc::new(MockFetcher::new());
        let pages = fetcher(mock.clone(), 10, Duration::from_secs(1));

        let err = pages.get("/zakki/2025/02/../../secrets").await.unwrap_err();
        assert!(matches!(err, ZakkiError::InvalidPath(_)));
        let err = pages.get("https://evil.example/zakki/2025/02/x.html").await.unwrap_err();
        assert!(matches!(err, ZakkiError::InvalidPath(_)));

        assert_eq!(mock.request_count(), 0);
    }

    #[tokio::test]
    async fn day_page_returns_body() {
        let mock = Arc::new(
            MockFetcher::new().on_page("/zakki/2025/02/days/2025-02-06.html", "<p>hi</p>"),
        );
        let pages = fetcher(mock.clone(), 10, Duration::from_secs(1));
        assert_eq!(pages.day_page(feb_6()).await.as_deref(), Some("<p>hi</p>"));
        assert_eq!(mock.requests(), vec!["/zakki/2025/02/days/2025-02-06.html"]);
    }

    #[tokio::test]
    async fn failures_become_no_content() {
        let mock = Arc::new(
            MockFetcher::new().on_status("/zakki/2025/02/days/2025-02-06.html", 500),
        );
        let pages = fetcher(mock, 10, Duration::from_secs(1));
        assert!(pages.day_page(feb_6()).await.is_none());
    }

    #[tokio::test]
    async fn timeout_becomes_no_content() {
        let mock = Arc::new(MockFetcher::new().on_delay(
            "/zakki/2025/02/days/2025-02-06.html",
            Duration::from_millis(500),
            "<p>late</p>",
        ));
        let pages = fetcher(mock, 10, Duration::from_millis(20));
        assert!(pages.day_page(feb_6()).await.is_none());
    }

    #[tokio::test]
    async fn cancelled_fetch_is_no_longer_in_flight() {
        let mock = Arc::new(
            MockFetcher::new()
                .on_delay("/zakki/2025/02/days/2025-02-06.html", Duration::from_millis(500), "<p>late</p>")
                .on_page("/zakki/2025/02/days/2025-02-07.html", "<p>ok</p>"),
        );
        let pages = fetcher(mock.clone(), 10, Duration::from_millis(20));
        assert!(pages.day_page(feb_6()).await.is_none());
        let feb_7 = NaiveDate::from_ymd_opt(2025, 2, 7).unwrap();
        assert!(pages.day_page(feb_7).await.is_some());
        assert_eq!(mock.max_in_flight(), 1);
    }

    #[tokio::test]
    async fn throttle_rejection_skips_the_request() {
        let mock = Arc::new(
            MockFetcher::new().on_page("/zakki/2025/02/days/2025-02-06.html", "<p>x</p>"),
        );
        let pages = fetcher(mock.clone(), 1, Duration::from_secs(1));
        assert!(pages.day_page(feb_6()).await.is_some());
        assert!(pages.day_page(feb_6()).await.is_none());
        assert_eq!(mock.request_count(), 1);
    }
}
