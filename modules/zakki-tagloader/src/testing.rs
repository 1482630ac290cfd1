// Test doubles and fixture builders for the tag loader.
//
// - MockFetcher (SiteFetcher): HashMap-based path→response, records every
//   requested path
// - manifest_js / day_page / tagged_section: archive documents in the shapes the site serves

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use zakki_common::{Result, ZakkiError};

use crate::fetcher::SiteFetcher;

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Response {
    Body(String),
    Status(u16),
    Delayed(Duration, String),
}

/// HashMap-based site fetcher. Unregistered paths are absent (`Ok(None)`),
/// like a 404. Builder pattern: `.on_page()`, `.on_status()`, `.on_delay()`.
#[derive(Default)]
pub struct MockFetcher {
    responses: HashMap<String, Response>,
    requests: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_page(mut self, path: &str, body: &str) -> Self {
        self.responses
            .insert(path.to_string(), Response::Body(body.to_string()));
        self
    }

    /// Respond with a non-success status. 404 reads as absent.
    pub fn on_status(mut self, path: &str, status: u16) -> Self {
        self.responses
            .insert(path.to_string(), Response::Status(status));
        self
    }

    pub fn on_delay(mut self, path: &str, delay: Duration, body: &str) -> Self {
        self.responses
            .insert(path.to_string(), Response::Delayed(delay, body.to_string()));
        self
    }

    /// Every path requested so far, in request order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Highest number of requests that were outstanding at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SiteFetcher for MockFetcher {
    async fn fetch(&self, path: &str) -> Result<Option<String>> {
        self.requests.lock().unwrap().push(path.to_string());
        let _guard = InFlight::enter(&self.in_flight, &self.max_in_flight);

        match self.responses.get(path).cloned() {
            None | Some(Response::Status(404)) => Ok(None),
            Some(Response::Body(body)) => Ok(Some(body)),
            Some(Response::Status(status)) => Err(ZakkiError::Fetch(format!(
                "MockFetcher: status {status} for {path}"
            ))),
            Some(Response::Delayed(delay, body)) => {
                tokio::time::sleep(delay).await;
                Ok(Some(body))
            }
        }
    }
}

/// Counts one outstanding request until dropped, including when a timeout
/// cancels the response future.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(in_flight: &'a AtomicUsize, max: &AtomicUsize) -> Self {
        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        max.fetch_max(now, Ordering::SeqCst);
        Self(in_flight)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A month script listing `days`, quoted the way the generator writes them.
pub fn manifest_js(days: &[&str]) -> String {
    let list = days
        .iter()
        .map(|d| format!("\"{d}\""))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "async function loadDailyArticles() {{\n\tconst dates = [{list}];\n\tfor (const d of dates) {{ await load(d); }}\n}}\n"
    )
}

/// A day page with one article holding `sections`.
pub fn day_page(article_id: &str, sections: &[&str]) -> String {
    format!(
        "<!DOCTYPE html><html><head><title>zakki</title></head><body><main><article id=\"{article_id}\">{}</article></main></body></html>",
        sections.concat()
    )
}

/// A `data-tags` section with a heading and body text.
pub fn tagged_section(tags: &str, heading: &str, body: &str) -> String {
    format!("<section data-tags=\"{tags}\"><h2>{heading}</h2><p>{body}</p></section>")
}
