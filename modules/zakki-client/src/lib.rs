pub mod error;

pub use error::{ClientError, Result};

use std::time::Duration;

use reqwest::StatusCode;
use tracing::debug;
use url::Url;

/// Plain-GET client for site-relative paths of the diary archive.
pub struct ZakkiClient {
    client: reqwest::Client,
    base_url: Url,
}

impl ZakkiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url =
            Url::parse(base_url).map_err(|e| ClientError::BaseUrl(format!("{base_url}: {e}")))?;
        if base_url.scheme() != "http" && base_url.scheme() != "https" {
            return Err(ClientError::BaseUrl(format!(
                "only http/https origins are supported, got {}",
                base_url.scheme()
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self { client, base_url })
    }

    /// Resolve a site-relative path against the origin. Absolute URLs and
    /// protocol-relative paths are refused so the origin cannot change.
    pub fn resolve(&self, path: &str) -> Result<Url> {
        if !path.starts_with('/') || path.starts_with("//") {
            return Err(ClientError::BaseUrl(format!("not a site-relative path: {path}")));
        }
        self.base_url
            .join(path)
            .map_err(|e| ClientError::BaseUrl(format!("{path}: {e}")))
    }

    /// GET `path` and return the body as text.
    ///
    /// `Ok(None)` means the resource does not exist (404); every other
    /// non-success status is an [`ClientError::Api`].
    pub async fn get_text(&self, path: &str) -> Result<Option<String>> {
        let url = self.resolve(path)?;
        debug!(path, "GET");

        let resp = self.client.get(url).send().await?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ClientError::Api {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }

        Ok(Some(resp.text().await?))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ZakkiClient {
        ZakkiClient::new("https://diary.example", Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn relative_paths_resolve_against_origin() {
        let url = client().resolve("/zakki/2025/02/zakki02.js").unwrap();
        assert_eq!(url.as_str(), "https://diary.example/zakki/2025/02/zakki02.js");
    }

    #[test]
    fn foreign_targets_are_refused() {
        let c = client();
        assert!(c.resolve("https://evil.example/x").is_err());
        assert!(c.resolve("//evil.example/x").is_err());
        assert!(c.resolve("zakki/2025").is_err());
    }

    #[test]
    fn non_http_origin_is_refused() {
        assert!(ZakkiClient::new("file:///etc", Duration::from_secs(1)).is_err());
        assert!(ZakkiClient::new("not a url", Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn refused_path_never_hits_the_network() {
        let err = client().get_text("https://evil.example/").await.unwrap_err();
        assert!(matches!(err, ClientError::BaseUrl(_)));
    }
}
