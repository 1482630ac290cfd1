use tracing::{info, warn};

use zakki_common::{Result, Tag};

use crate::controller::AggregationController;
use crate::loader::TagLoader;

/// Entry point for a tag page: validate the requested tag, then run the
/// scan. An invalid tag is returned as [`zakki_common::ZakkiError::InvalidTag`]
/// before any request is made; every other failure is absorbed by the scan.
pub async fn initialize_tag_page(raw_tag: &str, loader: &TagLoader) -> Result<AggregationController> {
    let tag = match Tag::parse(raw_tag) {
        Ok(tag) => tag,
        Err(e) => {
            warn!(tag = raw_tag, "Invalid tag, not loading");
            return Err(e);
        }
    };

    info!(tag = tag.as_str(), months = loader.months().len(), "Loading tag page");
    Ok(loader.load(&tag).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockFetcher;
    use std::sync::Arc;
    use zakki_common::{Config, ZakkiError};

    #[tokio::test]
    async fn invalid_tag_fetches_nothing() {
        let mock = Arc::new(MockFetcher::new());
        let loader = TagLoader::new(mock.clone(), &Config::default());
        let too_long = "x".repeat(51);
        for raw in ["\"; DROP", "", "a b", "../x", too_long.as_str()] {
            let err = initialize_tag_page(raw, &loader).await.err();
            assert!(matches!(err, Some(ZakkiError::InvalidTag(_))), "{raw:?}");
        }
        assert_eq!(mock.request_count(), 0);
    }
}
