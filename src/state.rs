use std::sync::Arc;

use tracing::info;

use crate::{cache::PageCache, config::Config, error::ApiError, nocodb::NocoDbClient};

#[derive(Clone)]
pub struct AppState {
    pub nocodb: NocoDbClient,
    pub cache: Arc<PageCache>,
    pub default_sort: Arc<str>,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.nocodb_timeout)
            .build()
            .map_err(|error| ApiError::internal(format!("Could not build HTTP client: {error}")))?;

        let nocodb = NocoDbClient::new(
            http_client,
            &config.nocodb_url,
            &config.nocodb_table_id,
            config.nocodb_api_token.clone(),
        )
        .map_err(|error| ApiError::internal(error.to_string()))?;

        let cache = PageCache::new(config.cache_ttl_seconds, config.cache_max_entries);
        if cache.is_enabled() {
            info!(
                "Page cache enabled: ttl={}s, max_entries={}",
                config.cache_ttl_seconds, config.cache_max_entries
            );
        } else {
            info!("Page cache disabled");
        }

        Ok(Self {
            nocodb,
            cache: Arc::new(cache),
            default_sort: Arc::from(config.default_sort.as_str()),
        })
    }
}
