//! Client for the NocoDB v2 records API holding the video catalog.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::video::VideoListItem;

const TOKEN_HEADER: &str = "xc-token";
const MAX_ERROR_BODY_CHARS: usize = 300;

#[derive(Debug, Error)]
pub enum NocoDbError {
    #[error("request to NocoDB failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("NocoDB answered {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("unexpected NocoDB response: {0}")]
    Decode(String),

    #[error("NocoDB base URL cannot hold a path: {0}")]
    InvalidBaseUrl(String),
}

/// One page request against the videos table. Also used as the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoQuery {
    pub sort: Option<String>,
    pub limit: u64,
    pub offset: u64,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_rows: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_first_page: Option<bool>,
    #[serde(default = "default_last_page")]
    pub is_last_page: bool,
}

impl Default for PageInfo {
    fn default() -> Self {
        Self {
            total_rows: None,
            page: None,
            page_size: None,
            is_first_page: None,
            is_last_page: default_last_page(),
        }
    }
}

fn default_last_page() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoPage {
    pub videos: Vec<VideoListItem>,
    pub page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
struct RecordsEnvelope {
    #[serde(default)]
    list: Vec<serde_json::Value>,
    #[serde(default, rename = "pageInfo")]
    page_info: PageInfo,
}

#[derive(Clone)]
pub struct NocoDbClient {
    http: reqwest::Client,
    records_url: Url,
    api_token: String,
}

impl NocoDbClient {
    pub fn new(
        http: reqwest::Client,
        base_url: &Url,
        table_id: &str,
        api_token: impl Into<String>,
    ) -> Result<Self, NocoDbError> {
        let mut records_url = base_url.clone();
        records_url
            .path_segments_mut()
            .map_err(|_| NocoDbError::InvalidBaseUrl(base_url.to_string()))?
            .pop_if_empty()
            .extend(["api", "v2", "tables", table_id, "records"]);

        Ok(Self {
            http,
            records_url,
            api_token: api_token.into(),
        })
    }

    pub fn records_url(&self, query: &VideoQuery) -> Url {
        let mut url = self.records_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("limit", &query.limit.to_string());
            pairs.append_pair("offset", &query.offset.to_string());
            if let Some(sort) = query.sort.as_deref() {
                pairs.append_pair("sort", sort);
            }
            if !query.fields.is_empty() {
                pairs.append_pair("fields", &query.fields.join(","));
            }
        }
        url
    }

    pub async fn fetch_videos(&self, query: &VideoQuery) -> Result<VideoPage, NocoDbError> {
        let url = self.records_url(query);
        debug!("Fetching videos from NocoDB: {}", url);

        let response = self
            .http
            .get(url)
            .header(TOKEN_HEADER, &self.api_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NocoDbError::Status {
                status,
                body: excerpt(&body),
            });
        }

        let envelope = response
            .json::<RecordsEnvelope>()
            .await
            .map_err(|error| NocoDbError::Decode(error.to_string()))?;

        Ok(VideoPage {
            videos: decode_rows(envelope.list),
            page_info: envelope.page_info,
        })
    }
}

/// Decodes rows one by one. Mistyped columns read as absent inside the model;
/// only rows that are not records at all are skipped.
fn decode_rows(rows: Vec<serde_json::Value>) -> Vec<VideoListItem> {
    rows.into_iter()
        .enumerate()
        .filter_map(
            |(index, row)| match serde_json::from_value::<VideoListItem>(row) {
                Ok(video) => Some(video),
                Err(error) => {
                    warn!("Skipping NocoDB row {index}, not a video record: {error}");
                    None
                }
            },
        )
        .collect()
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_ERROR_BODY_CHARS {
        return trimmed.to_string();
    }

    let mut shortened = trimmed
        .chars()
        .take(MAX_ERROR_BODY_CHARS)
        .collect::<String>();
    shortened.push_str("...");
    shortened
}
