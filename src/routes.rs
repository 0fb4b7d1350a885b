use std::{collections::HashSet, sync::Arc};

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderValue, Method},
    routing::get,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, warn};

use crate::{
    config::{non_empty, normalize_origin, normalize_sort},
    error::ApiError,
    filters::{FacetValues, FilterOption, deserialize_filters, facet_summary, matches_all},
    nocodb::{PageInfo, VideoPage, VideoQuery},
    pagination::{PaginationParams, normalize, record_offset},
    state::AppState,
    video::{VIDEO_LIST_FIELDS, VideoListItem},
};

#[derive(Debug, Default, Deserialize)]
pub struct VideosQuery {
    page: Option<String>,
    limit: Option<String>,
    offset: Option<String>,
    sort: Option<String>,
    filters: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideosResponse {
    videos: Vec<VideoListItem>,
    page_info: ResponsePageInfo,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    applied_filters: Option<Vec<FilterOption>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePageInfo {
    #[serde(flatten)]
    upstream: PageInfo,
    has_next_page: bool,
}

#[derive(Debug, Serialize)]
pub struct FacetsResponse {
    facets: Vec<FacetValues>,
    success: bool,
}

pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/videos", get(list_videos))
        .route("/api/videos/facets", get(list_facets))
        .with_state(state)
        .layer(build_cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn list_videos(
    State(state): State<AppState>,
    Query(query): Query<VideosQuery>,
) -> Result<Json<VideosResponse>, ApiError> {
    let video_query = build_video_query(&state, &query)?;
    let mut page = load_page(&state, video_query).await?;

    let applied_filters = requested_filters(&query);
    if let Some(filters) = &applied_filters {
        page.videos.retain(|video| matches_all(video, filters));
    }

    let has_next_page = !page.page_info.is_last_page;
    Ok(Json(VideosResponse {
        videos: page.videos,
        page_info: ResponsePageInfo {
            upstream: page.page_info,
            has_next_page,
        },
        success: true,
        applied_filters,
    }))
}

async fn list_facets(
    State(state): State<AppState>,
    Query(query): Query<VideosQuery>,
) -> Result<Json<FacetsResponse>, ApiError> {
    let video_query = build_video_query(&state, &query)?;
    let mut page = load_page(&state, video_query).await?;

    if let Some(filters) = requested_filters(&query) {
        page.videos.retain(|video| matches_all(video, &filters));
    }

    Ok(Json(FacetsResponse {
        facets: facet_summary(&page.videos),
        success: true,
    }))
}

fn build_video_query(state: &AppState, query: &VideosQuery) -> Result<VideoQuery, ApiError> {
    let params = PaginationParams::from_query(
        query.page.as_deref(),
        query.limit.as_deref(),
        query.offset.as_deref(),
    );
    let normalized = normalize(params);
    let sort = resolve_sort(query.sort.as_deref(), &state.default_sort)?;

    Ok(VideoQuery {
        sort: Some(sort),
        limit: normalized.limit,
        offset: record_offset(&params, &normalized),
        fields: VIDEO_LIST_FIELDS.iter().map(ToString::to_string).collect(),
    })
}

fn requested_filters(query: &VideosQuery) -> Option<Vec<FilterOption>> {
    let filters = deserialize_filters(Some(query.filters.as_deref()?));
    let unrecognized = filters
        .iter()
        .filter(|filter| !filter.kind.is_recognized())
        .map(|filter| filter.kind.as_str())
        .collect::<Vec<_>>();
    if !unrecognized.is_empty() {
        debug!("Unrecognized facet types match every video: {:?}", unrecognized);
    }

    Some(filters)
}

async fn load_page(state: &AppState, query: VideoQuery) -> Result<VideoPage, ApiError> {
    if let Some(page) = state.cache.get(&query, Utc::now()).await {
        debug!("Serving videos from cache: limit={} offset={}", query.limit, query.offset);
        return Ok(page);
    }

    let page = state.nocodb.fetch_videos(&query).await.map_err(|error| {
        warn!("Fetching videos from NocoDB failed: {error}");
        ApiError::upstream("Failed to fetch videos", &error)
    })?;

    state.cache.insert(query, page.clone(), Utc::now()).await;
    Ok(page)
}

/// Blank input selects the default sort; anything else must be a valid
/// column list.
fn resolve_sort(raw: Option<&str>, default_sort: &str) -> Result<String, ApiError> {
    let Some(sort) = raw.and_then(non_empty) else {
        return Ok(default_sort.to_string());
    };

    normalize_sort(sort).ok_or_else(|| ApiError::invalid_sort(sort))
}

fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let allowed_origins = Arc::new(allowed_origins.iter().cloned().collect::<HashSet<_>>());
    let allow_origin = AllowOrigin::predicate(move |origin: &HeaderValue, _| {
        let normalized = origin.to_str().ok().and_then(normalize_origin);
        let allowed = normalized
            .as_ref()
            .is_some_and(|value| allowed_origins.contains(value));
        debug!(
            "CORS origin check raw={:?} normalized={:?} allowed={}",
            origin, normalized, allowed
        );
        allowed
    });

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET])
        .allow_headers(Any)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_sort_uses_default() {
        assert_eq!(resolve_sort(None, "-CreatedAt").unwrap(), "-CreatedAt");
        assert_eq!(resolve_sort(Some("  "), "-CreatedAt").unwrap(), "-CreatedAt");
    }

    #[test]
    fn sort_accepts_column_lists() {
        assert_eq!(resolve_sort(Some("Title"), "x").unwrap(), "Title");
        assert_eq!(
            resolve_sort(Some("-PublishedAt, Title_2"), "x").unwrap(),
            "-PublishedAt,Title_2"
        );
    }

    #[test]
    fn sort_rejects_anything_else() {
        for raw in ["Title;DROP", "--Title", "-", "Title,", "a b", "(Title)"] {
            let error = resolve_sort(Some(raw), "x").unwrap_err();
            assert_eq!(error.code, Some("INVALID_SORT"), "{raw} was accepted");
        }
    }

    #[test]
    fn requested_filters_are_absent_without_token() {
        assert_eq!(requested_filters(&VideosQuery::default()), None);

        let query = VideosQuery {
            filters: Some("genre:finance".to_string()),
            ..VideosQuery::default()
        };
        assert_eq!(
            requested_filters(&query),
            Some(vec![FilterOption::new("genre", "finance")])
        );
    }

    #[test]
    fn response_page_info_is_flattened() {
        let info = ResponsePageInfo {
            upstream: PageInfo {
                total_rows: Some(3),
                is_last_page: false,
                ..PageInfo::default()
            },
            has_next_page: true,
        };

        assert_eq!(
            serde_json::to_value(info).unwrap(),
            serde_json::json!({"totalRows": 3, "isLastPage": false, "hasNextPage": true})
        );
    }
}
