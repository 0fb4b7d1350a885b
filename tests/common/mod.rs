use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use axum::{
    Json, Router,
    body::Body,
    extract::{Query, State},
    http::{HeaderMap, Request, StatusCode},
    response::Response,
    routing::get,
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower::ServiceExt;
use video_catalog::{AppState, Config, router};

pub const TABLE_ID: &str = "tbl_videos";
pub const API_TOKEN: &str = "test-token";

#[derive(Clone)]
struct StubState {
    status: StatusCode,
    body: Value,
    calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<SeenRequest>>>,
}

#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub query: HashMap<String, String>,
    pub token: Option<String>,
}

/// A NocoDB stand-in answering every records request with a canned body.
pub struct StubNocoDb {
    pub base_url: String,
    calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<SeenRequest>>>,
}

impl StubNocoDb {
    pub async fn spawn(status: StatusCode, body: Value) -> Self {
        let calls = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = StubState {
            status,
            body,
            calls: Arc::clone(&calls),
            requests: Arc::clone(&requests),
        };

        let app = Router::new()
            .route("/api/v2/tables/{table}/records", get(records))
            .with_state(state);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            calls,
            requests,
        }
    }

    pub async fn with_videos(videos: Value, is_last_page: bool) -> Self {
        Self::spawn(
            StatusCode::OK,
            json!({
                "list": videos,
                "pageInfo": {
                    "totalRows": 3,
                    "page": 1,
                    "pageSize": 35,
                    "isFirstPage": true,
                    "isLastPage": is_last_page
                }
            }),
        )
        .await
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> SeenRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

async fn records(
    State(state): State<StubState>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    state.calls.fetch_add(1, Ordering::SeqCst);
    state.requests.lock().unwrap().push(SeenRequest {
        query,
        token: headers
            .get("xc-token")
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string),
    });
    (state.status, Json(state.body.clone()))
}

pub fn sample_videos() -> Value {
    json!([
        {
            "Id": 1,
            "Title": "Bitcoin weekly",
            "VideoGenre": "finance",
            "TickerSymbol": "BTC",
            "Sentiment": 2,
            "Persons": [{"Title": "Alice"}],
            "Hashtags": ["#btc"]
        },
        {
            "Id": 2,
            "Title": "Ether deep dive",
            "VideoGenre": "finance",
            "TickerSymbol": "ETH",
            "Persons": ["Bob"],
            "Hashtags": ["#eth"]
        },
        {
            "Id": 3,
            "Title": "Fusion research",
            "VideoGenre": "science",
            "Companies": [{"name": "Helion"}],
            "DOIs": ["10.1000/182"]
        }
    ])
}

pub fn build_app(base_url: &str, cache_ttl_seconds: u64) -> Router {
    let cache_ttl = cache_ttl_seconds.to_string();
    let config = Config::from_lookup(|name| match name {
        "NOCODB_URL" => Some(base_url.to_string()),
        "NOCODB_API_TOKEN" => Some(API_TOKEN.to_string()),
        "NOCODB_TABLE_ID" => Some(TABLE_ID.to_string()),
        "VIDEO_CACHE_TTL_SECONDS" => Some(cache_ttl.clone()),
        "ALLOWED_ORIGINS" => Some("http://localhost:5173".to_string()),
        _ => None,
    })
    .unwrap();
    let state = AppState::new(&config).unwrap();
    router(state, &config.allowed_origins)
}

pub async fn send_get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
