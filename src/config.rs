use std::time::Duration;

use tracing::{info, warn};
use url::Url;

use crate::error::ApiError;

const DEFAULT_NOCODB_TIMEOUT_SECONDS: u64 = 15;
const DEFAULT_SORT: &str = "-CreatedAt";
const DEFAULT_CACHE_TTL_SECONDS: u64 = 60;
const DEFAULT_CACHE_MAX_ENTRIES: usize = 256;
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8787";
const DEV_ORIGINS: [&str; 2] = ["http://127.0.0.1:5173", "http://localhost:5173"];

#[derive(Debug, Clone)]
pub struct Config {
    pub nocodb_url: Url,
    pub nocodb_api_token: String,
    pub nocodb_table_id: String,
    pub nocodb_timeout: Duration,
    pub default_sort: String,
    pub cache_ttl_seconds: u64,
    pub cache_max_entries: usize,
    pub allowed_origins: Vec<String>,
    pub bind_addr: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source. Blank values count
    /// as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        let read = |name: &str| {
            lookup(name).and_then(|value| non_empty(&value).map(ToString::to_string))
        };
        let require = |name: &str| {
            read(name).ok_or_else(|| ApiError::internal(format!("{name} must be set")))
        };

        let raw_url = require("NOCODB_URL")?;
        let nocodb_url = Url::parse(&raw_url).map_err(|error| {
            ApiError::internal(format!("NOCODB_URL is not a valid URL: {error}"))
        })?;
        if !matches!(nocodb_url.scheme(), "http" | "https") {
            return Err(ApiError::internal(format!(
                "NOCODB_URL must use http or https, got {raw_url}"
            )));
        }

        let nocodb_timeout = Duration::from_secs(
            parse_number(read("NOCODB_TIMEOUT_SECONDS"), "NOCODB_TIMEOUT_SECONDS")
                .filter(|value| *value > 0)
                .unwrap_or(DEFAULT_NOCODB_TIMEOUT_SECONDS),
        );

        let default_sort = match read("VIDEO_DEFAULT_SORT") {
            Some(raw) => normalize_sort(&raw).ok_or_else(|| {
                ApiError::internal(format!(
                    "VIDEO_DEFAULT_SORT is not a valid sort: {raw}. Use values like -CreatedAt,Title"
                ))
            })?,
            None => DEFAULT_SORT.to_string(),
        };

        let cache_ttl_seconds =
            parse_number(read("VIDEO_CACHE_TTL_SECONDS"), "VIDEO_CACHE_TTL_SECONDS")
                .unwrap_or(DEFAULT_CACHE_TTL_SECONDS);
        let cache_max_entries =
            parse_number(read("VIDEO_CACHE_MAX_ENTRIES"), "VIDEO_CACHE_MAX_ENTRIES")
                .unwrap_or(DEFAULT_CACHE_MAX_ENTRIES);

        let allowed_origins = resolve_allowed_origins(read("ALLOWED_ORIGINS"))?;
        let bind_addr = resolve_bind_addr(read("APP_ADDR"), read("PORT"));

        Ok(Self {
            nocodb_url,
            nocodb_api_token: require("NOCODB_API_TOKEN")?,
            nocodb_table_id: require("NOCODB_TABLE_ID")?,
            nocodb_timeout,
            default_sort,
            cache_ttl_seconds,
            cache_max_entries,
            allowed_origins,
            bind_addr,
        })
    }
}

fn parse_number<T: std::str::FromStr>(value: Option<String>, name: &str) -> Option<T> {
    let value = value?;
    match value.trim().parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!("{name}={value:?} is not a valid number, using default");
            None
        }
    }
}

fn resolve_bind_addr(app_addr: Option<String>, port: Option<String>) -> String {
    if let Some(configured) = app_addr {
        return configured;
    }

    if let Some(port) = port.and_then(|value| value.trim().parse::<u16>().ok()) {
        return format!("0.0.0.0:{port}");
    }

    DEFAULT_BIND_ADDR.to_string()
}

fn resolve_allowed_origins(configured: Option<String>) -> Result<Vec<String>, ApiError> {
    let configured = configured
        .map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(ToString::to_string)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    let origins = if configured.is_empty() {
        warn!("ALLOWED_ORIGINS is not set, falling back to development origins");
        DEV_ORIGINS.iter().map(ToString::to_string).collect()
    } else {
        configured
    };

    let mut normalized = Vec::with_capacity(origins.len());
    for origin in &origins {
        let value = normalize_origin(origin).ok_or_else(|| {
            ApiError::internal(format!(
                "Invalid origin in ALLOWED_ORIGINS: {origin}. Use values like https://example.com"
            ))
        })?;
        if !normalized.contains(&value) {
            normalized.push(value);
        }
    }

    info!("CORS allow-list loaded with {} origin(s): {:?}", normalized.len(), normalized);
    Ok(normalized)
}

/// Reduces an origin to `scheme://host[:port]`, dropping default ports.
/// Anything with a path, query or fragment is not an origin.
pub fn normalize_origin(value: &str) -> Option<String> {
    let parsed = Url::parse(value).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    let scheme = parsed.scheme();
    let default_port = match scheme {
        "http" => 80,
        "https" => 443,
        _ => return None,
    };

    if parsed.path() != "/" || parsed.query().is_some() || parsed.fragment().is_some() {
        return None;
    }

    match parsed.port() {
        Some(port) if port != default_port => Some(format!("{scheme}://{host}:{port}")),
        _ => Some(format!("{scheme}://{host}")),
    }
}

/// Checks a NocoDB sort expression: comma separated column names of
/// `[A-Za-z0-9_]`, each optionally prefixed with `-` for descending order.
/// Returns the list with whitespace around each column removed.
pub fn normalize_sort(raw: &str) -> Option<String> {
    let columns = raw.split(',').map(str::trim).collect::<Vec<_>>();
    let valid = columns.iter().all(|column| {
        let name = column.strip_prefix('-').unwrap_or(column);
        !name.is_empty()
            && name
                .chars()
                .all(|character| character.is_ascii_alphanumeric() || character == '_')
    });

    valid.then(|| columns.join(","))
}

pub fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
