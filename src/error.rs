use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::nocodb::NocoDbError;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub code: Option<&'static str>,
    pub details: Option<String>,
}

impl ApiError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
            code: None,
            details: None,
        }
    }

    pub fn invalid_sort(sort: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: format!("Invalid sort expression: {sort:?}"),
            code: Some("INVALID_SORT"),
            details: None,
        }
    }

    pub fn upstream(message: impl Into<String>, source: &NocoDbError) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
            code: Some("UPSTREAM_FAILED"),
            details: Some(source.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
            success: false,
            code: self.code,
            details: self.details,
        });

        (self.status, body).into_response()
    }
}
