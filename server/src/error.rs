use crate::tmdb::TmdbError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use cinematch_core::Error as CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("recommendation engine is still loading, retry shortly")]
    NotReady,

    #[error("internal consistency error")]
    Consistency(#[source] CoreError),

    #[error("{0}")]
    BadRequest(String),

    #[error("upstream failure: {0}")]
    Upstream(#[from] TmdbError),
}

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::NotFound(title) => ApiError::NotFound(format!("Title not found: {title}")),
            CoreError::NotReady => ApiError::NotReady,
            other => ApiError::Consistency(other),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Consistency(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::Consistency(e) => tracing::error!(error = %e, "consistency error"),
            ApiError::Upstream(e) => tracing::warn!(error = %e, "tmdb request failed"),
            _ => tracing::debug!(error = %self, %status, "request rejected"),
        }
        let body = Json(serde_json::json!({ "detail": self.to_string() }));
        let mut resp = (status, body).into_response();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            resp.headers_mut().insert(axum::http::header::RETRY_AFTER, axum::http::HeaderValue::from_static("5"));
        }
        resp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_statuses() {
        assert_eq!(ApiError::from(CoreError::NotFound("x".into())).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::from(CoreError::NotReady).status(), StatusCode::SERVICE_UNAVAILABLE);
        let oob = CoreError::IndexOutOfRange { row: 9, rows: 3 };
        assert_eq!(ApiError::from(oob).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
