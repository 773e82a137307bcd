//! Maps domain failures onto HTTP responses.

use crate::domain::errors::InsightError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::{error, warn};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Insight(#[from] InsightError),

    /// Request body missing, not JSON, or missing fields (422).
    #[error("{0}")]
    Unprocessable(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Insight(e) => match e {
                InsightError::InvalidSymbol { .. }
                | InsightError::DataUnavailable { .. }
                | InsightError::InsufficientData { .. }
                | InsightError::InvalidWindow(_) => StatusCode::BAD_REQUEST,
                InsightError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
                InsightError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                InsightError::Inference(_) | InsightError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            AppError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = self.to_string();

        if status.is_server_error() {
            error!("HTTP {}: {}", status.as_u16(), detail);
        } else {
            warn!("HTTP {}: {}", status.as_u16(), detail);
        }

        let body = Json(json!({
            "detail": detail,
            "status": status.as_u16()
        }));
        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let status = |e: InsightError| AppError::from(e).status();

        assert_eq!(
            status(InsightError::InvalidSymbol {
                symbol: "".into(),
                reason: "empty".into()
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status(InsightError::RateLimited), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            status(InsightError::ModelUnavailable("missing".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status(InsightError::Inference("nan".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Unprocessable("missing field `symbol`".into()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_window_message_is_verbatim() {
        let err = AppError::from(InsightError::InvalidWindow("Not enough rows".into()));
        assert_eq!(err.to_string(), "Not enough rows");
    }
}
