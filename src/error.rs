use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use crate::scraper::ScrapeError;

#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    BadRequest(String),
    BadGateway(String),
    GatewayTimeout(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg).into_response(),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg).into_response(),
            ApiError::GatewayTimeout(msg) => (StatusCode::GATEWAY_TIMEOUT, msg).into_response(),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg).into_response(),
        }
    }
}

impl From<ScrapeError> for ApiError {
    fn from(value: ScrapeError) -> Self {
        match value {
            ScrapeError::InvalidArgument(_) | ScrapeError::DateParse(_) => {
                ApiError::BadRequest(value.to_string())
            }
            ScrapeError::Http(err) => {
                error!("HTTP error: {err}");
                ApiError::BadGateway("Failed to fetch data from hmtpk.ru".into())
            }
            ScrapeError::Cancelled => ApiError::GatewayTimeout(value.to_string()),
            ScrapeError::Url(_)
            | ScrapeError::Background(_)
            | ScrapeError::Parse(_)
            | ScrapeError::UnknownMonth(_) => {
                error!("scrape failed: {value}");
                ApiError::Internal(value.to_string())
            }
        }
    }
}
