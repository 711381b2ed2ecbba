use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;

use crate::error::ApiError;
use crate::settings::Settings;

/// Bearer header wins; the `token` query parameter is for clients that cannot set headers.
pub fn verify_token(
    settings: &Settings,
    auth: Option<Authorization<Bearer>>,
    query_token: Option<&str>,
) -> Result<(), ApiError> {
    let provided = match &auth {
        Some(header) => Some(header.token()),
        None => query_token,
    };

    if provided.is_some_and(|token| token == settings.auth_token) {
        Ok(())
    } else {
        Err(ApiError::Unauthorized("Invalid authentication token".into()))
    }
}
