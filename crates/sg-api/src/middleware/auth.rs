//! Authentication middleware
//!
//! Provides API key authentication for protected endpoints.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::error::ApiError;
use crate::server::AppState;

/// API key authentication middleware
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // Get API key from header
    let provided = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    check_api_key(provided, state.config.api.key.as_deref())?;

    Ok(next.run(request).await)
}

/// Compare a bearer token against the configured key.
///
/// No key configured means every request is allowed.
pub fn check_api_key(provided: Option<&str>, expected: Option<&str>) -> Result<(), ApiError> {
    match (provided, expected) {
        (_, None) => Ok(()),
        (Some(p), Some(e)) if p == e => Ok(()),
        _ => Err(ApiError::InvalidApiKey),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_api_key_no_key_configured() {
        assert!(check_api_key(None, None).is_ok());
        assert!(check_api_key(Some("any"), None).is_ok());
    }

    #[test]
    fn test_check_api_key_with_key_configured() {
        assert!(check_api_key(None, Some("secret")).is_err());
        assert!(check_api_key(Some("wrong"), Some("secret")).is_err());
        assert!(check_api_key(Some("secret"), Some("secret")).is_ok());
    }

    #[test]
    fn test_check_api_key_errors() {
        assert!(matches!(check_api_key(None, Some("secret")), Err(ApiError::InvalidApiKey)));
        assert!(matches!(
            check_api_key(Some("wrong"), Some("secret")),
            Err(ApiError::InvalidApiKey)
        ));
    }
}
