use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use super::state::AppState;
use super::types::{ApiError, error_codes};
use crate::token::TokenMaker;

/// Require `Authorization: Bearer <access token>` and expose the verified
/// [`Payload`](crate::token::Payload) to handlers as an extension.
pub async fn bearer_auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers())?;
    let payload = state.token_maker.verify_token(token)?;

    request.extensions_mut().insert(payload);
    Ok(next.run(request).await)
}

/// Extract the token from a `Bearer` authorization header. The scheme is
/// matched case-insensitively.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            ApiError::new(
                StatusCode::UNAUTHORIZED,
                error_codes::MISSING_AUTH,
                "Missing Authorization header",
            )
        })?;

    let mut fields = auth_header.split_whitespace();
    match (fields.next(), fields.next(), fields.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        (Some(scheme), Some(_), None) => Err(ApiError::unauthorized(format!(
            "Unsupported authorization type: {}",
            scheme
        ))),
        _ => Err(ApiError::unauthorized("Invalid authorization header format")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_extracted() {
        assert_eq!(bearer_token(&headers("Bearer abc.def")).unwrap(), "abc.def");
        assert_eq!(bearer_token(&headers("bearer abc")).unwrap(), "abc");
    }

    #[test]
    fn test_missing_header() {
        let err = bearer_token(&HeaderMap::new()).unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.code, error_codes::MISSING_AUTH);
    }

    #[test]
    fn test_malformed_header() {
        for value in ["Bearer", "abc", "Bearer a b"] {
            let err = bearer_token(&headers(value)).unwrap_err();
            assert_eq!(err.code, error_codes::AUTH_FAILED, "{value}");
        }

        let err = bearer_token(&headers("Basic dXNlcjpwYXNz")).unwrap_err();
        assert!(err.msg.contains("Basic"));
    }
}
