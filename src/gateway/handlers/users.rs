//! User registration, login and access token renewal

use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::super::state::AppState;
use super::super::types::{ApiError, ApiResult, error_codes, ok};
use crate::token::TokenMaker;
use crate::user::{
    NewSession, NewUser, SessionRepository, User, UserRepository, check_password, hash_password,
    validation,
};

/// User registration request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = "secret123")]
    pub password: String,
    #[schema(example = "Alice Smith")]
    pub full_name: String,
    #[schema(example = "alice@example.com")]
    pub email: String,
}

/// User as returned by the API; never carries the password hash
#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub password_changed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            username: user.username,
            full_name: user.full_name,
            email: user.email,
            password_changed_at: user.password_changed_at,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginUserRequest {
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = "secret123")]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginUserResponse {
    pub session_id: Uuid,
    pub access_token: String,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_token_expires_at: DateTime<Utc>,
    pub user: UserResponse,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RenewAccessTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RenewAccessTokenResponse {
    pub access_token: String,
    pub access_token_expires_at: DateTime<Utc>,
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUserRequest,
    responses(
        (status = 200, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid parameters"),
        (status = 403, description = "Username or email already taken")
    ),
    tag = "Users"
)]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<UserResponse> {
    validation::validate_username(&req.username)?;
    validation::validate_password(&req.password)?;
    validation::validate_full_name(&req.full_name)?;
    validation::validate_email(&req.email)?;

    let hashed_password = hash_password(&req.password)?;
    let user = UserRepository::create(
        state.db.pool(),
        &NewUser {
            username: req.username,
            hashed_password,
            full_name: req.full_name,
            email: req.email,
        },
    )
    .await?;

    tracing::info!(username = %user.username, "User created");
    ok(user.into())
}

/// Log in and open a session
#[utoipa::path(
    post,
    path = "/api/v1/users/login",
    request_body = LoginUserRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginUserResponse),
        (status = 400, description = "Invalid parameters"),
        (status = 401, description = "Incorrect password"),
        (status = 404, description = "Unknown user")
    ),
    tag = "Users"
)]
pub async fn login_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<LoginUserRequest>,
) -> ApiResult<LoginUserResponse> {
    validation::validate_username(&req.username)?;
    validation::validate_password(&req.password)?;

    let user = UserRepository::get_by_username(state.db.pool(), &req.username)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    check_password(&req.password, &user.hashed_password)?;

    let (access_token, access_payload) = state
        .token_maker
        .create_token(&user.username, state.access_token_duration)?;
    let (refresh_token, refresh_payload) = state
        .token_maker
        .create_token(&user.username, state.refresh_token_duration)?;

    let session = SessionRepository::create(
        state.db.pool(),
        &NewSession {
            id: refresh_payload.id,
            username: user.username.clone(),
            refresh_token: refresh_token.clone(),
            user_agent: header_str(&headers, header::USER_AGENT.as_str()),
            client_ip: client_ip(&headers),
            is_blocked: false,
            expires_at: refresh_payload.expired_at,
        },
    )
    .await?;

    tracing::info!(username = %user.username, session_id = %session.id, "User logged in");
    ok(LoginUserResponse {
        session_id: session.id,
        access_token,
        access_token_expires_at: access_payload.expired_at,
        refresh_token,
        refresh_token_expires_at: refresh_payload.expired_at,
        user: user.into(),
    })
}

/// Exchange a refresh token for a new access token
#[utoipa::path(
    post,
    path = "/api/v1/tokens/renew_access",
    request_body = RenewAccessTokenRequest,
    responses(
        (status = 200, description = "New access token", body = RenewAccessTokenResponse),
        (status = 401, description = "Refresh token or session rejected"),
        (status = 404, description = "Session not found")
    ),
    tag = "Users"
)]
pub async fn renew_access_token(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RenewAccessTokenRequest>,
) -> ApiResult<RenewAccessTokenResponse> {
    let refresh_payload = state.token_maker.verify_token(&req.refresh_token)?;

    let session = SessionRepository::get(state.db.pool(), refresh_payload.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Session not found"))?;

    if let Some(reason) =
        session.rejection(&refresh_payload.username, &req.refresh_token, Utc::now())
    {
        tracing::warn!(session_id = %session.id, reason, "Refresh rejected");
        return ApiError::new(StatusCode::UNAUTHORIZED, error_codes::AUTH_FAILED, reason)
            .into_err();
    }

    let (access_token, access_payload) = state
        .token_maker
        .create_token(&refresh_payload.username, state.access_token_duration)?;

    ok(RenewAccessTokenResponse {
        access_token,
        access_token_expires_at: access_payload.expired_at,
    })
}

fn header_str(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// First hop of `X-Forwarded-For`, else `X-Real-IP`
fn client_ip(headers: &HeaderMap) -> String {
    let forwarded = header_str(headers, "x-forwarded-for");
    match forwarded.split(',').next().map(str::trim) {
        Some(ip) if !ip.is_empty() => ip.to_string(),
        _ => header_str(headers, "x-real-ip"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_client_ip() {
        let mut headers = HeaderMap::new();
        assert_eq!(client_ip(&headers), "");

        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.9"));
        assert_eq!(client_ip(&headers), "10.0.0.9");

        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.5, 10.0.0.1"),
        );
        assert_eq!(client_ip(&headers), "203.0.113.5");
    }

    #[test]
    fn test_user_response_drops_hash() {
        let now = Utc::now();
        let user = User {
            username: "alice".into(),
            hashed_password: "$argon2id$...".into(),
            full_name: "Alice Smith".into(),
            email: "alice@example.com".into(),
            password_changed_at: now,
            created_at: now,
        };
        let json = serde_json::to_value(UserResponse::from(user)).unwrap();
        assert!(json.get("hashed_password").is_none());
        assert_eq!(json["username"], "alice");
    }
}
