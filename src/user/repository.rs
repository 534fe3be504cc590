//! Repository layer for users and sessions

use sqlx::PgPool;
use uuid::Uuid;

use super::models::{NewSession, NewUser, Session, User};
use crate::ledger::StoreError;

/// User repository
pub struct UserRepository;

impl UserRepository {
    /// Insert a user. A taken username or email fails with
    /// `StoreError::UniqueViolation`.
    pub async fn create(pool: &PgPool, user: &NewUser) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, hashed_password, full_name, email)
            VALUES ($1, $2, $3, $4)
            RETURNING username, hashed_password, full_name, email, password_changed_at, created_at
            "#,
        )
        .bind(&user.username)
        .bind(&user.hashed_password)
        .bind(&user.full_name)
        .bind(&user.email)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    pub async fn get_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"SELECT username, hashed_password, full_name, email, password_changed_at, created_at
               FROM users WHERE username = $1"#,
        )
        .bind(username)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }
}

/// Session repository
pub struct SessionRepository;

impl SessionRepository {
    pub async fn create(pool: &PgPool, session: &NewSession) -> Result<Session, StoreError> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (id, username, refresh_token, user_agent, client_ip, is_blocked, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, username, refresh_token, user_agent, client_ip, is_blocked, expires_at, created_at
            "#,
        )
        .bind(session.id)
        .bind(&session.username)
        .bind(&session.refresh_token)
        .bind(&session.user_agent)
        .bind(&session.client_ip)
        .bind(session.is_blocked)
        .bind(session.expires_at)
        .fetch_one(pool)
        .await?;

        Ok(session)
    }

    pub async fn get(pool: &PgPool, id: Uuid) -> Result<Option<Session>, StoreError> {
        let session = sqlx::query_as::<_, Session>(
            r#"SELECT id, username, refresh_token, user_agent, client_ip, is_blocked, expires_at, created_at
               FROM sessions WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(session)
    }
}
