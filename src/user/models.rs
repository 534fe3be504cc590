//! User and session rows

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Registered user. `hashed_password` is an argon2 PHC string.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    pub username: String,
    pub hashed_password: String,
    pub full_name: String,
    pub email: String,
    pub password_changed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Parameters for inserting a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub hashed_password: String,
    pub full_name: String,
    pub email: String,
}

/// Login session backing a refresh token. `id` is the refresh token's id.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Session {
    pub id: Uuid,
    pub username: String,
    pub refresh_token: String,
    pub user_agent: String,
    pub client_ip: String,
    pub is_blocked: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Parameters for inserting a session
#[derive(Debug, Clone)]
pub struct NewSession {
    pub id: Uuid,
    pub username: String,
    pub refresh_token: String,
    pub user_agent: String,
    pub client_ip: String,
    pub is_blocked: bool,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Why this session cannot back `refresh_token` for `username` at `now`,
    /// or `None` if it can.
    pub fn rejection(
        &self,
        username: &str,
        refresh_token: &str,
        now: DateTime<Utc>,
    ) -> Option<&'static str> {
        if self.is_blocked {
            Some("blocked session")
        } else if self.username != username {
            Some("incorrect session user")
        } else if self.refresh_token != refresh_token {
            Some("mismatched session token")
        } else if now > self.expires_at {
            Some("expired session")
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session() -> Session {
        let now = Utc::now();
        Session {
            id: Uuid::new_v4(),
            username: "alice".into(),
            refresh_token: "token".into(),
            user_agent: "curl/8".into(),
            client_ip: "127.0.0.1".into(),
            is_blocked: false,
            expires_at: now + Duration::hours(1),
            created_at: now,
        }
    }

    #[test]
    fn test_session_accepts_matching_token() {
        assert_eq!(session().rejection("alice", "token", Utc::now()), None);
    }

    #[test]
    fn test_session_rejections() {
        let now = Utc::now();

        let mut blocked = session();
        blocked.is_blocked = true;
        assert_eq!(
            blocked.rejection("alice", "token", now),
            Some("blocked session")
        );

        assert_eq!(
            session().rejection("bob", "token", now),
            Some("incorrect session user")
        );
        assert_eq!(
            session().rejection("alice", "other", now),
            Some("mismatched session token")
        );
        assert_eq!(
            session().rejection("alice", "token", now + Duration::hours(2)),
            Some("expired session")
        );
    }
}
