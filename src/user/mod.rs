//! Users, sessions and password handling
//!
//! Usernames own accounts; a session backs each issued refresh token.

pub mod models;
pub mod password;
pub mod repository;
pub mod validation;

pub use models::{NewSession, NewUser, Session, User};
pub use password::{PasswordError, check_password, hash_password};
pub use repository::{SessionRepository, UserRepository};
pub use validation::{Currency, ValidationError};
