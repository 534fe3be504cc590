//! HTTP handlers

pub mod accounts;
pub mod health;
pub mod transfers;
pub mod users;

pub use accounts::{create_account, delete_account, get_account, list_accounts, update_account};
pub use health::{HealthResponse, health_check};
pub use transfers::create_transfer;
pub use users::{create_user, login_user, renew_access_token};
