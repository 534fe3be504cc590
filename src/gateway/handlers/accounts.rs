//! Account handlers. Every route acts on the caller's own accounts only.

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::super::state::AppState;
use super::super::types::{ApiError, ApiResult, error_codes, ok};
use super::transfers::call_context;
use crate::ledger::Account;
use crate::token::Payload;
use crate::user::Currency;

pub const MIN_PAGE_SIZE: i64 = 5;
pub const MAX_PAGE_SIZE: i64 = 10;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAccountRequest {
    #[schema(example = "USD")]
    pub currency: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListAccountsQuery {
    /// 1-based page number
    pub page_id: i64,
    /// 5 to 10
    pub page_size: i64,
}

impl ListAccountsQuery {
    /// (limit, offset) after range checks
    pub fn limit_offset(&self) -> Result<(i64, i64), ApiError> {
        if self.page_id < 1 {
            return Err(ApiError::bad_request("page_id must be at least 1"));
        }
        if !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(ApiError::bad_request(format!(
                "page_size must be between {} and {}",
                MIN_PAGE_SIZE, MAX_PAGE_SIZE
            )));
        }
        let offset = (self.page_id - 1)
            .checked_mul(self.page_size)
            .ok_or_else(|| ApiError::bad_request("page_id out of range"))?;
        Ok((self.page_size, offset))
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateAccountRequest {
    pub id: i64,
    #[schema(example = 1000)]
    pub balance: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteAccountResponse {
    pub id: i64,
}

fn check_id(id: i64) -> Result<(), ApiError> {
    if id < 1 {
        return Err(ApiError::bad_request("id must be at least 1"));
    }
    Ok(())
}

pub(crate) fn not_owner() -> ApiError {
    ApiError::new(
        StatusCode::UNAUTHORIZED,
        error_codes::NOT_OWNER,
        "Account doesn't belong to the authenticated user",
    )
}

/// Load an account the caller owns
async fn owned_account(
    state: &AppState,
    payload: &Payload,
    id: i64,
) -> Result<Account, ApiError> {
    check_id(id)?;
    let account = state
        .queries
        .get_account(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Account not found: {}", id)))?;

    if account.owner != payload.username {
        return Err(not_owner());
    }
    Ok(account)
}

/// Open an account for the caller with zero balance
#[utoipa::path(
    post,
    path = "/api/v1/accounts",
    request_body = CreateAccountRequest,
    responses(
        (status = 200, description = "Account created", body = Account),
        (status = 400, description = "Unsupported currency"),
        (status = 401, description = "Authentication failed"),
        (status = 403, description = "Caller already has an account in this currency")
    ),
    security(("bearer_auth" = [])),
    tag = "Accounts"
)]
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    Extension(payload): Extension<Payload>,
    Json(req): Json<CreateAccountRequest>,
) -> ApiResult<Account> {
    let currency: Currency = req.currency.parse()?;

    let account = state
        .queries
        .create_account(&payload.username, currency.as_str(), 0)
        .await?;

    tracing::info!(account_id = account.id, owner = %account.owner, %currency, "Account created");
    ok(account)
}

#[utoipa::path(
    get,
    path = "/api/v1/accounts/{id}",
    params(("id" = i64, Path, description = "Account id")),
    responses(
        (status = 200, description = "Account", body = Account),
        (status = 401, description = "Not the caller's account"),
        (status = 404, description = "Account not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Accounts"
)]
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    Extension(payload): Extension<Payload>,
    Path(id): Path<i64>,
) -> ApiResult<Account> {
    ok(owned_account(&state, &payload, id).await?)
}

#[utoipa::path(
    get,
    path = "/api/v1/accounts",
    params(ListAccountsQuery),
    responses(
        (status = 200, description = "The caller's accounts, ordered by id", body = Vec<Account>),
        (status = 400, description = "Invalid paging parameters")
    ),
    security(("bearer_auth" = [])),
    tag = "Accounts"
)]
pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
    Extension(payload): Extension<Payload>,
    Query(query): Query<ListAccountsQuery>,
) -> ApiResult<Vec<Account>> {
    let (limit, offset) = query.limit_offset()?;
    let accounts = state
        .queries
        .list_accounts(&payload.username, limit, offset)
        .await?;
    ok(accounts)
}

/// Set an account balance (administrative correction). The difference is
/// booked as an entry, so the balance still equals the entry sum.
#[utoipa::path(
    patch,
    path = "/api/v1/accounts",
    request_body = UpdateAccountRequest,
    responses(
        (status = 200, description = "Updated account", body = Account),
        (status = 400, description = "Invalid parameters"),
        (status = 401, description = "Not the caller's account"),
        (status = 404, description = "Account not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Accounts"
)]
pub async fn update_account(
    State(state): State<Arc<AppState>>,
    Extension(payload): Extension<Payload>,
    headers: HeaderMap,
    Json(req): Json<UpdateAccountRequest>,
) -> ApiResult<Account> {
    if req.balance < 0 {
        return ApiError::bad_request("balance must not be negative").into_err();
    }
    owned_account(&state, &payload, req.id).await?;

    let adjustment = state
        .engine
        .adjust_balance(&call_context(&state, &headers), req.id, req.balance)
        .await?;
    ok(adjustment.account)
}

#[utoipa::path(
    delete,
    path = "/api/v1/accounts/{id}",
    params(("id" = i64, Path, description = "Account id")),
    responses(
        (status = 200, description = "Account deleted", body = DeleteAccountResponse),
        (status = 401, description = "Not the caller's account"),
        (status = 403, description = "Account still referenced by entries or transfers"),
        (status = 404, description = "Account not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Accounts"
)]
pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    Extension(payload): Extension<Payload>,
    Path(id): Path<i64>,
) -> ApiResult<DeleteAccountResponse> {
    owned_account(&state, &payload, id).await?;
    state.queries.delete_account(id).await?;

    tracing::info!(account_id = id, "Account deleted");
    ok(DeleteAccountResponse { id })
}
