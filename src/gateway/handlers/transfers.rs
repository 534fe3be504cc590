//! Transfer handler
//!
//! Checks what only the HTTP layer knows (currency, ownership), then hands
//! the movement itself to the transfer engine.

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::super::state::AppState;
use super::super::types::{ApiError, ApiResult, error_codes, ok};
use super::accounts::not_owner;
use crate::ledger::{Account, CallContext, TransferParams, TransferResult};
use crate::token::Payload;
use crate::user::Currency;

/// Correlation id header, echoed into every log line of the transfer
pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Deserialize, ToSchema)]
pub struct TransferRequest {
    #[schema(example = 1)]
    pub from_account_id: i64,
    #[schema(example = 2)]
    pub to_account_id: i64,
    #[schema(example = 10)]
    pub amount: i64,
    #[schema(example = "USD")]
    pub currency: String,
}

impl TransferRequest {
    fn validate(&self) -> Result<Currency, ApiError> {
        if self.from_account_id < 1 || self.to_account_id < 1 {
            return Err(ApiError::bad_request("account ids must be at least 1"));
        }
        if self.amount <= 0 {
            return Err(ApiError::bad_request("amount must be greater than zero"));
        }
        Ok(self.currency.parse()?)
    }
}

/// Caller-supplied request id if it parses as a UUID, otherwise a fresh one
fn request_id(headers: &HeaderMap) -> Uuid {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())
        .unwrap_or_else(Uuid::new_v4)
}

/// Engine call context: request id from the headers, configured deadline
pub(crate) fn call_context(state: &AppState, headers: &HeaderMap) -> CallContext {
    let ctx = CallContext::new().with_request_id(request_id(headers));
    match state.transfer_timeout {
        Some(limit) => ctx.with_timeout(limit),
        None => ctx,
    }
}

/// Account must exist and be held in `currency`
async fn account_in_currency(
    state: &AppState,
    id: i64,
    currency: Currency,
) -> Result<Account, ApiError> {
    let account = state
        .queries
        .get_account(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Account not found: {}", id)))?;

    if account.currency != currency.as_str() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            error_codes::CURRENCY_MISMATCH,
            format!(
                "Account [{}] currency mismatch: {} vs {}",
                id, account.currency, currency
            ),
        ));
    }
    Ok(account)
}

/// Move money from one of the caller's accounts to any account
#[utoipa::path(
    post,
    path = "/api/v1/transfers",
    request_body = TransferRequest,
    params(("x-request-id" = Option<String>, Header, description = "Correlation id (UUID)")),
    responses(
        (status = 200, description = "Transfer committed", body = TransferResult),
        (status = 400, description = "Invalid parameters or currency mismatch"),
        (status = 401, description = "Source account is not the caller's"),
        (status = 404, description = "Account not found"),
        (status = 500, description = "Transfer rolled back"),
        (status = 503, description = "Transient store failure; safe to retry"),
        (status = 504, description = "Transfer timed out and was rolled back")
    ),
    security(("bearer_auth" = [])),
    tag = "Transfers"
)]
pub async fn create_transfer(
    State(state): State<Arc<AppState>>,
    Extension(payload): Extension<Payload>,
    headers: HeaderMap,
    Json(req): Json<TransferRequest>,
) -> ApiResult<TransferResult> {
    let currency = req.validate()?;

    let from = account_in_currency(&state, req.from_account_id, currency).await?;
    if from.owner != payload.username {
        return not_owner().into_err();
    }
    account_in_currency(&state, req.to_account_id, currency).await?;

    let ctx = call_context(&state, &headers);

    let result = state
        .engine
        .execute(
            &ctx,
            TransferParams::new(req.from_account_id, req.to_account_id, req.amount),
        )
        .await?;
    ok(result)
}
