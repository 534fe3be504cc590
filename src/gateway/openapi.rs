//! OpenAPI / Swagger UI Documentation
//!
//! - Swagger UI: `http://localhost:8080/docs`
//! - OpenAPI JSON: `http://localhost:8080/api-docs/openapi.json`

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::gateway::handlers::accounts::{
    CreateAccountRequest, DeleteAccountResponse, UpdateAccountRequest,
};
use crate::gateway::handlers::transfers::TransferRequest;
use crate::gateway::handlers::users::{
    CreateUserRequest, LoginUserRequest, LoginUserResponse, RenewAccessTokenRequest,
    RenewAccessTokenResponse, UserResponse,
};
use crate::gateway::handlers::HealthResponse;
use crate::ledger::{Account, Entry, Transfer, TransferResult};

/// Bearer access token issued by `/api/v1/users/login`
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Access token from /api/v1/users/login"))
                        .build(),
                ),
            );
        }
    }
}

/// Main API Documentation struct
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Ledger Bank API",
        version = "1.0.0",
        description = "Accounts, users and atomic fund transfers over a double-entry ledger.",
        license(
            name = "MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::health::health_check,
        crate::gateway::handlers::users::create_user,
        crate::gateway::handlers::users::login_user,
        crate::gateway::handlers::users::renew_access_token,
        crate::gateway::handlers::accounts::create_account,
        crate::gateway::handlers::accounts::get_account,
        crate::gateway::handlers::accounts::list_accounts,
        crate::gateway::handlers::accounts::update_account,
        crate::gateway::handlers::accounts::delete_account,
        crate::gateway::handlers::transfers::create_transfer,
    ),
    components(
        schemas(
            HealthResponse,
            CreateUserRequest,
            UserResponse,
            LoginUserRequest,
            LoginUserResponse,
            RenewAccessTokenRequest,
            RenewAccessTokenResponse,
            CreateAccountRequest,
            UpdateAccountRequest,
            DeleteAccountResponse,
            TransferRequest,
            Account,
            Entry,
            Transfer,
            TransferResult,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Users", description = "Registration, login and token renewal"),
        (name = "Accounts", description = "Account management (auth required)"),
        (name = "Transfers", description = "Atomic fund transfers (auth required)"),
        (name = "System", description = "Health checks and system info")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use utoipa::OpenApi;

    #[test]
    fn test_openapi_spec_generates() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "Ledger Bank API");
        assert_eq!(spec.info.version, "1.0.0");
    }

    #[test]
    fn test_openapi_json_serializable() {
        let json = ApiDoc::openapi().to_json().unwrap();
        assert!(json.contains("Ledger Bank API"));
        assert!(json.contains("bearer_auth"));
    }

    #[test]
    fn test_endpoints_registered() {
        let paths = ApiDoc::openapi().paths;
        for path in [
            "/api/v1/health",
            "/api/v1/users",
            "/api/v1/users/login",
            "/api/v1/tokens/renew_access",
            "/api/v1/accounts",
            "/api/v1/accounts/{id}",
            "/api/v1/transfers",
        ] {
            assert!(paths.paths.contains_key(path), "missing {path}");
        }
    }
}
