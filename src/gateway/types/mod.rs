//! Gateway types module
//!
//! ## Submodules
//! - [`response`]: `ApiResponse<T>` envelope and error codes
//! - [`error`]: `ApiError` and the `ApiResult` handler return type

pub mod error;
pub mod response;

pub use error::{ApiError, ApiResult, ok};
pub use response::{ApiResponse, error_codes};
