pub mod auth;
pub mod response;
pub mod validate_account;

pub use auth::{authenticate, extract_token, jwt_auth_middleware, AuthRejection, AuthUser};
pub use response::{ApiResponse, ApiResult};
pub use validate_account::{resolve_account, validate_account_middleware, AuthenticatedAccount};
