// handlers/mod.rs - Two-tier handler layout
//
// Public (no auth) → Protected (token admission, optionally account admission)
pub mod public;    // No authentication required (/, /health, /auth/*)
pub mod protected; // Token required (/api/*)

/*
ADMISSION LEVELS:

Protected routes sit behind one of two middleware stages:

1. jwt_auth_middleware
   - Reads the token from the auth cookie, then `Authorization: Bearer`
   - Injects AuthUser { user_id }
   - Used by routes that only need the caller's identity

2. validate_account_middleware
   - Runs the same token check first, then loads the account record
   - Rejects accounts whose deletion grace period has elapsed
   - Injects AuthUser and AuthenticatedAccount

Every rejection is a 401 with a code of AUTHENTICATION_REQUIRED,
TOKEN_EXPIRED, INVALID_TOKEN or ACCOUNT_NOT_FOUND, so clients can tell
"log in again" apart from "refresh silently".
*/
