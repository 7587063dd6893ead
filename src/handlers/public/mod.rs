// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Security Level: None
// Route Prefix: no /api prefix (/, /health, /auth/*)

pub mod logout; // POST /auth/logout - drop the auth cookie
pub mod system; // GET / and GET /health

pub use logout::logout_post;
pub use system::{health, root};
