pub mod session;
pub mod whoami;

// Re-export handler functions for use in routing
pub use session::session_get;
pub use session::session_refresh;
pub use whoami::whoami;
