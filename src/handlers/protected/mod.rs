// handlers/protected/mod.rs - Protected handlers (token admission required)
//
// Security Level: token, or token plus live account record
// Route Prefix: /api/*

pub mod auth; // Session and account endpoints for the signed-in user

pub use auth::*;
