// ============================
// crates/backend-lib/src/middleware/mod.rs
// ============================
//! Request guards: the authentication gate and sign-in throttling.

pub mod auth;
pub mod rate_limit;

pub use auth::require_auth;
pub use rate_limit::throttle_sign_in;
