pub mod api_key;
pub mod clock;
pub mod jwt;
pub mod password;
pub mod rate_limit;
pub mod session;
pub mod strategy;
pub mod token_generator;
pub mod verifier;

pub use api_key::ApiKeyAuth;
pub use password::hash_password_secure;
pub use rate_limit::AuthRateLimiter;
pub use strategy::{AuthStrategy, IssuedProof, TokenRefresher};
pub use verifier::StaticVerifier;
