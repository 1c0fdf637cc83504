// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for metric keys
pub const SIGN_IN_SUCCESS: &str = "auth.sign_in.success";
pub const SIGN_IN_FAILURE: &str = "auth.sign_in.failure";
pub const SIGN_IN_LOCKOUT: &str = "auth.sign_in.lockout";
pub const GATE_REJECTED: &str = "auth.gate.rejected";
pub const TOKEN_REFRESHED: &str = "auth.token.refreshed";
pub const SESSION_CREATED: &str = "session.created";
pub const SESSION_EXPIRED: &str = "session.expired";
pub const SESSION_ACTIVE: &str = "session.active";
pub const CACHE_HIT: &str = "cache.hit";
pub const CACHE_MISS: &str = "cache.miss";
pub const CACHE_ERROR: &str = "cache.error";
pub const CACHE_INVALIDATE_FAILED: &str = "cache.invalidate.failed";
