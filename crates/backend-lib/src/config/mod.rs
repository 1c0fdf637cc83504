// ============================
// crates/backend-lib/src/config/mod.rs
// ============================
//! Configuration management.
//!
//! Settings are layered: built-in defaults, then a TOML file, then
//! environment variables prefixed `RECIPEBOX_` (nested keys joined with
//! `__`, e.g. `RECIPEBOX_AUTH__STRATEGY=jwt`).
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use thiserror::Error;

/// Default configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "recipebox.toml";

const MIN_JWT_SECRET_LEN: usize = 32;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// Application settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Log level used when `RUST_LOG` is unset
    pub log_level: String,
    pub log_format: LogFormat,
    pub auth: AuthSettings,
    pub storage: StorageSettings,
    pub cache: CacheSettings,
    pub cors: CorsSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Which credential scheme guards the protected routes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStrategyKind {
    ApiKey,
    Session,
    Jwt,
}

impl fmt::Display for AuthStrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AuthStrategyKind::ApiKey => "api_key",
            AuthStrategyKind::Session => "session",
            AuthStrategyKind::Jwt => "jwt",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifierKind {
    /// A single configured username/password pair
    Static,
    /// Users held in the durable store with scrypt hashes
    Users,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStoreKind {
    Memory,
    Redis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    File,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackendKind {
    Memory,
    Redis,
}

/// Authentication settings
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub strategy: AuthStrategyKind,
    /// Static key for the api-key strategy
    pub api_key: Option<String>,
    /// HMAC secret for the signed-token strategy
    pub jwt_secret: Option<String>,
    /// Lifetime of a token minted at sign-in
    pub token_ttl_secs: u64,
    /// How close to expiry a token must be before it may be refreshed
    pub refresh_window_secs: u64,
    /// Lifetime of a token minted by refresh
    pub refreshed_ttl_secs: u64,
    pub session_ttl_secs: u64,
    pub session_cookie: String,
    pub session_store: SessionStoreKind,
    /// Mark the session cookie `Secure`
    pub secure_cookies: bool,
    pub verifier: VerifierKind,
    pub static_username: String,
    pub static_password: String,
    /// Consecutive failed sign-ins before a client is locked out
    pub max_failed_attempts: u32,
    pub lockout_secs: u64,
    /// Key the sign-in throttle on `X-Real-IP`/`X-Forwarded-For` instead of
    /// the peer address. Only safe behind a proxy that sets them.
    pub trust_forwarded_headers: bool,
}

impl fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("AuthSettings")
            .field("strategy", &self.strategy)
            .field("api_key", &redact(&self.api_key))
            .field("jwt_secret", &redact(&self.jwt_secret))
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("refresh_window_secs", &self.refresh_window_secs)
            .field("refreshed_ttl_secs", &self.refreshed_ttl_secs)
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("session_cookie", &self.session_cookie)
            .field("session_store", &self.session_store)
            .field("secure_cookies", &self.secure_cookies)
            .field("verifier", &self.verifier)
            .field("static_username", &self.static_username)
            .field("static_password", &"[REDACTED]")
            .field("max_failed_attempts", &self.max_failed_attempts)
            .field("lockout_secs", &self.lockout_secs)
            .field("trust_forwarded_headers", &self.trust_forwarded_headers)
            .finish()
    }
}

/// Durable store settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    /// Root directory of the flat-file store
    pub data_dir: PathBuf,
    /// Deadline for a single store call
    pub timeout_ms: u64,
}

/// Collection cache settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub backend: CacheBackendKind,
    pub redis_url: String,
    pub pool_size: usize,
    /// Expiry of the cached collection; 0 keeps it until invalidated
    pub ttl_secs: u64,
    /// Deadline for a single cache call
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorsSettings {
    pub allowed_origins: Vec<String>,
    pub max_age_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            auth: AuthSettings::default(),
            storage: StorageSettings::default(),
            cache: CacheSettings::default(),
            cors: CorsSettings::default(),
        }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            strategy: AuthStrategyKind::Session,
            api_key: None,
            jwt_secret: None,
            token_ttl_secs: 10 * 60,
            refresh_window_secs: 30,
            refreshed_ttl_secs: 5 * 60,
            session_ttl_secs: 60 * 60 * 24,
            session_cookie: "user_sessions".to_string(),
            session_store: SessionStoreKind::Memory,
            secure_cookies: false,
            verifier: VerifierKind::Static,
            static_username: "admin".to_string(),
            static_password: "password".to_string(),
            max_failed_attempts: 5,
            lockout_secs: 5 * 60,
            trust_forwarded_headers: false,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::File,
            data_dir: PathBuf::from("data"),
            timeout_ms: 5_000,
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::Memory,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            pool_size: 16,
            ttl_secs: 0,
            timeout_ms: 500,
        }
    }
}

impl Default for CorsSettings {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:3000".to_string()],
            max_age_secs: 12 * 60 * 60,
        }
    }
}

impl AuthSettings {
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }

    pub fn refresh_window(&self) -> Duration {
        Duration::from_secs(self.refresh_window_secs)
    }

    pub fn refreshed_ttl(&self) -> Duration {
        Duration::from_secs(self.refreshed_ttl_secs)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn lockout(&self) -> Duration {
        Duration::from_secs(self.lockout_secs)
    }
}

impl StorageSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl CacheSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn ttl(&self) -> Option<Duration> {
        (self.ttl_secs > 0).then(|| Duration::from_secs(self.ttl_secs))
    }
}

impl Settings {
    /// Load from `path` (if present) and the environment
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings: Settings = figment(path.as_ref())
            .extract()
            .map_err(Box::new)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject combinations the server cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(invalid("log_level", format!("unknown level {:?}", self.log_level)));
        }

        let auth = &self.auth;
        match auth.strategy {
            AuthStrategyKind::ApiKey => {
                if auth.api_key.as_deref().map_or(true, str::is_empty) {
                    return Err(invalid("auth.api_key", "required by the api_key strategy"));
                }
            },
            AuthStrategyKind::Jwt => {
                if auth.jwt_secret.as_deref().map_or(true, str::is_empty) {
                    return Err(invalid("auth.jwt_secret", "required by the jwt strategy"));
                }
                if auth.token_ttl_secs == 0 {
                    return Err(invalid("auth.token_ttl_secs", "must be positive"));
                }
                if auth.refreshed_ttl_secs <= auth.refresh_window_secs {
                    return Err(invalid(
                        "auth.refreshed_ttl_secs",
                        format!(
                            "must exceed refresh_window_secs ({}) or refreshed tokens are born refreshable",
                            auth.refresh_window_secs
                        ),
                    ));
                }
            },
            AuthStrategyKind::Session => {
                if auth.session_ttl_secs == 0 {
                    return Err(invalid("auth.session_ttl_secs", "must be positive"));
                }
                if auth.session_cookie.is_empty() {
                    return Err(invalid("auth.session_cookie", "must not be empty"));
                }
            },
        }
        if auth.max_failed_attempts == 0 {
            return Err(invalid("auth.max_failed_attempts", "must be positive"));
        }
        if self.storage.timeout_ms == 0 {
            return Err(invalid("storage.timeout_ms", "must be positive"));
        }
        if self.cache.timeout_ms == 0 {
            return Err(invalid("cache.timeout_ms", "must be positive"));
        }
        if self.cache.pool_size == 0 {
            return Err(invalid("cache.pool_size", "must be positive"));
        }
        Ok(())
    }

    /// Accepted settings that weaken the deployment, for the caller to report
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.auth.strategy == AuthStrategyKind::Jwt {
            if let Some(secret) = self.auth.jwt_secret.as_deref() {
                if secret.len() < MIN_JWT_SECRET_LEN {
                    warnings.push(format!(
                        "auth.jwt_secret is {} characters, shorter than {MIN_JWT_SECRET_LEN}",
                        secret.len()
                    ));
                }
            }
        }
        if self.auth.trust_forwarded_headers {
            warnings.push(
                "auth.trust_forwarded_headers is on; only enable it behind a proxy that overwrites X-Real-IP/X-Forwarded-For"
                    .to_string(),
            );
        }
        warnings
    }
}

/// Provider stack behind [`Settings::load_from`]
pub fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("RECIPEBOX_").split("__"))
}
