//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (prefix: `CATALOG_`, nested keys separated by `__`,
//!    e.g. `CATALOG_SERVICE__PORT=9000`)
//! 2. A TOML file (`./config.toml` by default, or an explicit path)
//! 3. Default values

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::Result;
use crate::models::Role;

/// Environment variable prefix for every configuration key.
pub const ENV_PREFIX: &str = "CATALOG_";

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service identity and listener settings
    pub service: ServiceConfig,

    /// HTTP middleware stack settings
    #[serde(default)]
    pub middleware: MiddlewareConfig,

    /// Credential hashing and token lifetime
    #[serde(default)]
    pub auth: AuthConfig,

    /// Accounts created when the service starts
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name, reported by the health endpoints
    #[serde(default = "default_service_name")]
    pub name: String,

    /// HTTP port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error) or a full `EnvFilter` directive
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Environment (dev, staging, production)
    #[serde(default = "default_environment")]
    pub environment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiddlewareConfig {
    /// Request body size limit in MB
    #[serde(default = "default_body_limit_mb")]
    pub body_limit_mb: usize,

    /// Enable panic recovery middleware
    #[serde(default = "default_true")]
    pub catch_panic: bool,

    /// Enable gzip compression of responses
    #[serde(default = "default_true")]
    pub compression: bool,

    /// Generate and propagate `x-request-id`
    #[serde(default = "default_true")]
    pub request_id: bool,

    /// CORS mode: "permissive", "restrictive" or "disabled"
    #[serde(default = "default_cors_mode")]
    pub cors_mode: String,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            body_limit_mb: default_body_limit_mb(),
            catch_panic: true,
            compression: true,
            request_id: true,
            cors_mode: default_cors_mode(),
        }
    }
}

/// Credential and token settings.
///
/// The Argon2 costs follow the OWASP recommendations for Argon2id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Lifetime of an issued token in seconds; 0 means tokens never expire
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,

    /// Prefix of every issued token
    #[serde(default = "default_token_prefix")]
    pub token_prefix: String,

    /// Minimum password length accepted when hashing
    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,

    /// Argon2 memory cost in KiB
    #[serde(default = "default_memory_cost")]
    pub memory_cost_kib: u32,

    /// Argon2 iterations
    #[serde(default = "default_time_cost")]
    pub time_cost: u32,

    /// Argon2 parallelism degree
    #[serde(default = "default_parallelism")]
    pub parallelism: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl_secs: default_token_ttl(),
            token_prefix: default_token_prefix(),
            min_password_length: default_min_password_length(),
            memory_cost_kib: default_memory_cost(),
            time_cost: default_time_cost(),
            parallelism: default_parallelism(),
        }
    }
}

impl AuthConfig {
    /// Token lifetime, or `None` when tokens never expire
    pub fn token_ttl(&self) -> Option<Duration> {
        (self.token_ttl_secs > 0).then(|| Duration::from_secs(self.token_ttl_secs))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BootstrapConfig {
    #[serde(default)]
    pub users: Vec<BootstrapUser>,
}

/// An account seeded at startup. There is no registration endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapUser {
    pub username: String,

    #[serde(default)]
    pub email: String,

    pub password: String,

    #[serde(default)]
    pub role: Role,
}

fn default_service_name() -> String {
    "catalog-service".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_environment() -> String {
    "dev".to_string()
}

fn default_body_limit_mb() -> usize {
    10
}

fn default_true() -> bool {
    true
}

fn default_cors_mode() -> String {
    "permissive".to_string()
}

fn default_token_ttl() -> u64 {
    10 * 60 * 60
}

fn default_token_prefix() -> String {
    "cat".to_string()
}

fn default_min_password_length() -> usize {
    8
}

fn default_memory_cost() -> u32 {
    65536
}

fn default_time_cost() -> u32 {
    3
}

fn default_parallelism() -> u32 {
    4
}

impl Config {
    /// Load configuration from `./config.toml` (if present) and the environment
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load configuration from a specific TOML file (if present) and the environment
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            tracing::info!(path = %path.display(), "loading configuration file");
        } else {
            tracing::debug!(path = %path.display(), "configuration file not found, using defaults");
        }

        let config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        Ok(config)
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.service.timeout_secs)
    }

    /// Get body limit in bytes
    pub fn body_limit_bytes(&self) -> usize {
        self.middleware.body_limit_mb * 1024 * 1024
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: default_service_name(),
                port: default_port(),
                log_level: default_log_level(),
                timeout_secs: default_timeout(),
                environment: default_environment(),
            },
            middleware: MiddlewareConfig::default(),
            auth: AuthConfig::default(),
            bootstrap: BootstrapConfig::default(),
        }
    }
}
