//! Startup configuration, read once from the environment.

use std::env;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use url::Url;

use crate::error::ConfigError;
use crate::notify::DEFAULT_NOTIFY_URL;
use crate::rate_limit::{DEFAULT_LIMIT, DEFAULT_WINDOW_MS};

pub const DEFAULT_PORT: u16 = 8787;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub notify: NotifyConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Request body cap in bytes.
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    Filesystem { dir: PathBuf },
    Memory,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct NotifyConfig {
    pub url: Url,
    pub token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub limit: u64,
    pub window_ms: u64,
    /// Key clients on forwarded headers instead of the peer address.
    pub trust_forwarded_headers: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from any variable source. Blank values count
    /// as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let server = ServerConfig {
            port: parse_var(&var, "PORT", DEFAULT_PORT)?,
            max_upload_bytes: parse_var(&var, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
        };

        let storage = match var("STORAGE_BACKEND").as_deref().map(str::trim) {
            None | Some("fs") => StorageConfig::Filesystem {
                dir: var("STORAGE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(default_storage_dir),
            },
            Some("memory") => StorageConfig::Memory,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    name: "STORAGE_BACKEND",
                    value: other.to_string(),
                    reason: "expected \"fs\" or \"memory\"".to_string(),
                });
            }
        };

        let auth = AuthConfig {
            username: lookup("USERNAME").unwrap_or_default(),
            password: lookup("PASSWORD").unwrap_or_default(),
        };

        let notify = NotifyConfig {
            url: validate_http_url(
                "NOTIFY_URL",
                &var("NOTIFY_URL").unwrap_or_else(|| DEFAULT_NOTIFY_URL.to_string()),
            )?,
            token: var("TOKEN").map(|value| value.trim().to_string()),
        };

        let rate_limit = RateLimitConfig {
            limit: parse_var(&var, "RATE_LIMIT", DEFAULT_LIMIT)?,
            window_ms: parse_var(&var, "RATE_LIMIT_WINDOW_MS", DEFAULT_WINDOW_MS)?,
            trust_forwarded_headers: parse_var(&var, "TRUST_FORWARDED_HEADERS", false)?,
        };
        if rate_limit.window_ms == 0 {
            return Err(ConfigError::InvalidValue {
                name: "RATE_LIMIT_WINDOW_MS",
                value: "0".to_string(),
                reason: "window must be longer than zero".to_string(),
            });
        }

        Ok(Self {
            server,
            storage,
            auth,
            notify,
            rate_limit,
        })
    }

    pub fn bind_address(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.server.port))
    }
}

fn parse_var<T>(
    var: impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|err: T::Err| ConfigError::InvalidValue {
                name,
                value,
                reason: err.to_string(),
            }),
    }
}

fn default_storage_dir() -> PathBuf {
    let mut base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    base.push("cba-gateway");
    base
}

pub fn validate_http_url(name: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let trimmed = raw.trim();
    let invalid = |reason: String| ConfigError::InvalidValue {
        name,
        value: trimmed.to_string(),
        reason,
    };
    let parsed = Url::parse(trimmed).map_err(|err| invalid(err.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(invalid(format!("unsupported scheme {scheme}"))),
    }
}
