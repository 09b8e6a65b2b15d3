//! Application configuration.
//!
//! Configuration is layered with [`figment`]:
//!
//! 1. the YAML file named by `-f/--config` (default `config.yaml`)
//! 2. `MACHPLAN_`-prefixed environment variables, nested keys split on `__`
//!    (e.g. `MACHPLAN_AUTH__JWT_SECRET`, `MACHPLAN_STORAGE__RETENTION=12h`)
//! 3. the conventional raw variables `DATABASE_URL` and `DEEPINFRA_API_KEY`
//!
//! Every section has defaults, so an empty file is a valid starting point once a
//! JWT secret is supplied.

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::Error;

/// Environment variable holding the inference provider key.
pub const INFERENCE_API_KEY_VAR: &str = "DEEPINFRA_API_KEY";

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "MACHPLAN_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub cors: CorsConfig,
    pub inference: InferenceConfig,
    pub storage: StorageConfig,
    /// Plain-text log file, written when `enable_file_logging` is set and served by `GET /api/log`
    pub log_file: PathBuf,
    pub enable_file_logging: bool,
    /// Expose Prometheus metrics at `/internal/metrics`
    pub enable_metrics: bool,
    /// Export traces over OTLP (configured through the standard `OTEL_*` variables)
    pub enable_otel_export: bool,
}

/// PostgreSQL connection settings.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Connection string; usually supplied through `DATABASE_URL`
    pub url: String,
    pub pool: PoolSettings,
}

/// Connection pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolSettings {
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of idle connections to maintain
    pub min_connections: u32,
    /// Maximum time to wait for a connection (seconds)
    pub acquire_timeout_secs: u64,
    /// Time before idle connections are closed (seconds, 0 = never)
    pub idle_timeout_secs: u64,
    /// Maximum lifetime of a connection (seconds, 0 = never)
    pub max_lifetime_secs: u64,
}

/// Verification of tokens issued by the external identity service.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// HS256 secret shared with the identity service
    pub jwt_secret: Option<String>,
    /// Accept `Authorization: Bearer <jwt>`
    pub bearer_enabled: bool,
    /// Accept the JWT from this cookie; `None` disables cookie auth
    pub cookie_name: Option<String>,
    pub proxy_header: ProxyHeaderAuthConfig,
}

/// Trusted reverse-proxy authentication: the proxy sets a header carrying the user UUID.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProxyHeaderAuthConfig {
    pub enabled: bool,
    pub header_name: String,
}

/// CORS (Cross-Origin Resource Sharing) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins for CORS requests
    pub allowed_origins: Vec<CorsOrigin>,
    /// Allow credentials (cookies) in CORS requests
    pub allow_credentials: bool,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

/// CORS origin specification.
///
/// Can be either a wildcard (`*`) to allow all origins, or a specific URL.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CorsOrigin {
    /// Allow all origins (`*`)
    #[serde(deserialize_with = "parse_wildcard")]
    Wildcard,
    /// Specific origin URL (e.g., `https://app.example.com`)
    #[serde(deserialize_with = "parse_url")]
    Url(Url),
}

fn parse_wildcard<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    if s == "*" {
        Ok(())
    } else {
        Err(serde::de::Error::custom("Expected '*'"))
    }
}

fn parse_url<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Url::parse(&s).map_err(serde::de::Error::custom)
}

/// OpenAI-compatible chat-completion provider.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct InferenceConfig {
    /// Base URL; `/chat/completions` is appended
    pub base_url: Url,
    /// Provider key; usually supplied through `DEEPINFRA_API_KEY`
    pub api_key: Option<String>,
    pub model: String,
    /// Upper bound on a single completion request
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

/// Drawing storage and retention.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory holding uploaded drawings
    pub path: PathBuf,
    /// How long an uploaded drawing is kept; `null` keeps drawings forever
    #[serde(with = "humantime_serde")]
    pub retention: Option<Duration>,
    /// How often the retention sweeper runs
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
    /// Largest accepted upload, in bytes
    pub max_upload_size: u64,
    /// Prefix for `drawing_url` values handed to the model (e.g. `https://machplan.example.com`).
    /// The model provider must be able to fetch this URL for image analysis.
    pub public_base_url: Option<Url>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            cors: CorsConfig::default(),
            inference: InferenceConfig::default(),
            storage: StorageConfig::default(),
            log_file: PathBuf::from("server.log"),
            enable_file_logging: true,
            enable_metrics: false,
            enable_otel_export: false,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost:5432/machplan".to_string(),
            pool: PoolSettings::default(),
        }
    }
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 0,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,  // 10 minutes
            max_lifetime_secs: 1800, // 30 minutes
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            bearer_enabled: true,
            cookie_name: Some("sb-access-token".to_string()),
            proxy_header: ProxyHeaderAuthConfig::default(),
        }
    }
}

impl Default for ProxyHeaderAuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            header_name: "x-machplan-user".to_string(),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![CorsOrigin::Url(Url::parse("http://localhost:3000").expect("static URL"))],
            allow_credentials: true,
            max_age: Some(3600), // Cache preflight for 1 hour
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse("https://api.deepinfra.com/v1/openai").expect("static URL"),
            api_key: None,
            model: "meta-llama/Meta-Llama-3.1-70B-Instruct".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("drawings"),
            retention: Some(Duration::from_secs(24 * 60 * 60)),
            sweep_interval: Duration::from_secs(10 * 60),
            max_upload_size: 20 * 1024 * 1024,
            public_base_url: None,
        }
    }
}

const REDACTED: &str = "[redacted]";

fn redact(secret: &Option<String>) -> Option<&'static str> {
    secret.as_ref().map(|_| REDACTED)
}

/// A connection string with any password replaced.
fn redact_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) if parsed.password().is_some() => {
            let _ = parsed.set_password(Some(REDACTED));
            parsed.to_string()
        }
        Ok(_) => url.to_string(),
        Err(_) => REDACTED.to_string(),
    }
}

// Configuration is logged at startup; secrets stay out of the log file `/api/log` serves.
impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &redact_url(&self.url))
            .field("pool", &self.pool)
            .finish()
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &redact(&self.jwt_secret))
            .field("bearer_enabled", &self.bearer_enabled)
            .field("cookie_name", &self.cookie_name)
            .field("proxy_header", &self.proxy_header)
            .finish()
    }
}

impl std::fmt::Debug for InferenceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Config {
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        let token_auth = self.auth.bearer_enabled || self.auth.cookie_name.is_some();
        if token_auth && self.auth.jwt_secret.as_deref().is_none_or(str::is_empty) {
            return Err(Error::Internal {
                operation: "Config validation: token authentication is enabled but auth.jwt_secret is not configured. \
                 Set MACHPLAN_AUTH__JWT_SECRET or add auth.jwt_secret to the config file."
                    .to_string(),
            });
        }

        if !token_auth && !self.auth.proxy_header.enabled {
            return Err(Error::Internal {
                operation: "Config validation: no authentication method is enabled".to_string(),
            });
        }

        if self.storage.max_upload_size == 0 {
            return Err(Error::Internal {
                operation: "Config validation: storage.max_upload_size must be greater than zero".to_string(),
            });
        }

        if self.storage.sweep_interval < Duration::from_secs(1) {
            return Err(Error::Internal {
                operation: "Config validation: storage.sweep_interval must be at least 1s".to_string(),
            });
        }

        let has_wildcard = self.cors.allowed_origins.iter().any(|origin| matches!(origin, CorsOrigin::Wildcard));
        if has_wildcard && self.cors.allow_credentials {
            return Err(Error::Internal {
                operation: "Config validation: CORS cannot use wildcard origin '*' with allow_credentials=true. Specify explicit origins."
                    .to_string(),
            });
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            .merge(Yaml::file(&args.config))
            .merge(Env::prefixed("MACHPLAN_").ignore(&["config"]).split("__"))
            .merge(Env::raw().only(&["DATABASE_URL"]).map(|_| "database.url".into()))
            .merge(Env::raw().only(&[INFERENCE_API_KEY_VAR]).map(|_| "inference.api_key".into()))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
