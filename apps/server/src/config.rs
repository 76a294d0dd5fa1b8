//! Application configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Development default values - NEVER use in production.
pub mod defaults {
    pub const DEV_HOST: &str = "127.0.0.1";
    pub const DEV_PORT: u16 = 8080;
    pub const DEV_DATA_DIR: &str = "./data";

    // S3/MinIO defaults for development
    pub const DEV_S3_ENDPOINT: &str = "http://localhost:9100";
    pub const DEV_S3_REGION: &str = "us-east-1";
    pub const DEV_S3_ACCESS_KEY: &str = "minioadmin";
    pub const DEV_S3_SECRET_KEY: &str = "minioadmin";

    pub const READ_TIMEOUT_SECS: u64 = 30;

    pub const CACHE_MAX_ENTRIES: u64 = 10_000;
    pub const BUILD_DETAILS_TTL_SECS: u64 = 60;
    pub const BUILD_LIST_TTL_SECS: u64 = 60;
    pub const PR_BUILDS_TTL_SECS: u64 = 180;
    pub const BUILD_LOG_TTL_SECS: u64 = 4 * 60 * 60;

    pub const PULL_PREFIX: &str = "/kubernetes-jenkins/pr-logs/pull";
    pub const DEFAULT_ORG: &str = "kubernetes";
    pub const DEFAULT_REPO: &str = "kubernetes";
}

/// Runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Parse environment from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }

    /// Check if this is a development environment.
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    /// Check if this is a production environment.
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Where build artifacts are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Local,
    S3,
}

impl StorageBackend {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "local" | "fs" => Some(Self::Local),
            "s3" => Some(Self::S3),
            _ => None,
        }
    }
}

/// S3 storage configuration. The bucket is the first segment of every path.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// S3 endpoint URL (for MinIO or custom S3-compatible services)
    pub endpoint: Option<String>,
    /// S3 region
    pub region: String,
    /// S3 access key ID
    pub access_key: String,
    /// S3 secret access key
    pub secret_key: String,
}

/// Artifact storage configuration.
#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    /// Root directory of the local backend; `None` when not set in production
    pub data_dir: Option<PathBuf>,
    pub s3: S3Config,
    /// Deadline for a single blob read or listing
    pub read_timeout: Duration,
}

/// Result cache configuration.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub max_entries: u64,
    pub build_details_ttl: Duration,
    pub build_list_ttl: Duration,
    pub pr_builds_ttl: Duration,
    pub build_log_ttl: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: defaults::CACHE_MAX_ENTRIES,
            build_details_ttl: Duration::from_secs(defaults::BUILD_DETAILS_TTL_SECS),
            build_list_ttl: Duration::from_secs(defaults::BUILD_LIST_TTL_SECS),
            pr_builds_ttl: Duration::from_secs(defaults::PR_BUILDS_TTL_SECS),
            build_log_ttl: Duration::from_secs(defaults::BUILD_LOG_TTL_SECS),
        }
    }
}

/// Pull request layout in storage.
#[derive(Debug, Clone)]
pub struct PrSettings {
    /// Storage path under which PR builds live
    pub pull_prefix: String,
    pub default_org: String,
    pub default_repo: String,
}

impl Default for PrSettings {
    fn default() -> Self {
        Self {
            pull_prefix: defaults::PULL_PREFIX.to_string(),
            default_org: defaults::DEFAULT_ORG.to_string(),
            default_repo: defaults::DEFAULT_REPO.to_string(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Runtime environment
    pub environment: Environment,
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    pub storage: StorageSettings,
    pub cache: CacheSettings,
    pub pr: PrSettings,
    /// Base URL of the live execution controller, if any
    pub live_log_url: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In development mode (RUST_ENV=development):
    /// - All variables have sensible defaults
    /// - Only RUST_ENV is required
    ///
    /// In production mode (RUST_ENV=production):
    /// - Storage defaults to S3 and its credentials are required
    /// - The local backend requires an explicit BV_DATA_DIR
    ///
    /// Environment variables:
    /// - `RUST_ENV`: Environment (development/production) - REQUIRED
    /// - `BV_HOST`: Server host (default: 127.0.0.1)
    /// - `BV_PORT`: Server port (default: 8080)
    /// - `BV_STORAGE_BACKEND`: `local` or `s3` (default: local in dev, s3 in prod)
    /// - `BV_DATA_DIR`: Root directory of the local backend (default: ./data in dev)
    /// - `S3_ENDPOINT`, `S3_REGION`, `S3_ACCESS_KEY`, `S3_SECRET_KEY`: S3 backend
    /// - `BV_READ_TIMEOUT_SECS`: Per-read deadline (default: 30)
    /// - `BV_CACHE_ENABLED`: Result cache on/off (default: true)
    /// - `BV_CACHE_MAX_ENTRIES`: Result cache capacity (default: 10000)
    /// - `BV_BUILD_DETAILS_TTL_SECS`, `BV_BUILD_LIST_TTL_SECS`,
    ///   `BV_PR_BUILDS_TTL_SECS`, `BV_BUILD_LOG_TTL_SECS`: cache TTLs
    /// - `BV_LIVE_LOG_URL`: Live execution controller base URL (optional)
    /// - `BV_PULL_PREFIX`, `BV_DEFAULT_ORG`, `BV_DEFAULT_REPO`: PR layout
    pub fn from_env() -> Result<Self, ConfigError> {
        // Parse environment - required
        let env_str = env::var("RUST_ENV").map_err(|_| ConfigError::MissingEnvVar("RUST_ENV"))?;

        let environment = Environment::parse(&env_str).ok_or(ConfigError::InvalidValue(
            "RUST_ENV must be 'development' or 'production'",
        ))?;

        let host = env::var("BV_HOST").unwrap_or_else(|_| defaults::DEV_HOST.to_string());
        let port = parse_var("BV_PORT", defaults::DEV_PORT, "BV_PORT must be a valid port number")?;

        let backend = match env::var("BV_STORAGE_BACKEND") {
            Ok(value) => StorageBackend::parse(&value).ok_or(ConfigError::InvalidValue(
                "BV_STORAGE_BACKEND must be 'local' or 's3'",
            ))?,
            Err(_) if environment.is_production() => StorageBackend::S3,
            Err(_) => StorageBackend::Local,
        };

        let data_dir = env::var("BV_DATA_DIR").ok().map(PathBuf::from).or_else(|| {
            if environment.is_development() {
                Some(PathBuf::from(defaults::DEV_DATA_DIR))
            } else {
                None
            }
        });

        // S3 configuration
        let s3 = S3Config {
            endpoint: env::var("S3_ENDPOINT").ok().or_else(|| {
                if environment.is_development() {
                    Some(defaults::DEV_S3_ENDPOINT.to_string())
                } else {
                    None
                }
            }),
            region: env::var("S3_REGION").unwrap_or_else(|_| defaults::DEV_S3_REGION.to_string()),
            access_key: env::var("S3_ACCESS_KEY")
                .unwrap_or_else(|_| defaults::DEV_S3_ACCESS_KEY.to_string()),
            secret_key: env::var("S3_SECRET_KEY")
                .unwrap_or_else(|_| defaults::DEV_S3_SECRET_KEY.to_string()),
        };

        let read_timeout = Duration::from_secs(parse_var(
            "BV_READ_TIMEOUT_SECS",
            defaults::READ_TIMEOUT_SECS,
            "BV_READ_TIMEOUT_SECS must be a valid number",
        )?);

        let cache = CacheSettings {
            enabled: parse_flag("BV_CACHE_ENABLED", true)?,
            max_entries: parse_var(
                "BV_CACHE_MAX_ENTRIES",
                defaults::CACHE_MAX_ENTRIES,
                "BV_CACHE_MAX_ENTRIES must be a valid number",
            )?,
            build_details_ttl: Duration::from_secs(parse_var(
                "BV_BUILD_DETAILS_TTL_SECS",
                defaults::BUILD_DETAILS_TTL_SECS,
                "BV_BUILD_DETAILS_TTL_SECS must be a valid number",
            )?),
            build_list_ttl: Duration::from_secs(parse_var(
                "BV_BUILD_LIST_TTL_SECS",
                defaults::BUILD_LIST_TTL_SECS,
                "BV_BUILD_LIST_TTL_SECS must be a valid number",
            )?),
            pr_builds_ttl: Duration::from_secs(parse_var(
                "BV_PR_BUILDS_TTL_SECS",
                defaults::PR_BUILDS_TTL_SECS,
                "BV_PR_BUILDS_TTL_SECS must be a valid number",
            )?),
            build_log_ttl: Duration::from_secs(parse_var(
                "BV_BUILD_LOG_TTL_SECS",
                defaults::BUILD_LOG_TTL_SECS,
                "BV_BUILD_LOG_TTL_SECS must be a valid number",
            )?),
        };

        let pr = PrSettings {
            pull_prefix: env::var("BV_PULL_PREFIX")
                .unwrap_or_else(|_| defaults::PULL_PREFIX.to_string()),
            default_org: env::var("BV_DEFAULT_ORG")
                .unwrap_or_else(|_| defaults::DEFAULT_ORG.to_string()),
            default_repo: env::var("BV_DEFAULT_REPO")
                .unwrap_or_else(|_| defaults::DEFAULT_REPO.to_string()),
        };

        let live_log_url = env::var("BV_LIVE_LOG_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let config = Config {
            environment,
            host,
            port,
            storage: StorageSettings {
                backend,
                data_dir,
                s3,
                read_timeout,
            },
            cache,
            pr,
            live_log_url,
        };

        // Validate production configuration
        if environment.is_production() {
            config.validate_production()?;
        }

        Ok(config)
    }

    /// Validate that production configuration does not use development defaults.
    fn validate_production(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        match self.storage.backend {
            StorageBackend::S3 => {
                // Check if using dev S3 credentials in production
                if self.storage.s3.access_key == defaults::DEV_S3_ACCESS_KEY
                    || self.storage.s3.secret_key == defaults::DEV_S3_SECRET_KEY
                {
                    errors.push(
                        "S3_ACCESS_KEY/S3_SECRET_KEY are using development defaults. Set production S3 credentials."
                            .to_string(),
                    );
                }
            }
            StorageBackend::Local => {
                if self.storage.data_dir.is_none() {
                    errors.push(
                        "BV_STORAGE_BACKEND=local requires BV_DATA_DIR to be set explicitly."
                            .to_string(),
                    );
                }
            }
        }

        if self.storage.read_timeout.is_zero() {
            errors.push("BV_READ_TIMEOUT_SECS must be greater than zero.".to_string());
        }

        if !errors.is_empty() {
            return Err(ConfigError::ProductionValidation(errors));
        }

        Ok(())
    }

    /// Get the server bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if running in development mode.
    pub fn is_development(&self) -> bool {
        self.environment.is_development()
    }
}

fn parse_var<T: FromStr>(
    name: &'static str,
    default: T,
    message: &'static str,
) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(message)),
        Err(_) => Ok(default),
    }
}

fn parse_flag(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(name) {
        Ok(value) => parse_bool(&value).ok_or(ConfigError::InvalidValue(
            "boolean variables must be true/false, 1/0 or yes/no",
        )),
        Err(_) => Ok(default),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(&'static str),

    #[error("Production configuration validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    ProductionValidation(Vec<String>),
}
