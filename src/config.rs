/*
 * Responsibility
 * - Read settings from the environment (.env via dotenvy)
 *   - downstream spec sources, refresh cadence, token verification, header shape
 * - Validate them (missing / invalid → startup fails)
 */
use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::services::auth::{DEFAULT_ROLES_CLAIM, TokenAlgorithm};
use crate::services::specs::{DEFAULT_ROLES_EXTENSION, ServiceSource, SourceError};

// One day / ten minutes / one hour
const MAX_REFRESH_INTERVAL_MS: u64 = 24 * 60 * 60 * 1000;
const MAX_FETCH_TIMEOUT_MS: u64 = 10 * 60 * 1000;
const MAX_HTTP_REQUEST_TIMEOUT_SECONDS: u64 = 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn from_value(value: Option<&str>) -> Self {
        match value.unwrap_or("development").to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
    Source(SourceError),
    DuplicateService(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
            ConfigError::Source(e) => write!(f, "invalid configuration: AUTHZ_SPECS: {}", e),
            ConfigError::DuplicateService(name) => {
                write!(f, "invalid configuration: AUTHZ_SPECS: duplicate service '{}'", name)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Source(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SourceError> for ConfigError {
    fn from(e: SourceError) -> Self {
        ConfigError::Source(e)
    }
}

#[derive(Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    // Downstream service descriptions, in precedence order
    pub spec_sources: Vec<ServiceSource>,
    pub refresh_interval: Duration,
    pub fetch_timeout: Duration,
    pub spec_max_bytes: usize,
    pub roles_extension: String,

    pub auth_issuer: String,
    pub auth_audience: Option<String>,
    pub access_jwt_algorithm: TokenAlgorithm,
    // PEM public key, or the shared secret for HS256
    pub access_jwt_key: String,
    pub access_token_leeway_seconds: u64,

    pub roles_claim: String,
    pub identity_role_prefix: String,

    pub http_request_timeout: Duration,
    pub http_body_limit_bytes: usize,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print key material
        f.debug_struct("Config")
            .field("addr", &self.addr)
            .field("app_env", &self.app_env)
            .field("spec_sources", &self.spec_sources)
            .field("refresh_interval", &self.refresh_interval)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("spec_max_bytes", &self.spec_max_bytes)
            .field("roles_extension", &self.roles_extension)
            .field("auth_issuer", &self.auth_issuer)
            .field("auth_audience", &self.auth_audience)
            .field("access_jwt_algorithm", &self.access_jwt_algorithm)
            .field("access_token_leeway_seconds", &self.access_token_leeway_seconds)
            .field("roles_claim", &self.roles_claim)
            .field("identity_role_prefix", &self.identity_role_prefix)
            .field("http_request_timeout", &self.http_request_timeout)
            .field("http_body_limit_bytes", &self.http_body_limit_bytes)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key → value source.
    ///
    /// Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port: u16 = parse_or(&get, "PORT", 3000)?;
        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::from_value(get("APP_ENV").as_deref());

        let spec_sources = parse_sources(get("AUTHZ_SPECS").as_deref().unwrap_or_default())?;
        let refresh_interval = Duration::from_millis(parse_bounded(
            &get,
            "AUTHZ_REFRESH_INTERVAL_MS",
            300_000,
            MAX_REFRESH_INTERVAL_MS,
        )?);
        let fetch_timeout = Duration::from_millis(parse_bounded(
            &get,
            "AUTHZ_FETCH_TIMEOUT_MS",
            10_000,
            MAX_FETCH_TIMEOUT_MS,
        )?);
        let spec_max_bytes = parse_or(&get, "AUTHZ_SPEC_MAX_BYTES", 8 * 1024 * 1024)?;
        if spec_max_bytes == 0 {
            return Err(ConfigError::Invalid("AUTHZ_SPEC_MAX_BYTES"));
        }
        let roles_extension = get("AUTHZ_ROLES_EXTENSION")
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|| DEFAULT_ROLES_EXTENSION.to_string());

        let auth_issuer = get("AUTH_ISSUER").ok_or(ConfigError::Missing("AUTH_ISSUER"))?;
        let auth_audience = get("AUTH_AUDIENCE");

        let access_jwt_algorithm = match get("ACCESS_JWT_ALGORITHM") {
            Some(v) => v
                .parse::<TokenAlgorithm>()
                .map_err(|_| ConfigError::Invalid("ACCESS_JWT_ALGORITHM"))?,
            None => TokenAlgorithm::Rs256,
        };

        let access_jwt_key = if access_jwt_algorithm.uses_shared_secret() {
            get("ACCESS_JWT_SECRET").ok_or(ConfigError::Missing("ACCESS_JWT_SECRET"))?
        } else {
            get("ACCESS_JWT_PUBLIC_KEY_PEM")
                .ok_or(ConfigError::Missing("ACCESS_JWT_PUBLIC_KEY_PEM"))?
                .replace("\\n", "\n")
        };

        let access_token_leeway_seconds = parse_or(&get, "ACCESS_TOKEN_LEEWAY_SECONDS", 60)?;

        let roles_claim = get("AUTH_ROLES_CLAIM")
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|| DEFAULT_ROLES_CLAIM.to_string());
        // Empty is a valid prefix here.
        let identity_role_prefix = lookup("IDENTITY_ROLE_PREFIX")
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|| "ROLE_".to_string());

        let http_request_timeout = Duration::from_secs(parse_bounded(
            &get,
            "HTTP_REQUEST_TIMEOUT_SECONDS",
            30,
            MAX_HTTP_REQUEST_TIMEOUT_SECONDS,
        )?);
        let http_body_limit_bytes = parse_or(&get, "HTTP_BODY_LIMIT_BYTES", 1024 * 1024)?;

        Ok(Self {
            addr,
            app_env,
            spec_sources,
            refresh_interval,
            fetch_timeout,
            spec_max_bytes,
            roles_extension,
            auth_issuer,
            auth_audience,
            access_jwt_algorithm,
            access_jwt_key,
            access_token_leeway_seconds,
            roles_claim,
            identity_role_prefix,
            http_request_timeout,
            http_body_limit_bytes,
        })
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

/// Non-zero and at most `max`.
fn parse_bounded<G>(get: &G, key: &'static str, default: u64, max: u64) -> Result<u64, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match parse_or(get, key, default)? {
        n if n == 0 || n > max => Err(ConfigError::Invalid(key)),
        n => Ok(n),
    }
}

/// `name=url,name=url` → ordered sources. Order is precedence order.
fn parse_sources(raw: &str) -> Result<Vec<ServiceSource>, ConfigError> {
    let mut seen = HashSet::new();
    let mut sources = Vec::new();

    for entry in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (name, url) = entry
            .split_once('=')
            .ok_or(ConfigError::Invalid("AUTHZ_SPECS"))?;
        let source = ServiceSource::new(name, url)?;
        if !seen.insert(source.name().to_string()) {
            return Err(ConfigError::DuplicateService(source.name().to_string()));
        }
        sources.push(source);
    }

    Ok(sources)
}
