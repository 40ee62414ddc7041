//! Gateway configuration.
//!
//! Configuration is loaded once from environment variables at startup and
//! is immutable afterwards. Authentication is modelled as an explicit
//! [`AuthMode`]: tenant settings only exist when auth is enforced.

use common::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use std::collections::HashMap;
use std::env;
use std::fmt;
use thiserror::Error;

/// Default identity provider authority host.
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Issuer host used by v1.0 access tokens.
pub const V1_ISSUER_HOST: &str = "https://sts.windows.net";

/// Default listen port.
pub const DEFAULT_PORT: u16 = 10000;

/// Default JWKS cache TTL in seconds (5 minutes).
pub const DEFAULT_JWKS_CACHE_TTL_SECONDS: u64 = 300;

/// Default minimum interval between refresh-on-miss JWKS fetches.
pub const DEFAULT_JWKS_MIN_REFRESH_SECONDS: u64 = 10;

/// Default path prefixes that bypass authentication.
pub const DEFAULT_EXCLUDED_PATHS: &[&str] = &["/health", "/ready", "/metrics", "/docs"];

/// Whether requests must carry a valid bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMode {
    /// Tokens are validated against the configured tenant.
    Enforced(TenantSettings),

    /// Development mode: every request gets a placeholder identity.
    Disabled,
}

/// Identity provider settings for one tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantSettings {
    /// Directory (tenant) ID.
    pub tenant_id: String,

    /// Application (client) ID of this API.
    pub client_id: String,

    /// Expected `aud` claim.
    pub audience: String,

    /// Accepted `iss` values (v1.0 and v2.0 forms by default).
    pub accepted_issuers: Vec<String>,

    /// JWKS endpoint URL.
    pub jwks_url: String,

    /// Authority host, without trailing slash.
    pub authority_host: String,

    /// Scope clients must request, advertised in 401 instructions.
    pub required_scope: String,

    /// Leeway in seconds for `exp` and `nbf`.
    pub jwt_clock_skew_seconds: u64,

    /// How long a fetched key set stays fresh.
    pub jwks_cache_ttl_seconds: u64,

    /// Floor between refresh-on-miss fetches.
    pub jwks_min_refresh_seconds: u64,
}

impl TenantSettings {
    /// OAuth 2.0 token endpoint for this tenant.
    pub fn token_endpoint(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host, self.tenant_id
        )
    }
}

/// Gateway configuration.
///
/// Contains no secrets: tenant and client IDs are public identifiers.
#[derive(Clone)]
pub struct Config {
    /// Server bind address (default: "127.0.0.1:10000").
    pub bind_address: String,

    /// Authentication mode.
    pub auth: AuthMode,

    /// Path prefixes that bypass the auth gate.
    pub excluded_paths: Vec<String>,

    /// Graceful shutdown drain period in seconds.
    pub drain_seconds: u64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("auth_enabled", &self.auth_enabled())
            .field("auth", &self.auth)
            .field("excluded_paths", &self.excluded_paths)
            .field("drain_seconds", &self.drain_seconds)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid boolean configuration: {0}")]
    InvalidBoolean(String),

    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),

    #[error("Invalid JWKS cache configuration: {0}")]
    InvalidCacheTtl(String),

    #[error("Invalid issuer configuration: {0}")]
    InvalidIssuers(String),

    #[error("Invalid port configuration: {0}")]
    InvalidPort(String),

    #[error("Invalid drain period configuration: {0}")]
    InvalidDrainPeriod(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let auth_enabled = match vars.get("ENABLE_AUTH") {
            Some(value) => parse_bool("ENABLE_AUTH", value)?,
            None => true,
        };

        let auth = if auth_enabled {
            AuthMode::Enforced(tenant_settings_from_vars(vars)?)
        } else {
            AuthMode::Disabled
        };

        let bind_address = match vars.get("BIND_ADDRESS") {
            Some(addr) => addr.clone(),
            None => {
                let port = match vars.get("PORT") {
                    Some(value_str) => value_str.parse::<u16>().map_err(|e| {
                        ConfigError::InvalidPort(format!(
                            "PORT must be a valid port number, got '{}': {}",
                            value_str, e
                        ))
                    })?,
                    None => DEFAULT_PORT,
                };
                format!("127.0.0.1:{}", port)
            }
        };

        let excluded_paths = match vars.get("AUTH_EXCLUDED_PATHS") {
            Some(list) => split_list(list),
            None => DEFAULT_EXCLUDED_PATHS
                .iter()
                .map(|p| p.to_string())
                .collect(),
        };

        let drain_seconds = match vars.get("GATEWAY_DRAIN_SECONDS") {
            Some(value_str) => value_str.parse::<u64>().map_err(|e| {
                ConfigError::InvalidDrainPeriod(format!(
                    "GATEWAY_DRAIN_SECONDS must be a valid non-negative integer, got '{}': {}",
                    value_str, e
                ))
            })?,
            None => 0,
        };

        Ok(Config {
            bind_address,
            auth,
            excluded_paths,
            drain_seconds,
        })
    }

    /// Whether the auth gate validates tokens.
    pub fn auth_enabled(&self) -> bool {
        matches!(self.auth, AuthMode::Enforced(_))
    }
}

fn tenant_settings_from_vars(vars: &HashMap<String, String>) -> Result<TenantSettings, ConfigError> {
    let tenant_id = required_non_empty(vars, "AZURE_TENANT_ID")?;
    let client_id = required_non_empty(vars, "AZURE_CLIENT_ID")?;

    let authority_host = vars
        .get("AUTHORITY_HOST")
        .map(|h| h.trim_end_matches('/').to_string())
        .unwrap_or_else(|| DEFAULT_AUTHORITY_HOST.to_string());

    let audience = vars
        .get("TOKEN_AUDIENCE")
        .filter(|a| !a.is_empty())
        .cloned()
        .unwrap_or_else(|| format!("api://{}", client_id));

    // v1.0 tokens: https://sts.windows.net/{tenant}/
    // v2.0 tokens: https://login.microsoftonline.com/{tenant}/v2.0
    let accepted_issuers = match vars.get("TOKEN_ISSUERS") {
        Some(list) => {
            let issuers = split_list(list);
            if issuers.is_empty() {
                return Err(ConfigError::InvalidIssuers(
                    "TOKEN_ISSUERS must name at least one issuer".to_string(),
                ));
            }
            issuers
        }
        None => vec![
            format!("{}/{}/", V1_ISSUER_HOST, tenant_id),
            format!("{}/{}/v2.0", authority_host, tenant_id),
        ],
    };

    let jwks_url = vars
        .get("JWKS_URL")
        .filter(|u| !u.is_empty())
        .cloned()
        .unwrap_or_else(|| format!("{}/{}/discovery/v2.0/keys", authority_host, tenant_id));

    let required_scope = vars
        .get("REQUIRED_SCOPE")
        .filter(|s| !s.is_empty())
        .cloned()
        .unwrap_or_else(|| format!("api://{}/user_read", client_id));

    // Parse JWT clock skew tolerance with validation
    let jwt_clock_skew_seconds = if let Some(value_str) = vars.get("JWT_CLOCK_SKEW_SECONDS") {
        let value: i64 = value_str.parse().map_err(|e| {
            ConfigError::InvalidJwtClockSkew(format!(
                "JWT_CLOCK_SKEW_SECONDS must be a valid integer, got '{}': {}",
                value_str, e
            ))
        })?;

        if value < 0 {
            return Err(ConfigError::InvalidJwtClockSkew(format!(
                "JWT_CLOCK_SKEW_SECONDS must not be negative, got {}",
                value
            )));
        }

        let value = value.unsigned_abs();
        if value > MAX_CLOCK_SKEW.as_secs() {
            return Err(ConfigError::InvalidJwtClockSkew(format!(
                "JWT_CLOCK_SKEW_SECONDS must not exceed {} seconds, got {}",
                MAX_CLOCK_SKEW.as_secs(),
                value
            )));
        }

        value
    } else {
        DEFAULT_CLOCK_SKEW.as_secs()
    };

    let jwks_cache_ttl_seconds = if let Some(value_str) = vars.get("JWKS_CACHE_TTL_SECONDS") {
        let value: u64 = value_str.parse().map_err(|e| {
            ConfigError::InvalidCacheTtl(format!(
                "JWKS_CACHE_TTL_SECONDS must be a valid positive integer, got '{}': {}",
                value_str, e
            ))
        })?;

        if value == 0 {
            return Err(ConfigError::InvalidCacheTtl(
                "JWKS_CACHE_TTL_SECONDS must be greater than 0".to_string(),
            ));
        }

        value
    } else {
        DEFAULT_JWKS_CACHE_TTL_SECONDS
    };

    let jwks_min_refresh_seconds = match vars.get("JWKS_MIN_REFRESH_SECONDS") {
        Some(value_str) => value_str.parse().map_err(|e| {
            ConfigError::InvalidCacheTtl(format!(
                "JWKS_MIN_REFRESH_SECONDS must be a valid non-negative integer, got '{}': {}",
                value_str, e
            ))
        })?,
        None => DEFAULT_JWKS_MIN_REFRESH_SECONDS,
    };

    Ok(TenantSettings {
        tenant_id,
        client_id,
        audience,
        accepted_issuers,
        jwks_url,
        authority_host,
        required_scope,
        jwt_clock_skew_seconds,
        jwks_cache_ttl_seconds,
        jwks_min_refresh_seconds,
    })
}

fn required_non_empty(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    vars.get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBoolean(format!(
            "{} must be true or false, got '{}'",
            name, value
        ))),
    }
}

/// Split a comma-separated list, dropping empty entries.
fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([
            ("AZURE_TENANT_ID".to_string(), "tenant-123".to_string()),
            ("AZURE_CLIENT_ID".to_string(), "client-456".to_string()),
        ])
    }

    fn tenant(config: &Config) -> &TenantSettings {
        match &config.auth {
            AuthMode::Enforced(settings) => settings,
            AuthMode::Disabled => panic!("expected enforced auth"),
        }
    }

    #[test]
    fn test_from_vars_success_with_defaults() {
        let config = Config::from_vars(&base_vars()).expect("Config should load successfully");

        assert!(config.auth_enabled());
        assert_eq!(config.bind_address, "127.0.0.1:10000");
        assert_eq!(
            config.excluded_paths,
            vec!["/health", "/ready", "/metrics", "/docs"]
        );
        assert_eq!(config.drain_seconds, 0);

        let settings = tenant(&config);
        assert_eq!(settings.tenant_id, "tenant-123");
        assert_eq!(settings.client_id, "client-456");
        assert_eq!(settings.audience, "api://client-456");
        assert_eq!(
            settings.accepted_issuers,
            vec![
                "https://sts.windows.net/tenant-123/".to_string(),
                "https://login.microsoftonline.com/tenant-123/v2.0".to_string(),
            ]
        );
        assert_eq!(
            settings.jwks_url,
            "https://login.microsoftonline.com/tenant-123/discovery/v2.0/keys"
        );
        assert_eq!(settings.required_scope, "api://client-456/user_read");
        assert_eq!(settings.jwt_clock_skew_seconds, 0);
        assert_eq!(settings.jwks_cache_ttl_seconds, DEFAULT_JWKS_CACHE_TTL_SECONDS);
        assert_eq!(
            settings.jwks_min_refresh_seconds,
            DEFAULT_JWKS_MIN_REFRESH_SECONDS
        );
        assert_eq!(
            settings.token_endpoint(),
            "https://login.microsoftonline.com/tenant-123/oauth2/v2.0/token"
        );
    }

    #[test]
    fn test_from_vars_success_with_custom_values() {
        let mut vars = base_vars();
        vars.insert("TOKEN_AUDIENCE".to_string(), "api://custom".to_string());
        vars.insert(
            "TOKEN_ISSUERS".to_string(),
            "https://issuer-a/, https://issuer-b".to_string(),
        );
        vars.insert(
            "JWKS_URL".to_string(),
            "http://127.0.0.1:9999/keys".to_string(),
        );
        vars.insert(
            "AUTHORITY_HOST".to_string(),
            "https://login.example.com/".to_string(),
        );
        vars.insert("REQUIRED_SCOPE".to_string(), "api://custom/read".to_string());
        vars.insert("JWT_CLOCK_SKEW_SECONDS".to_string(), "30".to_string());
        vars.insert("JWKS_CACHE_TTL_SECONDS".to_string(), "60".to_string());
        vars.insert("JWKS_MIN_REFRESH_SECONDS".to_string(), "0".to_string());
        vars.insert(
            "AUTH_EXCLUDED_PATHS".to_string(),
            "/health, /public,".to_string(),
        );
        vars.insert("BIND_ADDRESS".to_string(), "0.0.0.0:8080".to_string());
        vars.insert("GATEWAY_DRAIN_SECONDS".to_string(), "15".to_string());

        let config = Config::from_vars(&vars).expect("Config should load successfully");

        assert_eq!(config.bind_address, "0.0.0.0:8080");
        assert_eq!(config.excluded_paths, vec!["/health", "/public"]);
        assert_eq!(config.drain_seconds, 15);

        let settings = tenant(&config);
        assert_eq!(settings.audience, "api://custom");
        assert_eq!(
            settings.accepted_issuers,
            vec!["https://issuer-a/".to_string(), "https://issuer-b".to_string()]
        );
        assert_eq!(settings.jwks_url, "http://127.0.0.1:9999/keys");
        assert_eq!(settings.authority_host, "https://login.example.com");
        assert_eq!(
            settings.token_endpoint(),
            "https://login.example.com/tenant-123/oauth2/v2.0/token"
        );
        assert_eq!(settings.required_scope, "api://custom/read");
        assert_eq!(settings.jwt_clock_skew_seconds, 30);
        assert_eq!(settings.jwks_cache_ttl_seconds, 60);
        assert_eq!(settings.jwks_min_refresh_seconds, 0);
    }

    #[test]
    fn test_authority_host_drives_default_v2_issuer_and_jwks_url() {
        let mut vars = base_vars();
        vars.insert(
            "AUTHORITY_HOST".to_string(),
            "https://login.example.com".to_string(),
        );

        let config = Config::from_vars(&vars).unwrap();
        let settings = tenant(&config);

        assert_eq!(
            settings.accepted_issuers,
            vec![
                "https://sts.windows.net/tenant-123/".to_string(),
                "https://login.example.com/tenant-123/v2.0".to_string(),
            ]
        );
        assert_eq!(
            settings.jwks_url,
            "https://login.example.com/tenant-123/discovery/v2.0/keys"
        );
    }

    #[test]
    fn test_port_sets_default_bind_address() {
        let mut vars = base_vars();
        vars.insert("PORT".to_string(), "8081".to_string());

        let config = Config::from_vars(&vars).unwrap();
        assert_eq!(config.bind_address, "127.0.0.1:8081");
    }

    #[test]
    fn test_port_rejects_non_numeric() {
        let mut vars = base_vars();
        vars.insert("PORT".to_string(), "http".to_string());

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidPort(_))));
    }

    #[test]
    fn test_missing_tenant_id_when_enabled() {
        let vars = HashMap::from([("AZURE_CLIENT_ID".to_string(), "client".to_string())]);

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "AZURE_TENANT_ID"));
    }

    #[test]
    fn test_missing_client_id_when_enabled() {
        let vars = HashMap::from([("AZURE_TENANT_ID".to_string(), "tenant".to_string())]);

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "AZURE_CLIENT_ID"));
    }

    #[test]
    fn test_empty_identifiers_count_as_missing() {
        let vars = HashMap::from([
            ("AZURE_TENANT_ID".to_string(), "   ".to_string()),
            ("AZURE_CLIENT_ID".to_string(), "client".to_string()),
        ]);

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "AZURE_TENANT_ID"));
    }

    #[test]
    fn test_disabled_auth_needs_no_identifiers() {
        let vars = HashMap::from([("ENABLE_AUTH".to_string(), "false".to_string())]);

        let config = Config::from_vars(&vars).expect("Config should load successfully");
        assert_eq!(config.auth, AuthMode::Disabled);
        assert!(!config.auth_enabled());
    }

    #[test]
    fn test_enable_auth_accepts_common_spellings() {
        for (value, expected) in [
            ("TRUE", true),
            ("1", true),
            ("yes", true),
            ("On", true),
            ("False", false),
            ("0", false),
            ("no", false),
            ("off", false),
        ] {
            let mut vars = base_vars();
            vars.insert("ENABLE_AUTH".to_string(), value.to_string());
            let config = Config::from_vars(&vars).unwrap();
            assert_eq!(config.auth_enabled(), expected, "ENABLE_AUTH={}", value);
        }
    }

    #[test]
    fn test_enable_auth_rejects_unknown_value() {
        let mut vars = base_vars();
        vars.insert("ENABLE_AUTH".to_string(), "flase".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidBoolean(msg)) if msg.contains("ENABLE_AUTH"))
        );
    }

    #[test]
    fn test_empty_issuer_list_rejected() {
        let mut vars = base_vars();
        vars.insert("TOKEN_ISSUERS".to_string(), " , ".to_string());

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidIssuers(_))));
    }

    #[test]
    fn test_jwt_clock_skew_rejects_negative() {
        let mut vars = base_vars();
        vars.insert("JWT_CLOCK_SKEW_SECONDS".to_string(), "-100".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidJwtClockSkew(msg)) if msg.contains("must not be negative"))
        );
    }

    #[test]
    fn test_jwt_clock_skew_rejects_too_large() {
        let mut vars = base_vars();
        vars.insert("JWT_CLOCK_SKEW_SECONDS".to_string(), "601".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidJwtClockSkew(msg)) if msg.contains("must not exceed 600"))
        );
    }

    #[test]
    fn test_jwt_clock_skew_accepts_max() {
        let mut vars = base_vars();
        vars.insert("JWT_CLOCK_SKEW_SECONDS".to_string(), "600".to_string());

        let config = Config::from_vars(&vars).unwrap();
        assert_eq!(tenant(&config).jwt_clock_skew_seconds, 600);
    }

    #[test]
    fn test_jwt_clock_skew_rejects_non_numeric() {
        let mut vars = base_vars();
        vars.insert(
            "JWT_CLOCK_SKEW_SECONDS".to_string(),
            "five-minutes".to_string(),
        );

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidJwtClockSkew(msg)) if msg.contains("must be a valid integer"))
        );
    }

    #[test]
    fn test_jwks_cache_ttl_rejects_zero() {
        let mut vars = base_vars();
        vars.insert("JWKS_CACHE_TTL_SECONDS".to_string(), "0".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidCacheTtl(msg)) if msg.contains("must be greater than 0"))
        );
    }

    #[test]
    fn test_jwks_min_refresh_rejects_non_numeric() {
        let mut vars = base_vars();
        vars.insert("JWKS_MIN_REFRESH_SECONDS".to_string(), "soon".to_string());

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidCacheTtl(_))));
    }

    #[test]
    fn test_drain_seconds_rejects_non_numeric() {
        let mut vars = base_vars();
        vars.insert("GATEWAY_DRAIN_SECONDS".to_string(), "15s".to_string());

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidDrainPeriod(msg)) if msg.contains("GATEWAY_DRAIN_SECONDS"))
        );
    }

    #[test]
    fn test_drain_seconds_rejects_negative() {
        let mut vars = base_vars();
        vars.insert("GATEWAY_DRAIN_SECONDS".to_string(), "-1".to_string());

        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidDrainPeriod(_))
        ));
    }

    #[test]
    fn test_debug_output_names_mode() {
        let config = Config::from_vars(&base_vars()).unwrap();
        let debug_output = format!("{:?}", config);

        assert!(debug_output.contains("auth_enabled: true"));
        assert!(debug_output.contains("tenant-123"));
    }
}
