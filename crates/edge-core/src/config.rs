//! Cache worker configuration.
//!
//! Configuration is read once at startup and shared read-only between
//! requests. Every field has a default, so an empty file is valid.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML config {path}: {source}")]
    Toml {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to parse JSON config {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid tracking pattern {pattern:?}: {source}")]
    TrackingPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EdgeCacheConfig {
    /// Freshness directives and storage eligibility.
    #[serde(default)]
    pub freshness: FreshnessConfig,

    /// Rules that skip caching entirely.
    #[serde(default)]
    pub bypass: BypassConfig,

    /// Cache key derivation.
    #[serde(default)]
    pub key: KeyConfig,

    /// Purge entry point.
    #[serde(default)]
    pub purge: PurgeConfig,

    /// Origin transport.
    #[serde(default)]
    pub origin: OriginConfig,

    /// Client-facing response behaviour.
    #[serde(default)]
    pub response: ResponseConfig,
}

impl EdgeCacheConfig {
    /// Load config from a file. `.json` files are parsed as JSON, anything
    /// else as TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;

        let config: Self = if display.ends_with(".json") {
            serde_json::from_str(&content).map_err(|source| ConfigError::Json {
                path: display.clone(),
                source,
            })?
        } else {
            toml::from_str(&content).map_err(|source| ConfigError::Toml {
                path: display.clone(),
                source,
            })?
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse from a TOML string without validating.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Toml {
            path: "<inline>".to_string(),
            source,
        })
    }

    /// Serialize to pretty TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        regex::Regex::new(&self.key.tracking_pattern).map_err(|source| {
            ConfigError::TrackingPattern {
                pattern: self.key.tracking_pattern.clone(),
                source,
            }
        })?;

        if let Some(status) = self
            .freshness
            .cacheable_statuses
            .iter()
            .find(|s| !(100..=599).contains(*s))
        {
            return Err(ConfigError::Invalid(format!(
                "cacheable status {} is not an HTTP status code",
                status
            )));
        }

        if self.purge.query_param.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "purge.query_param must not be empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for dim in &self.key.dimensions {
            if !seen.insert(dim) {
                return Err(ConfigError::Invalid(format!(
                    "key dimension {:?} listed more than once",
                    dim
                )));
            }
        }

        if self.bypass.cacheable_methods.is_empty() {
            return Err(ConfigError::Invalid(
                "bypass.cacheable_methods must list at least one method".to_string(),
            ));
        }

        Ok(())
    }
}

/// Freshness directives written into stored responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreshnessConfig {
    /// Freshness lifetime in seconds.
    #[serde(default = "default_max_age")]
    pub max_age: u64,

    /// Seconds after expiry during which a stale copy may be served while
    /// a background refresh runs.
    #[serde(default = "default_stale_while_revalidate")]
    pub stale_while_revalidate: u64,

    /// Seconds after expiry during which a stale copy may be served if the
    /// refresh fails.
    #[serde(default = "default_stale_if_error")]
    pub stale_if_error: u64,

    /// Origin status codes eligible for storage.
    #[serde(default = "default_cacheable_statuses")]
    pub cacheable_statuses: Vec<u16>,

    /// Content-type substrings eligible for storage.
    #[serde(default = "default_cacheable_content_types")]
    pub cacheable_content_types: Vec<String>,
}

fn default_max_age() -> u64 {
    300
}

fn default_stale_while_revalidate() -> u64 {
    45
}

fn default_stale_if_error() -> u64 {
    3600
}

fn default_cacheable_statuses() -> Vec<u16> {
    vec![200, 301, 302, 303, 307, 404]
}

fn default_cacheable_content_types() -> Vec<String> {
    vec!["text/html".to_string()]
}

impl Default for FreshnessConfig {
    fn default() -> Self {
        Self {
            max_age: default_max_age(),
            stale_while_revalidate: default_stale_while_revalidate(),
            stale_if_error: default_stale_if_error(),
            cacheable_statuses: default_cacheable_statuses(),
            cacheable_content_types: default_cacheable_content_types(),
        }
    }
}

/// Bypass rules. Any single match skips caching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BypassConfig {
    /// Methods that may be served from cache. Everything else bypasses.
    #[serde(default = "default_cacheable_methods")]
    pub cacheable_methods: Vec<String>,

    /// Cookie prefixes (matched against each trimmed cookie entry).
    #[serde(default = "default_bypass_cookies")]
    pub cookies: Vec<String>,

    /// Request headers whose presence bypasses caching.
    #[serde(default = "default_bypass_headers")]
    pub headers: Vec<String>,

    /// Path substrings.
    #[serde(default = "default_bypass_paths")]
    pub paths: Vec<String>,

    /// Query string substrings.
    #[serde(default = "default_bypass_queries")]
    pub queries: Vec<String>,
}

fn default_cacheable_methods() -> Vec<String> {
    vec!["GET".to_string(), "HEAD".to_string()]
}

fn default_bypass_cookies() -> Vec<String> {
    vec!["no_worker_cache=true".to_string(), "Authorization".to_string()]
}

fn default_bypass_headers() -> Vec<String> {
    vec!["Authorization".to_string()]
}

fn default_bypass_paths() -> Vec<String> {
    vec!["/_nuxt/".to_string()]
}

fn default_bypass_queries() -> Vec<String> {
    vec!["no_cache=true".to_string()]
}

impl Default for BypassConfig {
    fn default() -> Self {
        Self {
            cacheable_methods: default_cacheable_methods(),
            cookies: default_bypass_cookies(),
            headers: default_bypass_headers(),
            paths: default_bypass_paths(),
            queries: default_bypass_queries(),
        }
    }
}

/// A request dimension that can be folded into the cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyDimension {
    /// Device class derived from the user agent.
    Device,
    /// Raw locale header value.
    Locale,
    /// Raw country header value.
    Country,
}

impl KeyDimension {
    /// Short name used in delimited keys.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Device => "device",
            Self::Locale => "locale",
            Self::Country => "country",
        }
    }
}

/// How dimensions are joined onto the normalized URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyEncoding {
    /// `url name=value ...` with form-encoded values. Unambiguous.
    #[default]
    Delimited,
    /// Raw concatenation of URL and values, compatible with caches filled
    /// by older deployments.
    Legacy,
}

/// Cache key derivation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyConfig {
    /// Regex matched (unanchored) against query parameter names to strip.
    #[serde(default = "default_tracking_pattern")]
    pub tracking_pattern: String,

    /// Fold the device class into the key.
    #[serde(default = "default_true")]
    pub device: bool,

    /// Fold the locale header into the key.
    #[serde(default = "default_true")]
    pub locale: bool,

    /// Fold the country header into the key.
    #[serde(default = "default_true")]
    pub country: bool,

    /// Order in which enabled dimensions are appended.
    #[serde(default = "default_dimensions")]
    pub dimensions: Vec<KeyDimension>,

    /// Key string encoding.
    #[serde(default)]
    pub encoding: KeyEncoding,

    /// Header carrying the user agent.
    #[serde(default = "default_user_agent_header")]
    pub user_agent_header: String,

    /// Header carrying the locale.
    #[serde(default = "default_locale_header")]
    pub locale_header: String,

    /// Header carrying the country code.
    #[serde(default = "default_country_header")]
    pub country_header: String,
}

fn default_tracking_pattern() -> String {
    "(gclid|utm_(source|campaign|medium)|fb(cl)?id|fbclid)".to_string()
}

fn default_true() -> bool {
    true
}

fn default_dimensions() -> Vec<KeyDimension> {
    vec![KeyDimension::Device, KeyDimension::Locale, KeyDimension::Country]
}

fn default_user_agent_header() -> String {
    "User-Agent".to_string()
}

fn default_locale_header() -> String {
    "Accept-Language".to_string()
}

fn default_country_header() -> String {
    "CF-IPCountry".to_string()
}

impl KeyConfig {
    /// Whether a dimension is switched on.
    pub fn is_enabled(&self, dimension: KeyDimension) -> bool {
        match dimension {
            KeyDimension::Device => self.device,
            KeyDimension::Locale => self.locale,
            KeyDimension::Country => self.country,
        }
    }
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            tracking_pattern: default_tracking_pattern(),
            device: true,
            locale: true,
            country: true,
            dimensions: default_dimensions(),
            encoding: KeyEncoding::default(),
            user_agent_header: default_user_agent_header(),
            locale_header: default_locale_header(),
            country_header: default_country_header(),
        }
    }
}

/// Purge entry point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurgeConfig {
    /// Query parameter that, on a POST, routes to the purge path and
    /// carries the zone id.
    #[serde(default = "default_purge_query_param")]
    pub query_param: String,

    /// Base URL of the provider API.
    #[serde(default = "default_purge_api_base")]
    pub api_base: String,
}

fn default_purge_query_param() -> String {
    "__purge_cache".to_string()
}

fn default_purge_api_base() -> String {
    "https://api.cloudflare.com/client/v4".to_string()
}

impl Default for PurgeConfig {
    fn default() -> Self {
        Self {
            query_param: default_purge_query_param(),
            api_base: default_purge_api_base(),
        }
    }
}

/// Origin transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginConfig {
    /// Rewrite scheme, host and port of every origin fetch to this URL.
    /// When unset the request URL is fetched as-is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Connection timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Total request timeout in milliseconds.
    #[serde(default = "default_total_timeout_ms")]
    pub total_timeout_ms: u64,
}

fn default_connect_timeout_ms() -> u64 {
    2_000
}

fn default_total_timeout_ms() -> u64 {
    30_000
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            url: None,
            connect_timeout_ms: default_connect_timeout_ms(),
            total_timeout_ms: default_total_timeout_ms(),
        }
    }
}

/// Client-facing response behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseConfig {
    /// Map every error to status 500 instead of separating 4xx from 5xx.
    #[serde(default)]
    pub legacy_error_status: bool,

    /// Header reporting the cache status on client responses. Never
    /// written to stored entries. Empty disables it.
    #[serde(default = "default_status_header")]
    pub status_header: String,
}

fn default_status_header() -> String {
    "X-Edge-Cache".to_string()
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            legacy_error_status: false,
            status_header: default_status_header(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_worker_constants() {
        let config = EdgeCacheConfig::default();
        assert_eq!(config.freshness.max_age, 300);
        assert_eq!(config.freshness.stale_while_revalidate, 45);
        assert_eq!(config.freshness.stale_if_error, 3600);
        assert_eq!(
            config.freshness.cacheable_statuses,
            vec![200, 301, 302, 303, 307, 404]
        );
        assert_eq!(config.bypass.paths, vec!["/_nuxt/"]);
        assert_eq!(config.purge.query_param, "__purge_cache");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = EdgeCacheConfig::from_toml_str("").unwrap();
        assert_eq!(config.freshness.max_age, 300);
        assert_eq!(config.key.dimensions.len(), 3);
        assert_eq!(config.key.encoding, KeyEncoding::Delimited);
    }

    #[test]
    fn test_partial_override() {
        let config = EdgeCacheConfig::from_toml_str(
            r#"
            [freshness]
            max_age = 60

            [key]
            country = false
            encoding = "legacy"
            dimensions = ["locale", "device", "country"]
            "#,
        )
        .unwrap();
        assert_eq!(config.freshness.max_age, 60);
        assert_eq!(config.freshness.stale_if_error, 3600);
        assert!(!config.key.is_enabled(KeyDimension::Country));
        assert_eq!(config.key.encoding, KeyEncoding::Legacy);
        assert_eq!(config.key.dimensions[0], KeyDimension::Locale);
    }

    #[test]
    fn test_invalid_tracking_pattern() {
        let mut config = EdgeCacheConfig::default();
        config.key.tracking_pattern = "(unclosed".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TrackingPattern { .. })
        ));
    }

    #[test]
    fn test_invalid_status() {
        let mut config = EdgeCacheConfig::default();
        config.freshness.cacheable_statuses.push(1000);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_duplicate_dimension() {
        let mut config = EdgeCacheConfig::default();
        config.key.dimensions.push(KeyDimension::Device);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_toml_roundtrip_keeps_values() {
        let mut config = EdgeCacheConfig::default();
        config.freshness.max_age = 120;
        let text = config.to_toml_string().unwrap();
        let parsed = EdgeCacheConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed.freshness.max_age, 120);
    }
}
