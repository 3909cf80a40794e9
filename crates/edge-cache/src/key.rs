//! Cache key normalization.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::form_urlencoded;
use url::Url;

use edge_core::{EdgeRequest, KeyConfig, KeyDimension, KeyEncoding};

use crate::error::CacheError;

/// A cache key uniquely identifying a cached response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    /// The computed key string.
    key: String,
    /// Components that make up the key (for debugging).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    components: Vec<String>,
}

impl CacheKey {
    /// Create a cache key from a string.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            components: Vec::new(),
        }
    }

    /// Get the key string.
    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// Get the key components (for debugging).
    pub fn components(&self) -> &[String] {
        &self.components
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key)
    }
}

/// Device class folded into cache keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Desktop,
    Mobile,
    Tablet,
}

static TABLET_SIGNATURES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)tablet|ipad|playbook|silk").expect("tablet signature regex")
});

static MOBILE_SIGNATURES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"Mobile|iP(hone|od)|Android|BlackBerry|IEMobile|Kindle|Silk-Accelerated|(hpw|web)OS|Opera M(obi|ini)",
    )
    .expect("mobile signature regex")
});

impl DeviceType {
    /// Classify a User-Agent string.
    ///
    /// Tablet signatures win over mobile ones. Android without a `mobi`
    /// token after it is a tablet.
    pub fn from_user_agent(ua: &str) -> Self {
        if TABLET_SIGNATURES.is_match(ua) || is_android_tablet(ua) {
            return Self::Tablet;
        }

        if MOBILE_SIGNATURES.is_match(ua) {
            return Self::Mobile;
        }

        Self::Desktop
    }

    /// Lowercase token used in keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Mobile => "mobile",
            Self::Tablet => "tablet",
        }
    }
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Checking the last occurrence is enough: if any `android` has no `mobi`
// after it, neither does the last one.
fn is_android_tablet(ua: &str) -> bool {
    let lower = ua.to_ascii_lowercase();
    match lower.rfind("android") {
        Some(pos) => {
            let rest = &lower[pos + "android".len()..];
            let line = rest.split('\n').next().unwrap_or_default();
            !line.contains("mobi")
        }
        None => false,
    }
}

/// Derives canonical cache keys from requests.
#[derive(Debug, Clone)]
pub struct KeyNormalizer {
    tracking: Regex,
    config: KeyConfig,
}

impl KeyNormalizer {
    /// Build a normalizer, compiling the tracking-parameter pattern.
    pub fn new(config: &KeyConfig) -> Result<Self, CacheError> {
        let tracking = Regex::new(&config.tracking_pattern).map_err(|e| {
            CacheError::Config(format!(
                "invalid tracking pattern {:?}: {}",
                config.tracking_pattern, e
            ))
        })?;
        Ok(Self {
            tracking,
            config: config.clone(),
        })
    }

    /// Whether a query parameter name is a tracking parameter.
    pub fn is_tracking_param(&self, name: &str) -> bool {
        self.tracking.is_match(name)
    }

    /// Strip tracking parameters and the fragment from a URL.
    ///
    /// Remaining parameters keep their relative order. A URL without
    /// tracking parameters is returned as parsed, so the operation is
    /// idempotent.
    pub fn normalize_url(&self, url: &Url) -> Url {
        let mut url = url.clone();
        url.set_fragment(None);

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        let kept: Vec<&(String, String)> = pairs
            .iter()
            .filter(|(name, _)| !self.is_tracking_param(name))
            .collect();

        if kept.len() == pairs.len() {
            return url;
        }

        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut()
                .clear()
                .extend_pairs(kept.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        url
    }

    /// Derive the cache key for a request.
    pub fn normalize(&self, request: &EdgeRequest) -> CacheKey {
        let url = self.normalize_url(&request.url);
        let mut key = url.as_str().to_string();
        let mut components = vec![format!("url:{}", url)];

        for dimension in &self.config.dimensions {
            if !self.config.is_enabled(*dimension) {
                continue;
            }
            let Some(value) = self.dimension_value(*dimension, request) else {
                continue;
            };

            match self.config.encoding {
                KeyEncoding::Delimited => {
                    key.push(' ');
                    key.push_str(dimension.name());
                    key.push('=');
                    key.extend(form_urlencoded::byte_serialize(value.as_bytes()));
                }
                KeyEncoding::Legacy => key.push_str(&value),
            }
            components.push(format!("{}:{}", dimension.name(), value));
        }

        CacheKey { key, components }
    }

    fn dimension_value(&self, dimension: KeyDimension, request: &EdgeRequest) -> Option<String> {
        match dimension {
            KeyDimension::Device => request
                .non_empty_header(&self.config.user_agent_header)
                .map(|ua| DeviceType::from_user_agent(&ua).to_string()),
            KeyDimension::Locale => request
                .non_empty_header(&self.config.locale_header)
                .map(Cow::into_owned),
            KeyDimension::Country => request
                .non_empty_header(&self.config.country_header)
                .map(Cow::into_owned),
        }
    }
}
