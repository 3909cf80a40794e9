//! Cache store collaborator and the in-memory implementation.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use http::header::{HeaderValue, AGE, CACHE_CONTROL};
use tokio::sync::RwLock;

use edge_core::EdgeResponse;

use crate::error::{CacheError, CacheResult};
use crate::headers::header_names;
use crate::key::CacheKey;
use crate::policy::{CacheControl, Freshness};

/// A stored response with the metadata read back from its headers.
#[derive(Debug, Clone)]
pub struct CachedEntry {
    /// The stored response, including the stored-at header.
    pub response: EdgeResponse,
    /// When the entry was written.
    pub stored_at: DateTime<Utc>,
    /// Directives parsed from the stored `Cache-Control` header.
    pub directives: CacheControl,
}

impl CachedEntry {
    /// Stamp a response with the current time.
    pub fn new(response: EdgeResponse) -> Self {
        Self::stored_at(response, Utc::now())
    }

    /// Stamp a response with an explicit insertion time.
    pub fn stored_at(mut response: EdgeResponse, at: DateTime<Utc>) -> Self {
        let stamp = at.to_rfc3339_opts(SecondsFormat::Secs, true);
        if let Ok(value) = HeaderValue::from_str(&stamp) {
            response.headers.insert(header_names::X_EDGE_STORED_AT, value);
        }
        let directives = response
            .header(CACHE_CONTROL.as_str())
            .map(CacheControl::parse)
            .unwrap_or_default();
        Self {
            response,
            stored_at: at,
            directives,
        }
    }

    /// Rebuild an entry from a response persisted by an external store.
    pub fn from_stored(key: &CacheKey, response: EdgeResponse) -> CacheResult<Self> {
        let corrupt = |reason: &str| CacheError::Corrupt {
            key: key.to_string(),
            reason: reason.to_string(),
        };
        let stamp = response
            .header(header_names::X_EDGE_STORED_AT)
            .ok_or_else(|| corrupt("missing stored-at header"))?;
        let stored_at = DateTime::parse_from_rfc3339(stamp)
            .map_err(|e| corrupt(&e.to_string()))?
            .with_timezone(&Utc);
        let directives = response
            .header(CACHE_CONTROL.as_str())
            .map(CacheControl::parse)
            .unwrap_or_default();
        Ok(Self {
            response,
            stored_at,
            directives,
        })
    }

    /// Age of the entry at `now`. Clock skew counts as zero.
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        (now - self.stored_at).to_std().unwrap_or_default()
    }

    /// Freshness at `now`.
    pub fn freshness_at(&self, now: DateTime<Utc>) -> Freshness {
        self.directives.freshness(self.age_at(now))
    }

    /// Freshness right now.
    pub fn freshness(&self) -> Freshness {
        self.freshness_at(Utc::now())
    }

    /// The response to send to a client, with an `Age` header.
    pub fn to_response(&self, now: DateTime<Utc>) -> EdgeResponse {
        let mut response = self.response.clone();
        response.headers.remove(header_names::X_EDGE_STORED_AT);
        response
            .headers
            .insert(AGE, HeaderValue::from(self.age_at(now).as_secs()));
        response
    }
}

/// Cache store backend trait.
///
/// Implementations must be atomic per key; the orchestrator does no
/// locking of its own.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up a servable entry. Expired entries are reported as absent.
    async fn lookup(&self, key: &CacheKey) -> CacheResult<Option<CachedEntry>>;

    /// Store a decorated response under a key.
    async fn store(&self, key: &CacheKey, response: EdgeResponse) -> CacheResult<()>;

    /// Drop every entry. Returns the number of entries removed when known.
    async fn purge_all(&self) -> CacheResult<usize>;
}

/// In-memory cache store (for development/testing).
///
/// Expired entries are evicted when their key is looked up and swept on
/// every write, so keys that are never requested again do not accumulate.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, CachedEntry>>,
}

impl InMemoryStore {
    /// Create a new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a pre-built entry, bypassing the stored-at stamp.
    pub async fn insert_entry(&self, key: &CacheKey, entry: CachedEntry) {
        self.entries
            .write()
            .await
            .insert(key.as_str().to_string(), entry);
    }

    /// Number of entries currently held, including unevicted expired ones.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Raw entry for a key, regardless of freshness.
    pub async fn peek(&self, key: &CacheKey) -> Option<CachedEntry> {
        self.entries.read().await.get(key.as_str()).cloned()
    }
}

#[async_trait]
impl CacheStore for InMemoryStore {
    async fn lookup(&self, key: &CacheKey) -> CacheResult<Option<CachedEntry>> {
        let now = Utc::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key.as_str()) {
                None => return Ok(None),
                Some(entry) if entry.freshness_at(now) != Freshness::Expired => {
                    return Ok(Some(entry.clone()));
                }
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().await;
        if entries
            .get(key.as_str())
            .is_some_and(|e| e.freshness_at(now) == Freshness::Expired)
        {
            entries.remove(key.as_str());
        }
        Ok(None)
    }

    async fn store(&self, key: &CacheKey, response: EdgeResponse) -> CacheResult<()> {
        let entry = CachedEntry::new(response);
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, e| e.freshness_at(now) != Freshness::Expired);
        entries.insert(key.as_str().to_string(), entry);
        Ok(())
    }

    async fn purge_all(&self) -> CacheResult<usize> {
        let mut entries = self.entries.write().await;
        let removed = entries.len();
        entries.clear();
        Ok(removed)
    }
}
