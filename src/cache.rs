/*!
 * Content-addressed translation cache
 *
 * Keys are `<style>:<base64(sha256(source text))>`. Entries expire lazily on
 * read; there is no eviction sweep. Backend errors never fail a request, a
 * broken backend simply behaves like an empty one.
 */

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Lifetime of a cached translation, measured from the write
pub const CACHE_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache backend unavailable: {0}")]
    Unavailable(String),
}

/// Key/value store with per-entry expiry
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Instant,
}

/// In-process backend; concurrent writers to one key are last-write-wins
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included until next read
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if entry.expires_at > now => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }

        // Expired: drop it unless a writer refreshed it in between
        let mut entries = self.entries.write().await;
        if entries
            .get(key)
            .is_some_and(|entry| entry.expires_at <= now)
        {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }
}

/// Backend used when caching is disabled: every read misses
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCache;

#[async_trait]
impl CacheBackend for NullCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
        Ok(())
    }
}

/// Translation lookaside cache namespaced by translation style
#[derive(Clone)]
pub struct TranslationCache {
    backend: Arc<dyn CacheBackend>,
    namespace: String,
    ttl: Duration,
}

impl std::fmt::Debug for TranslationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationCache")
            .field("namespace", &self.namespace)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TranslationCache {
    pub fn new(backend: Arc<dyn CacheBackend>, namespace: impl Into<String>) -> Self {
        Self {
            backend,
            namespace: namespace.into(),
            ttl: CACHE_TTL,
        }
    }

    /// Cache that never hits
    pub fn disabled(namespace: impl Into<String>) -> Self {
        Self::new(Arc::new(NullCache), namespace)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Deterministic key for `text`
    pub fn key_for(&self, text: &str) -> String {
        let digest = Sha256::digest(text.as_bytes());
        format!("{}:{}", self.namespace, STANDARD.encode(digest))
    }

    /// Cached translation of `text`, if any
    pub async fn get(&self, text: &str) -> Option<String> {
        let key = self.key_for(text);
        match self.backend.get(&key).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }

    /// Store the translation of `text` for [`CACHE_TTL`]
    pub async fn put(&self, text: &str, translated: &str) {
        let key = self.key_for(text);
        match self.backend.set(&key, translated.to_string(), self.ttl).await {
            Ok(()) => debug!(key = %key, "Cached translation"),
            Err(e) => warn!(key = %key, error = %e, "Cache write failed, skipping"),
        }
    }
}
