/// Redis cache of raw model responses, keyed by model and prompt fingerprint.
///
/// Key schema: `mc:v1:response:{model}:{sha256(prompt)}` with a configurable TTL.
/// The `mc:v1:` namespace is applied by the underlying store. Callers only store
/// responses that decoded into at least one scorable detail.
use checker_common::redis::RedisCache;
use tracing::info;

use crate::prompt::prompt_fingerprint;

/// Namespace for every key this service writes.
pub const KEY_NAMESPACE: &str = "mc:v1:";

enum Store {
    Redis(RedisCache),
    #[cfg(test)]
    Memory(MemoryEntries),
}

pub struct ResponseCache {
    store: Store,
    ttl_secs: u64,
}

impl ResponseCache {
    pub fn new(redis: RedisCache, ttl_secs: u64) -> Self {
        Self {
            store: Store::Redis(redis),
            ttl_secs,
        }
    }

    #[cfg(test)]
    pub fn disabled() -> Self {
        Self::new(RedisCache::new(None, KEY_NAMESPACE), 0)
    }

    /// Process-local store with no expiry.
    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self {
            store: Store::Memory(Default::default()),
            ttl_secs: u64::MAX,
        }
    }

    pub async fn is_available(&self) -> bool {
        match &self.store {
            Store::Redis(redis) => redis.ping().await,
            #[cfg(test)]
            Store::Memory(_) => true,
        }
    }

    pub async fn get(&self, model: &str, prompt: &str) -> Option<String> {
        let key = response_key(model, prompt);
        let hit = match &self.store {
            Store::Redis(redis) => redis.get(&key).await,
            #[cfg(test)]
            Store::Memory(entries) => memory_get(entries, &key),
        }?;
        info!(key, "model response cache hit");
        Some(hit)
    }

    pub async fn set(&self, model: &str, prompt: &str, response: &str) {
        if self.ttl_secs == 0 {
            return;
        }
        let key = response_key(model, prompt);
        match &self.store {
            Store::Redis(redis) => {
                if redis.is_enabled() {
                    redis.set_ex(&key, response, self.ttl_secs).await;
                }
            }
            #[cfg(test)]
            Store::Memory(entries) => memory_set(entries, key, response),
        }
    }
}

#[cfg(test)]
type MemoryEntries = std::sync::Mutex<std::collections::HashMap<String, String>>;

#[cfg(test)]
fn memory_get(entries: &MemoryEntries, key: &str) -> Option<String> {
    entries.lock().ok()?.get(key).cloned()
}

#[cfg(test)]
fn memory_set(entries: &MemoryEntries, key: String, response: &str) {
    if let Ok(mut entries) = entries.lock() {
        entries.insert(key, response.to_string());
    }
}

fn response_key(model: &str, prompt: &str) -> String {
    format!("response:{model}:{}", prompt_fingerprint(prompt))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_depends_on_model_and_prompt() {
        let a = response_key("llama", "prompt");
        assert!(a.starts_with("response:llama:"));
        assert_eq!(a, response_key("llama", "prompt"));
        assert_ne!(a, response_key("mistral", "prompt"));
        assert_ne!(a, response_key("llama", "prompt "));
    }

    #[tokio::test]
    async fn test_in_memory_cache_round_trip() {
        let cache = ResponseCache::in_memory();
        assert_eq!(cache.get("m", "p").await, None);
        cache.set("m", "p", "{}").await;
        assert_eq!(cache.get("m", "p").await.as_deref(), Some("{}"));
        assert_eq!(cache.get("other", "p").await, None);
    }

    #[tokio::test]
    async fn test_disabled_cache_never_hits() {
        let cache = ResponseCache::disabled();
        cache.set("m", "p", "{}").await;
        assert_eq!(cache.get("m", "p").await, None);
        assert!(!cache.is_available().await);
    }
}
