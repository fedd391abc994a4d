/// Optional Redis store used for response caching.
///
/// A missing URL disables the store. Connection and command failures are logged and
/// read as misses, so callers never wait on Redis being healthy. Every key is written
/// under the namespace given at construction.
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, RedisResult};
use tracing::{debug, warn};

pub struct RedisCache {
    client: Option<redis::Client>,
    namespace: String,
}

impl RedisCache {
    pub fn new(url: Option<&str>, namespace: impl Into<String>) -> Self {
        let client = match url.map(redis::Client::open) {
            Some(Ok(client)) => Some(client),
            Some(Err(e)) => {
                warn!(error = %e, "invalid redis url, response cache disabled");
                None
            }
            None => {
                debug!("no redis url configured");
                None
            }
        };
        Self {
            client,
            namespace: namespace.into(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    /// PING round-trip.
    pub async fn ping(&self) -> bool {
        let Some(mut conn) = self.connect().await else {
            return false;
        };
        let reply: RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
        settle("PING", "", reply).is_some()
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        let mut conn = self.connect().await?;
        let reply: RedisResult<Option<String>> = conn.get(self.namespaced(key)).await;
        settle("GET", key, reply).flatten()
    }

    /// SETEX under the namespace. Returns `true` when Redis acknowledged the write.
    pub async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> bool {
        let Some(mut conn) = self.connect().await else {
            return false;
        };
        let reply: RedisResult<()> = conn.set_ex(self.namespaced(key), value, ttl_secs).await;
        settle("SETEX", key, reply).is_some()
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}{key}", self.namespace)
    }

    async fn connect(&self) -> Option<MultiplexedConnection> {
        let client = self.client.as_ref()?;
        match client.get_multiplexed_async_connection().await {
            Ok(conn) => Some(conn),
            Err(e) => {
                warn!(error = %e, "redis unreachable");
                None
            }
        }
    }
}

fn settle<T>(command: &'static str, key: &str, reply: RedisResult<T>) -> Option<T> {
    match reply {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(command, key, error = %e, "redis command failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_without_url_is_inert() {
        let store = RedisCache::new(None, "t:");
        assert!(!store.is_enabled());
        assert!(!store.ping().await);
        assert_eq!(store.get("any").await, None);
        assert!(!store.set_ex("any", "v", 10).await);
    }

    #[test]
    fn test_keys_are_namespaced() {
        let store = RedisCache::new(None, "mc:v1:");
        assert_eq!(store.namespaced("response:x"), "mc:v1:response:x");
    }

    #[test]
    fn test_invalid_url_disables_store() {
        let store = RedisCache::new(Some("not-a-redis-url"), "t:");
        assert!(!store.is_enabled());
    }
}
