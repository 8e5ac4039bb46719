use std::sync::Arc;
use std::time::{Duration, Instant};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::models::ModelInfo;
use crate::provider::ProviderClient;

#[derive(Debug, Clone)]
struct CachedModels {
    models: Vec<ModelInfo>,
    fetched_at: Instant,
}

/// Cached view of the models the active provider serves.
///
/// The lock only guards the check and the swap; the fetch itself runs
/// unlocked, so readers of a fresh cache never wait on the network.
#[derive(Debug)]
pub struct ModelRegistry {
    provider: Arc<ProviderClient>,
    ttl: Duration,
    cache: Mutex<Option<CachedModels>>,
}

impl ModelRegistry {
    pub fn new(provider: Arc<ProviderClient>, ttl: Duration) -> Self {
        Self {
            provider,
            ttl,
            cache: Mutex::new(None),
        }
    }

    /// List models, from cache while it is fresh.
    ///
    /// Best effort: a failed refresh returns an empty list to this caller and
    /// leaves the previous cache in place for everyone else.
    pub async fn list_models(&self, force_refresh: bool) -> Vec<ModelInfo> {
        if !force_refresh {
            if let Some(models) = self.fresh() {
                debug!("Serving {} models from cache", models.len());
                return models;
            }
        }

        match self.provider.fetch_models().await {
            Ok(models) => {
                *self.cache.lock() = Some(CachedModels {
                    models: models.clone(),
                    fetched_at: Instant::now(),
                });
                models
            }
            Err(e) => {
                warn!("Model list refresh from {} failed: {}", self.provider.kind(), e);
                Vec::new()
            }
        }
    }

    pub fn default_model(&self) -> &str {
        self.provider.default_model()
    }

    fn fresh(&self) -> Option<Vec<ModelInfo>> {
        self.cache
            .lock()
            .as_ref()
            .filter(|cached| cached.fetched_at.elapsed() < self.ttl)
            .map(|cached| cached.models.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderKind;
    use crate::transport::{HttpTransport, RetryPolicy};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn registry(base_url: &str, ttl: Duration) -> ModelRegistry {
        let transport = HttpTransport::new(Duration::from_secs(5), RetryPolicy::single(), None).unwrap();
        let provider = ProviderClient::new(ProviderKind::Ollama, base_url, "llama3.2", transport);
        ModelRegistry::new(Arc::new(provider), ttl)
    }

    fn tags() -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "models": [{"name": "llama3.2:latest", "size": 2019393189u64, "modified_at": "2024-10-01T10:00:00Z"}]
        }))
    }

    #[tokio::test]
    async fn test_cache_serves_repeat_calls() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(tags())
            .expect(1)
            .mount(&server)
            .await;

        let registry = registry(&server.uri(), Duration::from_secs(60));
        assert_eq!(registry.list_models(false).await.len(), 1);
        assert_eq!(registry.list_models(false).await.len(), 1);
    }

    #[tokio::test]
    async fn test_force_refresh_requeries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(tags())
            .expect(2)
            .mount(&server)
            .await;

        let registry = registry(&server.uri(), Duration::from_secs(60));
        registry.list_models(false).await;
        registry.list_models(true).await;
    }

    #[tokio::test]
    async fn test_expired_cache_requeries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(tags())
            .expect(2)
            .mount(&server)
            .await;

        let registry = registry(&server.uri(), Duration::ZERO);
        registry.list_models(false).await;
        registry.list_models(false).await;
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(tags())
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let registry = registry(&server.uri(), Duration::from_secs(60));
        assert_eq!(registry.list_models(false).await.len(), 1);
        // Forced refresh fails: empty for this caller only
        assert!(registry.list_models(true).await.is_empty());
        assert_eq!(registry.list_models(false).await.len(), 1);
    }

    #[tokio::test]
    async fn test_slow_refresh_does_not_block_fresh_readers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(tags())
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(500).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let registry = Arc::new(registry(&server.uri(), Duration::from_secs(60)));
        assert_eq!(registry.list_models(false).await.len(), 1);

        let refreshing = registry.clone();
        let refresh = tokio::spawn(async move { refreshing.list_models(true).await });
        tokio::time::sleep(Duration::from_millis(100)).await;

        let started = Instant::now();
        assert_eq!(registry.list_models(false).await.len(), 1);
        assert!(started.elapsed() < Duration::from_millis(500));

        assert!(refresh.await.unwrap().is_empty());
    }
}
