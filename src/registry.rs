// Lazily constructed, shared API client

use once_cell::sync::Lazy;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http_client::ApiClient;

type ConfigLoader = Box<dyn Fn() -> Result<ClientConfig, ApiError> + Send + Sync>;

/// Hands out one shared `ApiClient`, built on first use.
///
/// Configuration is read by the loader exactly once, when the client is
/// constructed; later configuration changes have no effect.
pub struct ClientRegistry {
    client: OnceCell<Arc<ApiClient>>,
    loader: ConfigLoader,
}

impl ClientRegistry {
    /// Registry that builds its client from the configuration returned by `loader`
    pub fn new<F>(loader: F) -> Self
    where
        F: Fn() -> Result<ClientConfig, ApiError> + Send + Sync + 'static,
    {
        Self {
            client: OnceCell::new(),
            loader: Box::new(loader),
        }
    }

    /// Registry for an already known configuration
    pub fn from_config(config: ClientConfig) -> Self {
        Self::new(move || Ok(config.clone()))
    }

    /// Registry that always returns `client`
    pub fn with_client(client: Arc<ApiClient>) -> Self {
        Self {
            client: OnceCell::new_with(Some(client)),
            loader: Box::new(|| {
                Err(ApiError::Internal(anyhow::anyhow!(
                    "registry was created with a prebuilt client"
                )))
            }),
        }
    }

    /// Get the shared client, constructing it on the first call.
    /// Concurrent first callers construct exactly one client.
    pub async fn get_client(&self) -> Result<Arc<ApiClient>, ApiError> {
        self.client
            .get_or_try_init(|| async {
                let config = (self.loader)()?;
                tracing::debug!(base_url = %config.base_url, "Creating VerifyWise API client");
                Ok::<_, ApiError>(Arc::new(ApiClient::new(&config)?))
            })
            .await
            .cloned()
    }

    /// The client if it has been constructed
    pub fn get(&self) -> Option<Arc<ApiClient>> {
        self.client.get().cloned()
    }

    /// Close the client if it was ever constructed
    pub fn close(&self) {
        if let Some(client) = self.client.get() {
            client.close();
        }
    }
}

/// Process-wide registry configured from `VERIFYWISE_*` environment variables
static GLOBAL_REGISTRY: Lazy<ClientRegistry> = Lazy::new(|| ClientRegistry::new(ClientConfig::from_env));

/// Return the process-wide shared client, creating it from the environment on first use
pub async fn get_client() -> Result<Arc<ApiClient>, ApiError> {
    GLOBAL_REGISTRY.get_client().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    fn config() -> ClientConfig {
        ClientConfig {
            base_url: "http://localhost:3000".to_string(),
            email: "test@example.com".to_string(),
            password: "testpass".to_string(),
            request_timeout: Duration::from_secs(30),
            max_retries: 3,
        }
    }

    #[tokio::test]
    async fn test_get_client_returns_same_instance() {
        let registry = ClientRegistry::from_config(config());

        let c1 = registry.get_client().await.unwrap();
        let c2 = registry.get_client().await.unwrap();

        assert!(Arc::ptr_eq(&c1, &c2));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_calls_build_one_client() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = loads.clone();
        let registry = Arc::new(ClientRegistry::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(config())
        }));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move { registry.get_client().await })
            })
            .collect();

        let clients: Vec<Arc<ApiClient>> = futures::future::join_all(tasks)
            .await
            .into_iter()
            .map(|r| r.unwrap().unwrap())
            .collect();

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(clients.iter().all(|c| Arc::ptr_eq(c, &clients[0])));
    }

    #[tokio::test]
    async fn test_failed_construction_can_be_retried() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let registry = ClientRegistry::new(move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(ApiError::Config("VERIFYWISE_EMAIL is required".to_string()))
            } else {
                Ok(config())
            }
        });

        let err = assert_err!(registry.get_client().await.map(|_| ()));
        assert!(matches!(err, ApiError::Config(_)));
        assert!(registry.get().is_none());

        assert_ok!(registry.get_client().await);
        assert!(registry.get().is_some());
    }

    #[tokio::test]
    async fn test_with_client_and_close() {
        let client = Arc::new(ApiClient::new(&config()).unwrap());
        let registry = ClientRegistry::with_client(client.clone());

        let got = registry.get_client().await.unwrap();
        assert!(Arc::ptr_eq(&got, &client));

        registry.close();
        assert!(client.is_closed());
    }
}
