//! HTTP transport implementation

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use tracing::debug;

use crate::{
    config::TransportConfig,
    credentials::CredentialStore,
    error::{Result, TransportError},
    middleware::{RetryConfig, RetryMiddleware},
};

/// Mockable transport trait
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute a request against the configured service
    ///
    /// `timeout` overrides the configured per-attempt deadline for this
    /// call only.
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
        timeout: Option<Duration>,
    ) -> Result<serde_json::Value>;

    /// Execute a GET request
    async fn get_json(&self, path: &str) -> Result<serde_json::Value> {
        self.request(Method::GET, path, None, None).await
    }

    /// Execute a POST request with a JSON body
    async fn post_json(&self, path: &str, body: &serde_json::Value) -> Result<serde_json::Value> {
        self.request(Method::POST, path, Some(body), None).await
    }

    /// Base URL this transport talks to
    fn base_url(&self) -> &str;
}

/// Production transport over reqwest
pub struct HttpTransport {
    inner: reqwest::Client,
    config: TransportConfig,
    credentials: Arc<dyn CredentialStore>,
    retry: RetryMiddleware,
}

impl HttpTransport {
    /// Create a new transport with configuration and a credential store
    pub fn new(config: TransportConfig, credentials: Arc<dyn CredentialStore>) -> Result<Self> {
        // The per-attempt deadline is enforced with tokio timeouts so an
        // expired attempt reads as Timeout rather than a reqwest error;
        // only the connect timeout lives on the client itself.
        let inner = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))?;

        let retry = RetryMiddleware::new(RetryConfig {
            max_retries: config.max_retries,
            initial_delay: config.retry_delay,
            max_delay: config.max_retry_delay,
        });

        Ok(Self {
            inner,
            config,
            credentials,
            retry,
        })
    }

    /// Get configuration
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    fn resolve(&self, path: &str) -> Result<url::Url> {
        let base = url::Url::parse(&self.config.base_url)
            .map_err(|e| TransportError::InvalidUrl(e.to_string()))?;
        base.join(path)
            .map_err(|e| TransportError::InvalidUrl(e.to_string()))
    }

    async fn attempt(
        &self,
        method: Method,
        url: url::Url,
        body: Option<&serde_json::Value>,
        deadline: Duration,
    ) -> Result<serde_json::Value> {
        let mut request = self.inner.request(method, url);

        // Token is read on every attempt; the store owns freshness.
        if let Some(token) = self.credentials.bearer_token() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let outcome = tokio::time::timeout(deadline, async {
            let response = request.send().await.map_err(TransportError::RequestFailed)?;
            let status = response.status().as_u16();
            let text = response.text().await.map_err(TransportError::RequestFailed)?;

            if !(200..300).contains(&status) {
                return Err(TransportError::Status {
                    status,
                    message: text,
                });
            }

            serde_json::from_str(&text).map_err(|e| TransportError::Decode {
                status,
                message: e.to_string(),
            })
        })
        .await;

        match outcome {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(deadline)),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
        timeout: Option<Duration>,
    ) -> Result<serde_json::Value> {
        let url = self.resolve(path)?;
        let deadline = timeout.unwrap_or(self.config.timeout);
        debug!("HTTP {method} {url}");

        self.retry
            .execute(|| self.attempt(method.clone(), url.clone(), body, deadline))
            .await
    }

    fn base_url(&self) -> &str {
        &self.config.base_url
    }
}

/// Create a shared transport (Arc-wrapped for cloning)
pub fn shared_transport(
    config: TransportConfig,
    credentials: Arc<dyn CredentialStore>,
) -> Result<Arc<dyn Transport>> {
    Ok(Arc::new(HttpTransport::new(config, credentials)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::StaticCredentialStore;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport_for(server_uri: &str, config: TransportConfig) -> HttpTransport {
        HttpTransport::new(
            TransportConfig {
                base_url: server_uri.to_string(),
                ..config
            },
            Arc::new(StaticCredentialStore::new("test-token")),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_post_json_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/completions"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"completions": []})))
            .expect(1)
            .mount(&server)
            .await;

        let transport = transport_for(&server.uri(), TransportConfig::new(""));
        let response = transport
            .post_json("/completions", &json!({"query": "ag"}))
            .await
            .unwrap();

        assert_eq!(response["completions"], json!([]));
    }

    #[tokio::test]
    async fn test_status_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(503).set_body_string("down"))
            .expect(1)
            .mount(&server)
            .await;

        let transport = transport_for(
            &server.uri(),
            TransportConfig::new("").with_max_retries(3),
        );
        let result = transport.get_json("/health").await;

        assert!(matches!(
            result,
            Err(TransportError::Status { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn test_unauthorized_surfaces_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let transport = transport_for(&server.uri(), TransportConfig::new(""));
        let result = transport.get_json("/health").await;

        assert!(matches!(
            result,
            Err(TransportError::Status { status: 401, .. })
        ));
    }

    #[tokio::test]
    async fn test_undecodable_body_surfaces_decode() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let transport = transport_for(&server.uri(), TransportConfig::new(""));
        let result = transport.get_json("/health").await;

        assert!(matches!(
            result,
            Err(TransportError::Decode { status: 200, .. })
        ));
    }

    #[tokio::test]
    async fn test_connection_refused_retries_then_surfaces_network() {
        // Nothing listens on this port
        let transport = HttpTransport::new(
            TransportConfig::new("http://127.0.0.1:9")
                .with_max_retries(1)
                .with_retry_delay(Duration::from_millis(10)),
            Arc::new(StaticCredentialStore::anonymous()),
        )
        .unwrap();

        let result = transport.get_json("/health").await;
        assert!(matches!(result, Err(TransportError::RequestFailed(_))));
    }

    #[tokio::test]
    async fn test_per_call_timeout_overrides_config() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let transport = transport_for(
            &server.uri(),
            TransportConfig::new("").with_max_retries(0),
        );
        let result = transport
            .request(
                Method::GET,
                "/slow",
                None,
                Some(Duration::from_millis(50)),
            )
            .await;

        assert!(matches!(result, Err(TransportError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_invalid_base_url() {
        let transport = HttpTransport::new(
            TransportConfig::new("not a url"),
            Arc::new(StaticCredentialStore::anonymous()),
        )
        .unwrap();

        let result = transport.get_json("/health").await;
        assert!(matches!(result, Err(TransportError::InvalidUrl(_))));
    }
}
