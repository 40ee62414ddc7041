//! Test server harness for E2E testing
//!
//! Provides `MockJwks`, a wiremock-backed stand-in for the Entra ID key
//! endpoint, and `TestGatewayServer` for spawning real gateway instances.

use crate::crypto_fixtures::{jwks_document, TestRsaKey};
use gateway_service::config::Config;
use gateway_service::observability::metrics::init_metrics_recorder;
use gateway_service::routes::{self, AppState};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_TENANT_ID: &str = "tenant-123";
pub const TEST_CLIENT_ID: &str = "client-456";
pub const TEST_AUDIENCE: &str = "api://client-456";
pub const TEST_V1_ISSUER: &str = "https://sts.windows.net/tenant-123/";
pub const TEST_V2_ISSUER: &str = "https://login.microsoftonline.com/tenant-123/v2.0";

/// Path the mock serves the key set on, mirroring Entra ID's layout.
pub const JWKS_PATH: &str = "/discovery/v2.0/keys";

/// Global metrics handle shared by every server in the test binary.
///
/// The Prometheus recorder can only be installed once per process; later
/// callers fall back to an unattached handle.
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            init_metrics_recorder().unwrap_or_else(|_| PrometheusBuilder::new().build_recorder().handle())
        })
        .clone()
}

/// Mock JWKS endpoint.
///
/// # Example
/// ```rust,ignore
/// let key = TestRsaKey::primary("kid-1");
/// let jwks = MockJwks::start().await;
/// jwks.serve_keys(&[&key]).await;
/// let server = TestGatewayServer::spawn(&jwks.jwks_url()).await?;
/// ```
pub struct MockJwks {
    server: MockServer,
}

impl MockJwks {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Serve `keys` on every request.
    pub async fn serve_keys(&self, keys: &[&TestRsaKey]) {
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_document(keys)))
            .mount(&self.server)
            .await;
    }

    /// Serve `keys` and verify on drop that exactly `times` fetches happened.
    pub async fn serve_keys_expecting(&self, keys: &[&TestRsaKey], times: u64) {
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_document(keys)))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    /// Answer every fetch with a bare status code.
    pub async fn respond_with_status(&self, status: u16) {
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Answer every fetch with a raw body.
    pub async fn respond_with_body(&self, body: &str) {
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&self.server)
            .await;
    }

    /// Drop every mounted response, e.g. before publishing a rotated key set.
    pub async fn reset(&self) {
        self.server.reset().await;
    }

    /// Number of key-set fetches received so far.
    pub async fn fetch_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or(0)
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn jwks_url(&self) -> String {
        format!("{}{}", self.server.uri(), JWKS_PATH)
    }
}

/// Environment for an enforcing gateway against the test tenant.
pub fn enforced_vars(jwks_url: &str) -> HashMap<String, String> {
    HashMap::from([
        ("ENABLE_AUTH".to_string(), "true".to_string()),
        ("AZURE_TENANT_ID".to_string(), TEST_TENANT_ID.to_string()),
        ("AZURE_CLIENT_ID".to_string(), TEST_CLIENT_ID.to_string()),
        ("JWKS_URL".to_string(), jwks_url.to_string()),
        ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
    ])
}

/// Test harness for spawning the gateway in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_health_flow_e2e() -> Result<()> {
///     let server = TestGatewayServer::spawn_disabled().await?;
///     let client = reqwest::Client::new();
///
///     let response = client
///         .get(format!("{}/health", server.url()))
///         .send()
///         .await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestGatewayServer {
    addr: SocketAddr,
    config: Config,
    _handle: JoinHandle<()>,
}

impl TestGatewayServer {
    /// Spawn an enforcing gateway that resolves keys from `jwks_url`.
    pub async fn spawn(jwks_url: &str) -> Result<Self, anyhow::Error> {
        Self::spawn_with_vars(enforced_vars(jwks_url)).await
    }

    /// Spawn a gateway with auth disabled.
    pub async fn spawn_disabled() -> Result<Self, anyhow::Error> {
        Self::spawn_with_vars(HashMap::from([
            ("ENABLE_AUTH".to_string(), "false".to_string()),
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
        ]))
        .await
    }

    /// Spawn a gateway from an explicit environment.
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Start the HTTP server in the background
    pub async fn spawn_with_vars(vars: HashMap<String, String>) -> Result<Self, anyhow::Error> {
        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let state = Arc::new(AppState::from_config(config.clone()));
        let app = routes::build_routes(state, metrics_handle());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            _handle: handle,
        })
    }

    /// Get the base URL for making HTTP requests.
    ///
    /// Returns a URL like "http://127.0.0.1:12345"
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for TestGatewayServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
