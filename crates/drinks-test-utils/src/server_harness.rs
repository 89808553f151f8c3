//! Test server harness for E2E testing
//!
//! Provides `TestDrinksServer` for spawning real drinks server instances in
//! tests, backed by the in-memory repository and a caller-supplied JWKS URL.

use crate::token_builders::{TEST_AUDIENCE, TEST_AUTH_DOMAIN};
use axum::Router;
use drinks_service::auth::AuthGate;
use drinks_service::config::Config;
use drinks_service::repositories::InMemoryDrinkRepository;
use drinks_service::routes::{self, AppState};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Environment for a test configuration pointing at `jwks_url`.
pub fn test_config_vars(jwks_url: &str) -> HashMap<String, String> {
    HashMap::from([
        (
            "DATABASE_URL".to_string(),
            "postgresql://test/test".to_string(),
        ),
        ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
        ("AUTH0_DOMAIN".to_string(), TEST_AUTH_DOMAIN.to_string()),
        ("API_AUDIENCE".to_string(), TEST_AUDIENCE.to_string()),
        ("JWKS_URL".to_string(), jwks_url.to_string()),
        ("JWKS_FETCH_TIMEOUT_SECONDS".to_string(), "2".to_string()),
    ])
}

/// Build the real application router over `repository`.
///
/// Uses a non-global Prometheus recorder so any number of routers can exist
/// in one test process.
pub fn test_router(
    config: &Config,
    repository: Arc<InMemoryDrinkRepository>,
) -> Router {
    let state = Arc::new(AppState {
        repository,
        auth_gate: AuthGate::from_config(config),
    });
    let metrics_handle = PrometheusBuilder::new().build_recorder().handle();

    routes::build_routes(state, metrics_handle)
}

/// Test harness for spawning the drinks server in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_list_drinks() -> Result<()> {
///     let jwks = MockJwks::start_default().await;
///     let server = TestDrinksServer::spawn(&jwks.jwks_url()).await?;
///
///     let response = reqwest::get(format!("{}/drinks", server.url())).await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestDrinksServer {
    addr: SocketAddr,
    config: Config,
    repository: Arc<InMemoryDrinkRepository>,
    _handle: JoinHandle<()>,
}

impl TestDrinksServer {
    /// Spawn a server with a seeded repository and default test configuration.
    pub async fn spawn(jwks_url: &str) -> Result<Self, anyhow::Error> {
        Self::spawn_with(test_config_vars(jwks_url), InMemoryDrinkRepository::seeded()).await
    }

    /// Spawn a server from explicit configuration variables and repository.
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Start the HTTP server in the background
    pub async fn spawn_with(
        vars: HashMap<String, String>,
        repository: InMemoryDrinkRepository,
    ) -> Result<Self, anyhow::Error> {
        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let repository = Arc::new(repository);
        let app = test_router(&config, repository.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            repository,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the repository backing the server.
    pub fn repository(&self) -> &Arc<InMemoryDrinkRepository> {
        &self.repository
    }
}

impl Drop for TestDrinksServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
