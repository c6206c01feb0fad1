//! Server management - serving the site under test and health checking it

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use axum::{routing::get, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};

/// Ephemeral server the suites run against
///
/// `stop` must be safe to call more than once, and after a failed `start`.
#[async_trait]
pub trait SiteServer: Send {
    /// Start serving and return the base URL
    async fn start(&mut self) -> E2eResult<String>;

    /// Stop serving
    async fn stop(&mut self) -> E2eResult<()>;
}

/// Handle to a running in-process static file server
pub struct ServerHandle {
    base_url: String,
    port: u16,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<std::io::Result<()>>>,
}

impl ServerHandle {
    /// Bind the configured address and serve the site directory
    pub async fn spawn(config: &ServerConfig) -> E2eResult<Self> {
        if !config.site_dir.is_dir() {
            return Err(E2eError::ServerStartup(format!(
                "Site directory not found: {}",
                config.site_dir.display()
            )));
        }

        let addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| E2eError::ServerStartup(format!("Failed to bind {}: {}", addr, e)))?;
        let local_addr = listener.local_addr()?;
        let base_url = format!("http://{}", local_addr);

        info!("Serving {} at {}", config.site_dir.display(), base_url);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let router = site_router(&config.site_dir);
        let task = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        let mut handle = ServerHandle {
            base_url,
            port: local_addr.port(),
            shutdown: Some(shutdown_tx),
            task: Some(task),
        };

        if let Err(e) = handle.wait_for_healthy(config.startup_timeout()).await {
            let _ = handle.stop().await;
            return Err(e);
        }

        info!("Server is healthy at {}", handle.base_url);
        Ok(handle)
    }

    /// Wait for the server to respond to health checks
    async fn wait_for_healthy(&self, timeout_duration: Duration) -> E2eResult<()> {
        let health_url = format!("{}/health", self.base_url);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;

        let start = std::time::Instant::now();
        let mut attempts = 0;

        while start.elapsed() < timeout_duration {
            attempts += 1;

            match client.get(&health_url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    return Ok(());
                }
                Ok(resp) => {
                    warn!("Health check returned {}", resp.status());
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for server to start...");
                    }
                    if !e.is_connect() {
                        warn!("Health check error: {}", e);
                    }
                }
            }

            sleep(Duration::from_millis(100)).await;
        }

        Err(E2eError::ServerHealthCheck(attempts))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Stop the server, waiting briefly for in-flight requests
    pub async fn stop(&mut self) -> E2eResult<()> {
        if let Some(shutdown) = self.shutdown.take() {
            info!("Stopping server at {}", self.base_url);
            let _ = shutdown.send(());
        }

        if let Some(task) = self.task.take() {
            let abort = task.abort_handle();
            match timeout(Duration::from_secs(5), task).await {
                Ok(Ok(Ok(()))) => {}
                Ok(Ok(Err(e))) => warn!("Server exited with error: {}", e),
                Ok(Err(e)) => warn!("Server task failed: {}", e),
                Err(_) => {
                    warn!("Server did not shut down within 5s, aborting");
                    abort.abort();
                }
            }
        }

        Ok(())
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

fn site_router(site_dir: &Path) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .fallback_service(ServeDir::new(site_dir))
        .layer(TraceLayer::new_for_http())
}

/// [`SiteServer`] backed by [`ServerHandle`]
pub struct StaticSiteServer {
    config: ServerConfig,
    handle: Option<ServerHandle>,
}

impl StaticSiteServer {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            handle: None,
        }
    }
}

#[async_trait]
impl SiteServer for StaticSiteServer {
    async fn start(&mut self) -> E2eResult<String> {
        if let Some(handle) = &self.handle {
            return Ok(handle.base_url().to_string()); // Already running
        }

        let handle = ServerHandle::spawn(&self.config).await?;
        let base_url = handle.base_url().to_string();
        self.handle = Some(handle);
        Ok(base_url)
    }

    async fn stop(&mut self) -> E2eResult<()> {
        if let Some(mut handle) = self.handle.take() {
            handle.stop().await?;
        }
        Ok(())
    }
}

/// Configuration for the site server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Directory containing the static site
    pub site_dir: PathBuf,

    /// Interface to bind
    pub host: String,

    /// Port to listen on (0 = any free port)
    pub port: u16,

    /// Seconds to wait for the health check to pass
    pub startup_timeout_secs: u64,
}

impl ServerConfig {
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            site_dir: PathBuf::from("saturday-run-coffee-club"),
            host: "127.0.0.1".to_string(),
            port: 8000,
            startup_timeout_secs: 30,
        }
    }
}
