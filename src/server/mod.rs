//! Pricing form server
//!
//! Serves the HTML pricing form and a small JSON API: make/model lookups for
//! the form's dropdowns and single-advert price estimates.

mod api;
mod error;
mod handlers;
mod state;

pub use api::create_router;
pub use error::ServerError;
pub use handlers::PredictResponse;
pub use state::AppState;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Artifact served by `/api/predict`
    pub model_path: PathBuf,
    /// CSV feeding the make/model dropdowns
    pub lookup_csv: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("AUTOPRICE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("AUTOPRICE_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            model_path: std::env::var("AUTOPRICE_MODEL")
                .unwrap_or_else(|_| "models/gbr.json".to_string())
                .into(),
            lookup_csv: std::env::var("AUTOPRICE_LOOKUP_CSV")
                .unwrap_or_else(|_| "data/makes_models.csv".to_string())
                .into(),
        }
    }
}

impl ServerConfig {
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = path.into();
        self
    }

    pub fn with_lookup_csv(mut self, path: impl Into<PathBuf>) -> Self {
        self.lookup_csv = path.into();
        self
    }
}

/// Start the server with the given configuration
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let start_time = chrono::Utc::now();

    if !config.model_path.exists() {
        warn!(path = %config.model_path.display(), "Model artifact not found, predictions will fail until it exists");
    }
    if !config.lookup_csv.exists() {
        warn!(path = %config.lookup_csv.display(), "Lookup CSV not found, make/model lists will be unavailable");
    }

    let state = Arc::new(AppState::new(config.clone()));
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!(
        address = %addr,
        model = %config.model_path.display(),
        lookup = %config.lookup_csv.display(),
        started_at = %start_time.to_rfc3339(),
        "Pricing server starting"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(url = %format!("http://{}", addr), pid = std::process::id(), "Pricing form available");

    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Could not listen for ctrl+c");
            std::future::pending::<()>().await;
        }
        let uptime = chrono::Utc::now().signed_duration_since(start_time);
        info!(uptime_secs = uptime.num_seconds(), "Shutdown signal received, stopping server gracefully");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builders() {
        let config = ServerConfig::default()
            .with_host("127.0.0.1")
            .with_port(9000)
            .with_model_path("models/lr.json");
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9000);
        assert_eq!(config.model_path, PathBuf::from("models/lr.json"));
    }
}
