mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::FromRef;
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::forum::Collaborators;

/// Widget template shipped with the binary.
pub const BUNDLED_TEMPLATE: &str = include_str!("../../templates/comments.tpl");

/// Shared application state.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub config: Arc<Config>,
    pub services: Collaborators,
    /// Widget template, loaded once at startup.
    pub template: Arc<str>,
}

impl AppState {
    #[must_use]
    pub fn new(config: Config, services: Collaborators, template: Arc<str>) -> Self {
        Self {
            config: Arc::new(config),
            services,
            template,
        }
    }
}

/// Load the widget template from `TEMPLATE_PATH`, or fall back to the bundled one.
///
/// # Errors
///
/// Returns an error if a configured template file cannot be read.
pub async fn load_template(config: &Config) -> Result<Arc<str>> {
    let Some(path) = &config.template_path else {
        return Ok(Arc::from(BUNDLED_TEMPLATE));
    };

    let template = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read widget template: {}", path.display()))?;
    info!(path = %path.display(), "Loaded widget template");
    Ok(Arc::from(template))
}

/// Start the web server.
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn serve(state: AppState) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", state.config.web_host, state.config.web_port)
        .parse()
        .context("Invalid web server address")?;

    let app = create_app(state);

    info!(addr = %addr, "Starting HTTP web server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind web server")?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("Web server error")?;

    Ok(())
}

/// Create the main application router.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(routes::router())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
