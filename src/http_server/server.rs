//! # HTTP Server
//!
//! Builds the application router from a `ServerConfig` and serves it.
//! The catalog and executor pair is chosen from the configuration:
//! a static catalog file replaces catalog queries, and dry-run mode
//! replaces execution.

use std::net::SocketAddr;

use axum::{body::Body, http::Request, routing::get, Json, Router};
use sqlx::postgres::{PgPool, PgPoolOptions};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, info_span, warn};
use uuid::Uuid;

use crate::executor::{DryRunExecutor, PgExecutor, StatementExecutor};
use crate::rest_api::handler::TableHandler;
use crate::rest_api::response::HealthResponse;
use crate::rest_api::{RestError, RestServer};
use crate::schema::{CatalogProvider, PgCatalog, StaticCatalog};

use super::config::{ConfigError, ServerConfig};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("database connection failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("catalog unavailable: {0}")]
    Catalog(#[from] RestError),

    #[error("invalid bind address {0}")]
    Address(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// HTTP server for the table API
pub struct HttpServer {
    config: ServerConfig,
    router: Router,
}

impl HttpServer {
    /// Create a server around an existing handler
    pub fn with_handler<C: CatalogProvider, E: StatementExecutor>(
        config: ServerConfig,
        handler: TableHandler<C, E>,
    ) -> Self {
        let router = build_router(&config, handler);
        Self { config, router }
    }

    /// Create a server from configuration, connecting to the database
    /// unless the static catalog and dry-run mode make it unnecessary
    pub async fn from_config(config: ServerConfig) -> Result<Self, ServerError> {
        config.validate()?;
        let handler_config = config.handler_config();

        let catalog = match &config.catalog_file {
            Some(path) => {
                let catalog = StaticCatalog::from_file(path)?;
                info!(path = %path.display(), snapshots = catalog.len(), "loaded static catalog");
                Some(catalog)
            }
            None => None,
        };

        let catalog = match (catalog, config.dry_run) {
            (Some(catalog), true) => {
                let handler = TableHandler::new(catalog, DryRunExecutor::new(), handler_config);
                return Ok(Self::with_handler(config, handler));
            }
            (catalog, _) => catalog,
        };

        let pool = connect(&config).await?;
        let server = match (catalog, config.dry_run) {
            (Some(catalog), _) => {
                let handler = TableHandler::new(catalog, PgExecutor::new(pool), handler_config);
                Self::with_handler(config, handler)
            }
            (None, true) => {
                let handler =
                    TableHandler::new(PgCatalog::new(pool), DryRunExecutor::new(), handler_config);
                Self::with_handler(config, handler)
            }
            (None, false) => {
                let handler = TableHandler::new(
                    PgCatalog::new(pool.clone()),
                    PgExecutor::new(pool),
                    handler_config,
                );
                Self::with_handler(config, handler)
            }
        };
        Ok(server)
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Start the HTTP server and run until Ctrl-C
    pub async fn start(self) -> Result<(), ServerError> {
        let addr: SocketAddr = self
            .config
            .socket_addr()
            .parse()
            .map_err(|_| ServerError::Address(self.config.socket_addr()))?;

        let listener = TcpListener::bind(addr).await?;
        info!(%addr, dry_run = self.config.dry_run, "listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("server stopped");
        Ok(())
    }
}

async fn connect(config: &ServerConfig) -> Result<PgPool, ServerError> {
    let url = config.database_url.as_deref().ok_or_else(|| {
        ConfigError::Invalid("database_url is required".to_string())
    })?;
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(url)
        .await?;
    info!(max_connections = config.max_connections, "connected to database");
    Ok(pool)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

/// Liveness route
pub fn health_routes() -> Router {
    Router::new().route("/health", get(|| async { Json(HealthResponse::ok()) }))
}

/// Build the combined router with CORS and request tracing
pub fn build_router<C: CatalogProvider, E: StatementExecutor>(
    config: &ServerConfig,
    handler: TableHandler<C, E>,
) -> Router {
    // Configure CORS from config
    let cors = if config.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|s| s.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .merge(health_routes())
        .merge(RestServer::new(handler).router())
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                info_span!(
                    "request",
                    id = %Uuid::new_v4(),
                    method = %req.method(),
                    uri = %req.uri(),
                )
            }),
        )
        .layer(cors)
}
