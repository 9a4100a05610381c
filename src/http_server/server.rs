//! # HTTP Server
//!
//! Local server the form server calls back into, plus a health check.

use std::future::Future;
use std::io;

use axum::Router;
use tokio::net::TcpListener;

use super::callback_routes::callback_routes;
use super::config::HttpServerConfig;
use super::observability_routes::health_routes;
use crate::observability::{log_event_with_fields, Event};
use crate::replication::Replicator;

/// Callback server for a replicator
pub struct HttpServer {
    config: HttpServerConfig,
    router: Router,
}

impl HttpServer {
    /// Create a server with default configuration
    pub fn new(replicator: Replicator) -> Self {
        Self::with_config(replicator, HttpServerConfig::default())
    }

    /// Create a server with custom configuration
    pub fn with_config(replicator: Replicator, config: HttpServerConfig) -> Self {
        let router = Self::build_router(replicator, &config);
        Self { config, router }
    }

    fn build_router(replicator: Replicator, config: &HttpServerConfig) -> Router {
        Router::new()
            .merge(health_routes(replicator.clone()))
            .merge(callback_routes(replicator, &config.callback_path))
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Serve on an already-bound listener until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local = listener.local_addr()?.to_string();
        log_event_with_fields(
            Event::ServerStart,
            &[
                ("addr", local.as_str()),
                ("callback_path", self.config.callback_path.as_str()),
            ],
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
    }
}
