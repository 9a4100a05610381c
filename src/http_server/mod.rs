//! # HTTP Server Module
//!
//! The local endpoint the remote form server calls back into.
//!
//! # Endpoints
//!
//! - `/health` - Health check with replication state
//! - `POST <callback_path>` - New-form callback, body is a digest

pub mod callback_routes;
pub mod config;
pub mod observability_routes;
pub mod server;

pub use callback_routes::callback_routes;
pub use config::HttpServerConfig;
pub use server::HttpServer;
