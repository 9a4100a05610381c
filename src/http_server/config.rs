//! HTTP Server Configuration
//!
//! Bind address and callback path for the local callback server.

use serde::{Deserialize, Serialize};

/// Largest callback body accepted, in bytes. A digest is 64.
pub const MAX_CALLBACK_BODY: usize = 4096;

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpServerConfig {
    /// Host to bind to (default: "0.0.0.0")
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to (default: 8480)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path the form server POSTs digests to (default: "/forms")
    #[serde(default = "default_callback_path")]
    pub callback_path: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8480
}

fn default_callback_path() -> String {
    "/forms".to_string()
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            callback_path: default_callback_path(),
        }
    }
}

impl HttpServerConfig {
    /// Create a new config with specified port
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
