//! Replicator configuration file
//!
//! ```json
//! {
//!   "form_server_url": "https://api.commonform.org",
//!   "callback_endpoint": "https://mirror.example.com/forms",
//!   "listen_port": 8480
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::{CliError, CliResult};
use crate::http_server::HttpServerConfig;

/// Configuration for `formrepl replicate`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplicatorConfig {
    /// URL of the remote form server (required)
    #[serde(default)]
    pub form_server_url: String,

    /// URL the form server should POST new digests to (required)
    #[serde(default)]
    pub callback_endpoint: String,

    /// Local callback server
    #[serde(flatten)]
    pub listen: ListenConfig,
}

/// Bind settings for the local callback server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenConfig {
    /// Host to bind (default "0.0.0.0")
    #[serde(default = "default_listen_host")]
    pub listen_host: String,

    /// Port to bind (default 8480)
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Path of the callback route (default "/forms")
    #[serde(default = "default_callback_path")]
    pub callback_path: String,
}

fn default_listen_host() -> String {
    "0.0.0.0".to_string()
}
fn default_listen_port() -> u16 {
    8480
}
fn default_callback_path() -> String {
    "/forms".to_string()
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            listen_host: default_listen_host(),
            listen_port: default_listen_port(),
            callback_path: default_callback_path(),
        }
    }
}

impl ReplicatorConfig {
    /// Load configuration from file. Not validated; call
    /// [`validate`](Self::validate) after applying overrides.
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))
    }

    /// Apply command-line overrides
    pub fn with_overrides(
        mut self,
        form_server_url: Option<String>,
        callback_endpoint: Option<String>,
        listen_port: Option<u16>,
    ) -> Self {
        if let Some(url) = form_server_url {
            self.form_server_url = url;
        }
        if let Some(endpoint) = callback_endpoint {
            self.callback_endpoint = endpoint;
        }
        if let Some(port) = listen_port {
            self.listen.listen_port = port;
        }
        self
    }

    /// Validate required fields
    pub fn validate(&self) -> CliResult<()> {
        if self.form_server_url.trim().is_empty() {
            return Err(CliError::config_error("form_server_url is required"));
        }
        if self.callback_endpoint.trim().is_empty() {
            return Err(CliError::config_error("callback_endpoint is required"));
        }
        if !self.listen.callback_path.starts_with('/') {
            return Err(CliError::config_error(format!(
                "callback_path must start with '/': '{}'",
                self.listen.callback_path
            )));
        }
        Ok(())
    }

    /// Settings for the callback HTTP server
    pub fn http_server_config(&self) -> HttpServerConfig {
        HttpServerConfig {
            host: self.listen.listen_host.clone(),
            port: self.listen.listen_port,
            callback_path: self.listen.callback_path.clone(),
        }
    }
}
