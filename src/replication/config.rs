//! Form Server Descriptor
//!
//! Connection parameters resolved once from the configured URL when a
//! session starts, and read-only for the rest of the session. The scheme
//! selects the transport; anything other than `http` or `https` is refused.

use std::fmt;

use url::Url;

use super::errors::{ReplicationError, ReplicationResult};

/// Transport selected by URL scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// Plain HTTP
    Plain,
    /// HTTP over TLS
    Encrypted,
}

impl Transport {
    /// URL scheme for this transport
    pub fn scheme(&self) -> &'static str {
        match self {
            Transport::Plain => "http",
            Transport::Encrypted => "https",
        }
    }

    /// Port used when the URL does not name one
    pub fn default_port(&self) -> u16 {
        match self {
            Transport::Plain => 80,
            Transport::Encrypted => 443,
        }
    }
}

/// Basic-auth credentials taken from the URL userinfo
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// User name
    pub username: String,
    /// Password, if given
    pub password: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Resolved connection parameters of the remote form server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormServer {
    /// Transport chosen from the scheme
    pub transport: Transport,
    /// Host name or address
    pub host: String,
    /// Port (explicit or scheme default)
    pub port: u16,
    /// Optional basic-auth credentials
    pub credentials: Option<Credentials>,
}

impl FormServer {
    /// Resolve a form server URL such as `https://api.commonform.org`.
    pub fn parse(form_server_url: &str) -> ReplicationResult<Self> {
        let url = Url::parse(form_server_url)
            .map_err(|e| ReplicationError::InvalidUrl(format!("{}: {}", form_server_url, e)))?;

        let transport = match url.scheme() {
            "http" => Transport::Plain,
            "https" => Transport::Encrypted,
            other => {
                return Err(ReplicationError::InvalidUrl(format!(
                    "unsupported scheme '{}'",
                    other
                )))
            }
        };

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ReplicationError::InvalidUrl(format!("{}: missing host", form_server_url)))?
            .to_string();

        let port = url.port().unwrap_or_else(|| transport.default_port());

        let credentials = if url.username().is_empty() {
            None
        } else {
            Some(Credentials {
                username: url.username().to_string(),
                password: url.password().map(str::to_string),
            })
        };

        Ok(Self {
            transport,
            host,
            port,
            credentials,
        })
    }

    /// Base URL without credentials or path, e.g. `http://localhost:8080`
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.transport.scheme(), self.host, self.port)
    }

    /// Absolute URL for a server path
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }
}
