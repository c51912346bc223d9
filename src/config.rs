// SPDX-License-Identifier: Apache-2.0

//! Database connection configuration.

use std::fmt;

use url::Url;

use crate::error::{DriverError, DriverResult};

pub const DEFAULT_SCHEME: &str = "http";
pub const DEFAULT_PORT: u16 = 8443;

/// Connection parameters for the document database endpoint.
///
/// All four fields are required to build a client; `scheme` and `port` have
/// conventional defaults, the domain is chosen by the integrator.
#[derive(Clone)]
pub struct ConnectionConfig {
    pub scheme: String,
    pub domain: String,
    pub port: u16,
    pub secret: String,
}

impl ConnectionConfig {
    pub fn new(domain: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            scheme: DEFAULT_SCHEME.to_string(),
            domain: domain.into(),
            port: DEFAULT_PORT,
            secret: secret.into(),
        }
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// The query endpoint derived from scheme, domain and port.
    pub fn base_url(&self) -> DriverResult<Url> {
        Url::parse(&format!("{}://{}:{}/", self.scheme, self.domain, self.port))
            .map_err(|e| DriverError::connection_failed(format!("Invalid endpoint URL: {e}")))
    }
}

// The secret is an API key; keep it out of logs.
impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("scheme", &self.scheme)
            .field("domain", &self.domain)
            .field("port", &self.port)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}
