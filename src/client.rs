// SPDX-License-Identifier: Apache-2.0

//! Transport to the document database.
//!
//! The driver talks to the database through the [`QueryRunner`] trait; the
//! production implementation posts serialized expressions over HTTP. Tests
//! plug in scripted runners instead.

use async_trait::async_trait;
use url::Url;

use crate::config::ConnectionConfig;
use crate::error::{DriverError, DriverResult};
use crate::fql::Expr;

/// Executes one query expression against the database and returns the raw
/// resource value from the response envelope.
#[async_trait]
pub trait QueryRunner: Send + Sync {
    async fn query(&self, expr: &Expr) -> DriverResult<serde_json::Value>;
}

/// HTTP client for the database's query endpoint.
///
/// Requests are `POST /` with the serialized expression as the body and the
/// secret as a bearer token. Responses carry either `{"resource": …}` or
/// `{"errors": [{code, description}, …]}`. Timeouts are left to the
/// underlying client; none are enforced at this layer.
pub struct HttpClient {
    http: reqwest::Client,
    endpoint: Url,
    secret: String,
}

impl HttpClient {
    pub fn new(config: &ConnectionConfig) -> DriverResult<Self> {
        Ok(Self {
            http: reqwest::Client::new(),
            endpoint: config.base_url()?,
            secret: config.secret.clone(),
        })
    }
}

#[async_trait]
impl QueryRunner for HttpClient {
    async fn query(&self, expr: &Expr) -> DriverResult<serde_json::Value> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(&self.secret)
            .json(expr)
            .send()
            .await
            .map_err(|e| DriverError::connection_failed(e.to_string()))?;

        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| DriverError::internal(format!("Invalid response body: {e}")))?;

        if !status.is_success() {
            return Err(DriverError::internal(describe_errors(&body, status)));
        }

        Ok(body.get("resource").cloned().unwrap_or(serde_json::Value::Null))
    }
}

fn describe_errors(body: &serde_json::Value, status: reqwest::StatusCode) -> String {
    let descriptions: Vec<&str> = body
        .get("errors")
        .and_then(|e| e.as_array())
        .map(|errors| {
            errors
                .iter()
                .filter_map(|e| e.get("description").and_then(|d| d.as_str()))
                .collect()
        })
        .unwrap_or_default();

    if descriptions.is_empty() {
        format!("Query failed with status {status}")
    } else {
        descriptions.join("; ")
    }
}
