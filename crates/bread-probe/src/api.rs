//! HTTP client for the application's JSON API.
//!
//! Status codes are returned as data; deciding whether a status is
//! acceptable is left to [`crate::assertion::StatusClass`] and the fixture.

use crate::model::{CalculationRequest, SessionCredential, TestUser};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Errors from the API client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Transport failure (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// Server answered with a status the caller could not accept.
    #[error("unexpected status {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },
}

/// Response of one API call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,
    /// Parsed JSON body, `Null` when the body is not JSON
    pub body: serde_json::Value,
    /// Raw body text
    pub text: String,
    /// Round-trip duration
    pub elapsed: Duration,
}

impl ApiResponse {
    /// Identifier of a created resource, when the body carries one
    #[must_use]
    pub fn id(&self) -> Option<String> {
        match self.body.get("id")? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Fail unless the status is exactly `expected`
    pub fn ensure_status(self, expected: u16) -> Result<Self, ApiError> {
        if self.status == expected {
            Ok(self)
        } else {
            Err(ApiError::UnexpectedStatus {
                status: self.status,
                body: self.text,
            })
        }
    }
}

/// Client for the application API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl ApiClient {
    /// Create a client for `base_url` with a request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(base_url, client))
    }

    /// Create a client with a custom reqwest client.
    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `POST /auth/register`
    pub async fn register(&self, user: &TestUser) -> Result<ApiResponse, ApiError> {
        let url = format!("{}/auth/register", self.base_url);
        let request = self.client.post(&url).json(&user.registration());
        let response = Self::send(request).await?;
        tracing::debug!(username = %user.username, status = response.status, "register");
        Ok(response)
    }

    /// `POST /calculations`, authenticated when a credential is given
    pub async fn create_calculation(
        &self,
        credential: Option<&SessionCredential>,
        calculation: &CalculationRequest,
    ) -> Result<ApiResponse, ApiError> {
        let url = format!("{}/calculations", self.base_url);
        let mut request = self.client.post(&url).json(calculation);
        if let Some(credential) = credential {
            request = request.header(reqwest::header::AUTHORIZATION, credential.bearer());
        }
        let response = Self::send(request).await?;
        tracing::debug!(kind = %calculation.kind, status = response.status, "create calculation");
        Ok(response)
    }

    async fn send(request: reqwest::RequestBuilder) -> Result<ApiResponse, ApiError> {
        let start = Instant::now();
        let resp = request.send().await?;
        let status = resp.status().as_u16();
        let text = resp.text().await?;
        let body = serde_json::from_str(&text).unwrap_or(serde_json::Value::Null);
        Ok(ApiResponse {
            status,
            body,
            text,
            elapsed: start.elapsed(),
        })
    }
}
