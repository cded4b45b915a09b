//! HTTP transport over reqwest.
//!
//! This is the only place raw HTTP failures exist. Every failure leaves as a
//! tagged [`TransportError`]; nothing above this layer inspects reqwest types.

use crate::config::{AuthConfig, ClientConfig};
use crate::error::ClientError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tradedesk_core::{ErrorBody, TenantId, TransportError};

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    auth_headers: HeaderMap,
    tenant_header: HeaderName,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;
        let tenant_header = HeaderName::from_bytes(config.tenant_header.trim().as_bytes())
            .map_err(|e| ClientError::InvalidHeader {
                name: "tenant_header",
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            auth_headers: build_auth_headers(&config.auth)?,
            tenant_header,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue exactly one request and return the decoded JSON body.
    ///
    /// Empty success bodies (e.g. `204 No Content`) come back as `Value::Null`.
    pub async fn send(
        &self,
        method: Method,
        tenant_id: TenantId,
        path: &str,
        query: &[(&'static str, String)],
        body: Option<&Value>,
    ) -> Result<Value, TransportError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(method = %method, url = %url, tenant_id = %tenant_id, "dispatching request");

        let mut request = self
            .client
            .request(method, url)
            .headers(self.auth_headers.clone())
            .header(self.tenant_header.clone(), tenant_id.to_string())
            .header(reqwest::header::ACCEPT, "application/json");
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(map_reqwest_error)?;
        parse_response(response).await
    }
}

async fn parse_response(response: reqwest::Response) -> Result<Value, TransportError> {
    let status = response.status();
    let text = response.text().await.map_err(map_reqwest_error)?;

    if status.is_success() {
        if status == StatusCode::NO_CONTENT || text.trim().is_empty() {
            return Ok(Value::Null);
        }
        return serde_json::from_str(&text).map_err(|e| TransportError::Decode {
            message: e.to_string(),
        });
    }

    // Non-JSON error pages still classify by status.
    let body = serde_json::from_str::<ErrorBody>(&text).unwrap_or_default();
    tracing::debug!(status = status.as_u16(), "request failed");
    Err(TransportError::status(status.as_u16(), body))
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    let message = err.to_string();
    if err.is_timeout() {
        TransportError::Timeout { message }
    } else if err.is_decode() {
        TransportError::Decode { message }
    } else {
        TransportError::Network { message }
    }
}

fn build_auth_headers(auth: &AuthConfig) -> Result<HeaderMap, ClientError> {
    let mut headers = HeaderMap::new();
    if let Some(api_key) = &auth.api_key {
        headers.insert(
            HeaderName::from_static("x-api-key"),
            HeaderValue::from_str(api_key).map_err(|e| ClientError::InvalidHeader {
                name: "x-api-key",
                reason: e.to_string(),
            })?,
        );
    }
    if let Some(jwt) = &auth.jwt {
        let value = format!("Bearer {}", jwt);
        headers.insert(
            reqwest::header::AUTHORIZATION,
            HeaderValue::from_str(&value).map_err(|e| ClientError::InvalidHeader {
                name: "authorization",
                reason: e.to_string(),
            })?,
        );
    }
    Ok(headers)
}
