//! HTTP seam between the state machine and the wire
//!
//! The client drives everything through [`EngineTransport`], so tests can
//! substitute a scripted transport and the production implementation stays a
//! thin reqwest wrapper. Implementations tag network failures as `Transport`
//! at the point of origin; status-code classification belongs to the caller.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::DiarizationError;

/// Status and body of one completed round-trip
#[derive(Debug, Clone)]
pub struct EngineResponse {
    pub status: u16,
    pub body: String,
}

impl EngineResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait EngineTransport: Send + Sync {
    /// POST raw bytes with a binary content type
    async fn post_binary(
        &self,
        url: &str,
        auth: &str,
        body: Vec<u8>,
    ) -> Result<EngineResponse, DiarizationError>;

    /// POST a JSON document
    async fn post_json(
        &self,
        url: &str,
        auth: &str,
        body: serde_json::Value,
    ) -> Result<EngineResponse, DiarizationError>;

    /// GET a resource
    async fn get(&self, url: &str, auth: &str) -> Result<EngineResponse, DiarizationError>;
}

/// Production transport backed by a shared reqwest client
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(request_timeout: Duration) -> Result<Self, DiarizationError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(request_timeout)
            .build()
            .map_err(|e| {
                DiarizationError::Configuration(format!("failed to build HTTP client: {}", e))
            })?;
        Ok(Self { client })
    }

    async fn read_response(
        response: reqwest::Response,
    ) -> Result<EngineResponse, DiarizationError> {
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(EngineResponse { status, body })
    }
}

#[async_trait]
impl EngineTransport for HttpTransport {
    async fn post_binary(
        &self,
        url: &str,
        auth: &str,
        body: Vec<u8>,
    ) -> Result<EngineResponse, DiarizationError> {
        let response = self
            .client
            .post(url)
            .header("authorization", auth)
            .header("content-type", "application/octet-stream")
            .body(body)
            .send()
            .await?;
        Self::read_response(response).await
    }

    async fn post_json(
        &self,
        url: &str,
        auth: &str,
        body: serde_json::Value,
    ) -> Result<EngineResponse, DiarizationError> {
        let response = self
            .client
            .post(url)
            .header("authorization", auth)
            .json(&body)
            .send()
            .await?;
        Self::read_response(response).await
    }

    async fn get(&self, url: &str, auth: &str) -> Result<EngineResponse, DiarizationError> {
        let response = self
            .client
            .get(url)
            .header("authorization", auth)
            .send()
            .await?;
        Self::read_response(response).await
    }
}
