//! Remote inference server client

use std::time::Duration;

use pbrforge_config::ForgeConfig;
use pbrforge_ipc::{ErrorBody, HealthResponse, TextureRequest, TextureResponse};
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::{GenerationError, TextureBackend};

/// HTTP client for a texture generation server exposing `/generate`
/// and `/health`.
#[derive(Debug, Clone)]
pub struct RemoteBackend {
    server_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl RemoteBackend {
    pub fn new(server_url: impl Into<String>, timeout: Duration) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::ConnectionFailure(e.to_string()))?;

        Ok(Self {
            server_url: server_url.into().trim_end_matches('/').to_string(),
            timeout,
            client,
        })
    }

    pub fn from_config(config: &ForgeConfig) -> Result<Self, GenerationError> {
        Self::new(config.backend_url.clone(), config.timeout())
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Query `GET /health`
    pub async fn health(&self) -> Result<HealthResponse, GenerationError> {
        let response = self
            .client
            .get(format!("{}/health", self.server_url))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(error_from_status(response.status(), response.text().await.ok()));
        }

        response
            .json::<HealthResponse>()
            .await
            .map_err(|e| GenerationError::DecodeFailure(e.to_string()))
    }

    fn transport_error(&self, error: reqwest::Error) -> GenerationError {
        if error.is_timeout() {
            GenerationError::ConnectionFailure(format!(
                "no response from {} within {}s",
                self.server_url,
                self.timeout.as_secs()
            ))
        } else {
            GenerationError::ConnectionFailure(error.to_string())
        }
    }
}

impl TextureBackend for RemoteBackend {
    async fn generate(&self, request: TextureRequest) -> Result<TextureResponse, GenerationError> {
        let url = format!("{}/generate", self.server_url);
        debug!(
            "POST {} prompt={:?} resolution={} tileable={}",
            url, request.prompt, request.resolution, request.tileable
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.ok();
            let error = error_from_status(status, body);
            warn!("Backend returned {}: {}", status, error);
            return Err(error);
        }

        response
            .json::<TextureResponse>()
            .await
            .map_err(|e| GenerationError::DecodeFailure(e.to_string()))
    }
}

/// Map a non-success status and its body to the error taxonomy
fn error_from_status(status: StatusCode, body: Option<String>) -> GenerationError {
    let parsed = body
        .as_deref()
        .and_then(|text| serde_json::from_str::<ErrorBody>(text).ok())
        .map(|b| b.error);
    let message = parsed
        .or(body)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| status.to_string());

    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            GenerationError::RemoteRejected(message)
        }
        StatusCode::INSUFFICIENT_STORAGE => GenerationError::ResourceExhausted(message),
        other => GenerationError::Backend {
            status: other.as_u16(),
            message,
        },
    }
}
