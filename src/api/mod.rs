//! HTTP client for the inference backend (`POST /predict`, `GET /health`).

use std::sync::Arc;
use std::time::Instant;

use reqwest::Client;
use reqwest::multipart::{Form, Part};
use tracing::{debug, error, info};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::models::{DetectionResult, ErrorBody, ServerStatus};
use crate::upload::ImageFile;

/// Anything that can classify an uploaded image.
pub trait PredictionService {
    async fn predict(&self, image: &ImageFile) -> Result<DetectionResult, ClientError>;
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    config: Arc<ClientConfig>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            config: Arc::new(config.clone()),
        })
    }

    /// Upload an image as multipart field `file` and return the detections.
    ///
    /// Every failure (network, timeout, non-2xx, unreadable body) becomes
    /// [`ClientError::Request`] carrying the server's `error` message when it
    /// sent one.
    pub async fn predict(&self, image: &ImageFile) -> Result<DetectionResult, ClientError> {
        let url = self.config.endpoint("/predict")?;
        let start = Instant::now();

        let part = Part::bytes(image.bytes.clone())
            .file_name(image.name.clone())
            .mime_str(image.mime_type())
            .map_err(|e| ClientError::request(None, Some(e.to_string())))?;
        let form = Form::new().part("file", part);

        debug!(url = %url, file = %image.name, bytes = image.bytes.len(), "Uploading image");

        let response = match self.client.post(url).multipart(form).send().await {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, timeout = e.is_timeout(), "Prediction request failed");
                return Err(ClientError::request(None, None));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let server_message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error);
            error!(
                status = status.as_u16(),
                message = server_message.as_deref().unwrap_or("<none>"),
                "Prediction rejected by server"
            );
            return Err(ClientError::request(Some(status.as_u16()), server_message));
        }

        let result = response.json::<DetectionResult>().await.map_err(|e| {
            error!(error = %e, "Prediction response could not be decoded");
            ClientError::request(Some(status.as_u16()), None)
        })?;

        info!(
            detected = result.total_detected,
            total_value = result.total_value,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Prediction received"
        );
        Ok(result)
    }

    /// Fetch backend status. Failures are returned as the raw transport error.
    pub async fn health(&self) -> Result<ServerStatus, ClientError> {
        let url = self.config.endpoint("/health")?;
        let status = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<ServerStatus>()
            .await?;
        debug!(status = %status.status, model_loaded = status.model_loaded, "Health check");
        Ok(status)
    }
}

impl PredictionService for ApiClient {
    async fn predict(&self, image: &ImageFile) -> Result<DetectionResult, ClientError> {
        ApiClient::predict(self, image).await
    }
}
