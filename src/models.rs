use serde::{Deserialize, Serialize};

/// One classified banknote as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "class")]
    pub label: String,

    /// Confidence as a percentage (0-100)
    pub confidence: f64,

    pub is_colombian: bool,

    #[serde(default)]
    pub message: String,
}

/// Response of `POST /predict` and payload of each successful streaming frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    #[serde(default)]
    pub success: bool,

    pub total_detected: u32,

    /// Sum of the recognised Colombian denominations, in COP
    pub total_value: f64,

    /// Milliseconds spent in inference (upload responses)
    #[serde(default)]
    pub inference_time: Option<f64>,

    /// Server-side frames per second (streaming responses)
    #[serde(default)]
    pub fps: Option<f64>,

    /// `data:image/jpeg;base64,...` rendering with bounding boxes
    #[serde(default)]
    pub annotated_image: String,

    #[serde(default)]
    pub detections: Vec<Detection>,
}

impl DetectionResult {
    pub fn colombian_count(&self) -> usize {
        self.detections.iter().filter(|d| d.is_colombian).count()
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerStatus {
    pub status: String,

    #[serde(default)]
    pub model_loaded: bool,

    #[serde(default)]
    pub gpu_available: bool,
}

impl ServerStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy" && self.model_loaded
    }
}

/// A text frame pushed by the streaming endpoint, classified.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    Detection(DetectionResult),
    ServerError(String),
}

/// Error body returned by the backend (`{"error": "..."}`).
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: Option<String>,
}

/// Classify a streaming message.
///
/// `{"success": true, ...}` becomes a detection, `{"error": "..."}` a server
/// error. Anything else, including invalid JSON, is an error for the caller to log.
pub fn parse_inbound(text: &str) -> Result<InboundMessage, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(text)?;

    if value.get("success").and_then(|v| v.as_bool()) == Some(true) {
        return serde_json::from_value(value).map(InboundMessage::Detection);
    }

    match value.get("error") {
        Some(serde_json::Value::String(message)) => {
            Ok(InboundMessage::ServerError(message.clone()))
        }
        Some(other) => Ok(InboundMessage::ServerError(other.to_string())),
        None => Err(serde::de::Error::custom(
            "message carries neither a success payload nor an error",
        )),
    }
}
