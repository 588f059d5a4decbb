use std::time::Duration;

use url::Url;

use crate::error::ClientError;

/// Backend used when neither `--api-url` nor `BILLETES_API_URL` is set.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Path of the streaming endpoint, relative to the API base URL.
pub const STREAM_PATH: &str = "/ws/predict";

/// Everything the client needs to reach the backend and drive the camera.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the inference backend (HTTP or HTTPS)
    pub api_url: Url,

    /// Upper bound for a single HTTP request
    pub request_timeout: Duration,

    pub camera: CameraConfig,
    pub stream: StreamConfig,
}

#[derive(Debug, Clone)]
pub struct CameraConfig {
    /// Device used when no facing mode is requested
    pub default_device: String,

    /// Device that satisfies the rear-facing ("environment") preference, if any
    pub environment_device: Option<String>,

    pub width: u32,
    pub height: u32,

    /// ffmpeg executable used to read the capture device
    pub ffmpeg_bin: String,
}

#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Wall-clock cadence of the capture/send loop
    pub frame_interval: Duration,

    /// JPEG quality (1-100) for transmitted frames
    pub jpeg_quality: u8,

    /// How long to wait for the first camera frame before giving up
    pub bind_timeout: Duration,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            default_device: "/dev/video0".to_string(),
            environment_device: None,
            width: 640,
            height: 480,
            ffmpeg_bin: "ffmpeg".to_string(),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            frame_interval: Duration::from_millis(200),
            jpeg_quality: 80,
            bind_timeout: Duration::from_secs(5),
        }
    }
}

impl ClientConfig {
    pub fn new(api_url: &str) -> Result<Self, ClientError> {
        let api_url = parse_api_url(api_url)?;
        Ok(Self {
            api_url,
            request_timeout: Duration::from_secs(30),
            camera: CameraConfig::default(),
            stream: StreamConfig::default(),
        })
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Join `path` onto the API base URL.
    pub fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        let base = self.api_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Url::parse(&format!("{base}/{path}"))
            .map_err(|e| ClientError::Config(format!("invalid endpoint {path:?}: {e}")))
    }

    /// Streaming endpoint derived from the same base URL (`http` → `ws`, `https` → `wss`).
    pub fn ws_url(&self) -> Result<Url, ClientError> {
        let mut url = self.endpoint(STREAM_PATH)?;
        let scheme = match url.scheme() {
            "https" => "wss",
            _ => "ws",
        };
        url.set_scheme(scheme)
            .map_err(|_| ClientError::Config(format!("cannot derive websocket url from {}", self.api_url)))?;
        Ok(url)
    }
}

fn parse_api_url(raw: &str) -> Result<Url, ClientError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ClientError::Config(format!("invalid api url {raw:?}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ClientError::Config(format!(
            "api url must use http or https, got {other:?}"
        ))),
    }
}
