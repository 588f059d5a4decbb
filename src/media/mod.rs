//! Camera acquisition.
//!
//! A [`CameraProvider`] opens a [`MediaStream`] for a set of
//! [`VideoConstraints`]; the stream publishes its newest frame through a
//! `watch` channel so consumers always read the latest picture and never queue.

pub mod fake;
pub mod ffmpeg;

use std::sync::Arc;
use std::time::Duration;

use image::RgbImage;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::error::{ClientError, MediaError};

pub use fake::FakeCamera;
pub use ffmpeg::FfmpegCamera;

/// A captured RGB frame, shared between the capture thread and consumers.
pub type Frame = Arc<RgbImage>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacingMode {
    /// Rear camera of a handheld device
    Environment,
    /// Front/selfie camera
    User,
}

/// Requested capture settings. Width and height are ideals, not requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoConstraints {
    pub width: u32,
    pub height: u32,
    pub facing: Option<FacingMode>,
}

impl VideoConstraints {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            facing: None,
        }
    }

    pub fn with_facing(mut self, facing: Option<FacingMode>) -> Self {
        self.facing = facing;
        self
    }
}

/// A live camera stream.
pub trait MediaStream: Send + Sync {
    /// Human readable device name, for logs
    fn label(&self) -> &str;

    /// Receiver that always holds the most recent frame (`None` until the first one)
    fn frames(&self) -> watch::Receiver<Option<Frame>>;

    /// Stop every track. Calling it again is a no-op.
    fn stop(&self) -> Result<(), MediaError>;

    fn is_live(&self) -> bool;
}

pub trait CameraProvider: Send + Sync {
    fn open(&self, constraints: &VideoConstraints) -> Result<Arc<dyn MediaStream>, MediaError>;
}

/// Two-tier acquisition: prefer the rear camera, then retry once with no
/// facing constraint. A tier only counts once its stream has delivered a
/// frame within `bind_timeout`; a stream that stays silent is stopped before
/// moving on. Both tiers failing is a [`ClientError::MediaAccess`].
pub async fn acquire_camera(
    provider: &dyn CameraProvider,
    base: VideoConstraints,
    bind_timeout: Duration,
) -> Result<Arc<dyn MediaStream>, ClientError> {
    let preferred = base.with_facing(Some(FacingMode::Environment));
    match open_bound(provider, &preferred, bind_timeout).await {
        Ok(stream) => {
            info!(device = stream.label(), "Camera started (rear-facing)");
            return Ok(stream);
        }
        Err(e) => {
            warn!(error = %e, "No rear-facing camera, retrying with any camera");
        }
    }

    let stream = open_bound(provider, &base.with_facing(None), bind_timeout).await?;
    info!(device = stream.label(), "Camera started");
    Ok(stream)
}

async fn open_bound(
    provider: &dyn CameraProvider,
    constraints: &VideoConstraints,
    bind_timeout: Duration,
) -> Result<Arc<dyn MediaStream>, MediaError> {
    let stream = provider.open(constraints)?;
    if let Err(e) = wait_for_first_frame(stream.as_ref(), bind_timeout).await {
        if let Err(stop_err) = stream.stop() {
            warn!(device = stream.label(), error = %stop_err, "Failed to stop camera");
        }
        return Err(e);
    }
    Ok(stream)
}

/// Wait until the stream delivers its first frame.
pub async fn wait_for_first_frame(
    stream: &dyn MediaStream,
    timeout: Duration,
) -> Result<Frame, MediaError> {
    let mut frames = stream.frames();
    let waited = tokio::time::timeout(timeout, async {
        frames
            .wait_for(|frame| frame.is_some())
            .await
            .map(|frame| frame.clone())
    })
    .await;

    match waited {
        Ok(Ok(Some(frame))) => Ok(frame),
        Ok(Ok(None)) | Ok(Err(_)) => Err(MediaError::Ended(stream.label().to_string())),
        Err(_) => Err(MediaError::NotReady(stream.label().to_string())),
    }
}
