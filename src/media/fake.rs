use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use image::{Rgb, RgbImage};
use tokio::sync::watch;
use tracing::info;

use crate::error::MediaError;
use crate::media::{CameraProvider, FacingMode, Frame, MediaStream, VideoConstraints};

/// Synthetic camera producing a static test pattern.
///
/// Used by `billetes stream --fake-camera` and by the tests, which also use it
/// to simulate missing or broken rear cameras and denied access.
#[derive(Debug, Default)]
pub struct FakeCamera {
    has_rear_camera: bool,
    available: bool,
    silent: bool,
    silent_rear: bool,
    attempts: Mutex<Vec<VideoConstraints>>,
    opened: Mutex<Vec<Arc<FakeMediaStream>>>,
}

impl FakeCamera {
    pub fn new() -> Self {
        Self {
            has_rear_camera: true,
            available: true,
            ..Default::default()
        }
    }

    /// Only a camera without facing mode exists (desktop/USB webcam).
    pub fn without_rear_camera(mut self) -> Self {
        self.has_rear_camera = false;
        self
    }

    /// Every open fails, as when permission is denied.
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Opens succeed but no frame is ever delivered.
    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    /// The rear camera opens but never delivers a frame; other cameras work.
    pub fn with_silent_rear_camera(mut self) -> Self {
        self.silent_rear = true;
        self
    }

    /// Constraints of every open attempt, in order.
    pub fn attempts(&self) -> Vec<VideoConstraints> {
        self.attempts
            .lock()
            .map(|a| a.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn streams(&self) -> Vec<Arc<FakeMediaStream>> {
        self.opened
            .lock()
            .map(|o| o.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Number of opened streams that have not been stopped.
    pub fn live_streams(&self) -> usize {
        self.streams().iter().filter(|s| s.is_live()).count()
    }
}

impl CameraProvider for FakeCamera {
    fn open(&self, constraints: &VideoConstraints) -> Result<Arc<dyn MediaStream>, MediaError> {
        if let Ok(mut attempts) = self.attempts.lock() {
            attempts.push(*constraints);
        }

        if !self.available {
            return Err(MediaError::Unavailable("permission denied".to_string()));
        }
        if constraints.facing == Some(FacingMode::Environment) && !self.has_rear_camera {
            return Err(MediaError::NoMatchingDevice("facingMode=environment".to_string()));
        }

        let label = match constraints.facing {
            Some(FacingMode::Environment) => "fake:environment",
            Some(FacingMode::User) => "fake:user",
            None => "fake:default",
        };
        let silent = self.silent
            || (self.silent_rear && constraints.facing == Some(FacingMode::Environment));
        let frame = (!silent).then(|| test_pattern(constraints.width, constraints.height));
        let stream = Arc::new(FakeMediaStream::new(label, frame));

        if let Ok(mut opened) = self.opened.lock() {
            opened.push(stream.clone());
        }
        info!(device = label, "Fake camera opened");
        Ok(stream)
    }
}

#[derive(Debug)]
pub struct FakeMediaStream {
    label: String,
    frames: watch::Sender<Option<Frame>>,
    live: AtomicBool,
    stop_calls: AtomicUsize,
}

impl FakeMediaStream {
    fn new(label: &str, frame: Option<RgbImage>) -> Self {
        let (frames, _) = watch::channel(frame.map(Arc::new));
        Self {
            label: label.to_string(),
            frames,
            live: AtomicBool::new(true),
            stop_calls: AtomicUsize::new(0),
        }
    }

    /// Publish a new frame, replacing the previous one.
    pub fn push_frame(&self, frame: RgbImage) {
        self.frames.send_replace(Some(Arc::new(frame)));
    }

    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }
}

impl MediaStream for FakeMediaStream {
    fn label(&self) -> &str {
        &self.label
    }

    fn frames(&self) -> watch::Receiver<Option<Frame>> {
        self.frames.subscribe()
    }

    fn stop(&self) -> Result<(), MediaError> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.live.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

fn test_pattern(width: u32, height: u32) -> RgbImage {
    let (width, height) = (width.max(1), height.max(1));
    RgbImage::from_fn(width, height, |x, y| {
        let r = (x * 255 / width) as u8;
        let g = (y * 255 / height) as u8;
        Rgb([r, g, 96])
    })
}
