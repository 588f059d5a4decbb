use std::io::Read;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use image::RgbImage;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::CameraConfig;
use crate::error::MediaError;
use crate::media::{CameraProvider, FacingMode, Frame, MediaStream, VideoConstraints};

/// Camera backed by an `ffmpeg` child process reading a video4linux2 device
/// and emitting raw RGB24 frames on stdout.
#[derive(Debug, Clone)]
pub struct FfmpegCamera {
    config: CameraConfig,
}

impl FfmpegCamera {
    pub fn new(config: CameraConfig) -> Self {
        Self { config }
    }

    fn device_for(&self, facing: Option<FacingMode>) -> Result<&str, MediaError> {
        match facing {
            Some(FacingMode::Environment) => self
                .config
                .environment_device
                .as_deref()
                .ok_or_else(|| MediaError::NoMatchingDevice("facingMode=environment".to_string())),
            Some(FacingMode::User) | None => Ok(self.config.default_device.as_str()),
        }
    }
}

impl CameraProvider for FfmpegCamera {
    fn open(&self, constraints: &VideoConstraints) -> Result<Arc<dyn MediaStream>, MediaError> {
        let device = normalize_device(self.device_for(constraints.facing)?);
        let size = format!("{}x{}", constraints.width, constraints.height);
        let scale = format!("scale={}:{}", constraints.width, constraints.height);

        let mut cmd = Command::new(&self.config.ffmpeg_bin);
        cmd.arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-f")
            .arg("video4linux2")
            .arg("-video_size")
            .arg(&size)
            .arg("-i")
            .arg(&device)
            .arg("-vf")
            .arg(&scale)
            .arg("-pix_fmt")
            .arg("rgb24")
            .arg("-f")
            .arg("rawvideo")
            .arg("-");
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        let mut child = cmd.spawn().map_err(|source| MediaError::Spawn {
            device: device.clone(),
            source,
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            let _ = child.kill();
            MediaError::Unavailable(format!("no stdout from ffmpeg for {device}"))
        })?;

        let stream = Arc::new(FfmpegStream::new(device, child));
        stream.spawn_reader(stdout, constraints.width, constraints.height);
        Ok(stream)
    }
}

/// Accepts `0`, `/dev/video0` or any other path understood by ffmpeg.
fn normalize_device(device: &str) -> String {
    if !device.is_empty() && device.chars().all(|c| c.is_ascii_digit()) {
        format!("/dev/video{device}")
    } else {
        device.to_string()
    }
}

pub struct FfmpegStream {
    device: String,
    child: Mutex<Option<Child>>,
    frames: watch::Sender<Option<Frame>>,
    live: Arc<AtomicBool>,
}

impl FfmpegStream {
    fn new(device: String, child: Child) -> Self {
        let (frames, _) = watch::channel(None);
        Self {
            device,
            child: Mutex::new(Some(child)),
            frames,
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    fn spawn_reader(&self, stdout: ChildStdout, width: u32, height: u32) {
        let frames = self.frames.clone();
        let live = self.live.clone();
        let device = self.device.clone();
        thread::spawn(move || {
            match read_frames(stdout, width, height, &frames, &live) {
                Ok(count) => debug!(device = %device, frames = count, "Camera reader finished"),
                Err(e) => warn!(device = %device, error = %e, "Camera reader stopped"),
            }
            live.store(false, Ordering::SeqCst);
        });
    }
}

fn read_frames(
    mut stdout: impl Read,
    width: u32,
    height: u32,
    frames: &watch::Sender<Option<Frame>>,
    live: &AtomicBool,
) -> std::io::Result<u64> {
    let frame_bytes = (width as usize) * (height as usize) * 3;
    let mut count = 0u64;

    while live.load(Ordering::SeqCst) {
        let mut buffer = vec![0u8; frame_bytes];
        if let Err(e) = stdout.read_exact(&mut buffer) {
            // Stopping the stream kills ffmpeg, which closes the pipe mid-frame.
            if !live.load(Ordering::SeqCst) {
                break;
            }
            return Err(e);
        }
        let Some(frame) = RgbImage::from_raw(width, height, buffer) else {
            break;
        };
        frames.send_replace(Some(Arc::new(frame)));
        count += 1;
    }
    Ok(count)
}

impl MediaStream for FfmpegStream {
    fn label(&self) -> &str {
        &self.device
    }

    fn frames(&self) -> watch::Receiver<Option<Frame>> {
        self.frames.subscribe()
    }

    fn stop(&self) -> Result<(), MediaError> {
        self.live.store(false, Ordering::SeqCst);
        let child = match self.child.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(mut child) = child else {
            return Ok(());
        };

        let killed = child.kill();
        let _ = child.wait();
        info!(device = %self.device, "Camera stopped");
        killed.map_err(|e| MediaError::Unavailable(format!("failed to stop {}: {e}", self.device)))
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

impl Drop for FfmpegStream {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
