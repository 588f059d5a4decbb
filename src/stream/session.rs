//! One streaming session: camera + socket + capture timer, acquired and
//! released as a unit.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use futures::channel::mpsc;
use futures::{SinkExt, StreamExt};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::codec::encode_jpeg_data_url;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::media::{self, CameraProvider, Frame, MediaStream, VideoConstraints};
use crate::models::{InboundMessage, parse_inbound};
use crate::stream::transport::{FrameSink, MessageStream, Transport};
use crate::stream::{SessionEvent, SessionEventKind, SessionId};

/// Upper bound on the graceful close once the capture loop is shut down.
const SOCKET_CLOSE_TIMEOUT: Duration = Duration::from_millis(500);

/// Events produced by a running session, in socket delivery order.
pub type SessionEvents = mpsc::UnboundedReceiver<SessionEvent>;

/// Exclusive handle over the camera stream, the socket and the capture timer.
///
/// [`StreamSession::stop`] releases all three and may be called any number of
/// times; dropping the handle stops it too.
pub struct StreamSession {
    id: SessionId,
    media: Option<Arc<dyn MediaStream>>,
    shutdown: Option<oneshot::Sender<()>>,
    capture: Option<JoinHandle<()>>,
    receiver: Option<JoinHandle<()>>,
    socket_open: Arc<AtomicBool>,
    frames_sent: Arc<AtomicU64>,
}

impl std::fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSession")
            .field("id", &self.id)
            .field("camera", &self.media.as_ref().map(|m| m.label().to_string()))
            .field("socket_open", &self.socket_open.load(Ordering::SeqCst))
            .field("frames_sent", &self.frames_sent.load(Ordering::SeqCst))
            .finish()
    }
}

impl StreamSession {
    /// Acquire the camera, wait for its first frame, open the socket, then
    /// start the capture and receive loops.
    ///
    /// A camera failure never reaches the transport. Anything acquired before
    /// a failing step is released before returning the error.
    pub async fn start(
        config: &ClientConfig,
        camera: &dyn CameraProvider,
        transport: &dyn Transport,
    ) -> Result<(Self, SessionEvents), ClientError> {
        let id = SessionId::new();
        let constraints = VideoConstraints::new(config.camera.width, config.camera.height);

        let media = media::acquire_camera(camera, constraints, config.stream.bind_timeout).await?;
        debug!(session = %id, device = media.label(), "Camera bound");

        let ws_url = match config.ws_url() {
            Ok(url) => url,
            Err(e) => {
                release_media(&media);
                return Err(e);
            }
        };
        let (sink, inbound) = match transport.connect(ws_url.as_str()).await {
            Ok(halves) => halves,
            Err(e) => {
                error!(session = %id, error = %e, "WebSocket connection failed");
                release_media(&media);
                return Err(e);
            }
        };

        let socket_open = Arc::new(AtomicBool::new(true));
        let frames_sent = Arc::new(AtomicU64::new(0));
        let (events_tx, events_rx) = mpsc::unbounded();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let capture = tokio::spawn(capture_loop(CaptureLoop {
            session: id,
            frames: media.frames(),
            sink,
            socket_open: socket_open.clone(),
            frames_sent: frames_sent.clone(),
            interval: config.stream.frame_interval,
            quality: config.stream.jpeg_quality,
            shutdown: shutdown_rx,
            events: events_tx.clone(),
        }));
        let receiver = tokio::spawn(receive_loop(id, inbound, socket_open.clone(), events_tx));

        info!(session = %id, url = %ws_url, "Streaming started");
        Ok((
            Self {
                id,
                media: Some(media),
                shutdown: Some(shutdown_tx),
                capture: Some(capture),
                receiver: Some(receiver),
                socket_open,
                frames_sent,
            },
            events_rx,
        ))
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// True while any of camera, socket or timer is still held.
    pub fn is_active(&self) -> bool {
        self.media.is_some() || self.shutdown.is_some() || self.receiver.is_some()
    }

    pub fn is_socket_open(&self) -> bool {
        self.socket_open.load(Ordering::SeqCst)
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::SeqCst)
    }

    /// Newest camera frame, for local preview.
    pub fn latest_frame(&self) -> Option<Frame> {
        self.media
            .as_ref()
            .and_then(|media| media.frames().borrow().clone())
    }

    /// Cancel the timer, close the socket and stop every camera track.
    ///
    /// Each resource is released independently; a failure in one step is
    /// logged and the remaining steps still run.
    pub fn stop(&mut self) {
        let was_active = self.is_active();

        // Timer: the capture loop abandons any send in flight and closes the
        // socket sink on its way out.
        if let Some(shutdown) = self.shutdown.take() {
            if shutdown.send(()).is_err() {
                debug!(session = %self.id, "Capture loop already finished");
            }
        }
        self.capture.take();

        // Socket
        self.socket_open.store(false, Ordering::SeqCst);
        if let Some(receiver) = self.receiver.take() {
            receiver.abort();
        }

        // Camera
        if let Some(media) = self.media.take() {
            release_media(&media);
        }

        if was_active {
            info!(
                session = %self.id,
                frames_sent = self.frames_sent(),
                "Streaming stopped"
            );
        }
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.stop();
    }
}

fn release_media(media: &Arc<dyn MediaStream>) {
    if let Err(e) = media.stop() {
        warn!(device = media.label(), error = %e, "Failed to stop camera");
    }
}

struct CaptureLoop {
    session: SessionId,
    frames: tokio::sync::watch::Receiver<Option<Frame>>,
    sink: FrameSink,
    socket_open: Arc<AtomicBool>,
    frames_sent: Arc<AtomicU64>,
    interval: Duration,
    quality: u8,
    shutdown: oneshot::Receiver<()>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

/// Fixed-cadence capture/encode/send.
///
/// Ticks are handled one at a time; ticks missed while a frame is still being
/// encoded or sent are skipped, not queued. Nothing is sent unless the socket
/// is open. Shutdown interrupts an encode or send in progress, and the final
/// close is bounded by [`SOCKET_CLOSE_TIMEOUT`] so the sink is always dropped.
async fn capture_loop(state: CaptureLoop) {
    let CaptureLoop {
        session,
        frames,
        mut sink,
        socket_open,
        frames_sent,
        interval,
        quality,
        mut shutdown,
        events,
    } = state;

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            _ = ticker.tick() => {}
        }

        let sent = tokio::select! {
            biased;
            _ = &mut shutdown => break,
            sent = send_latest_frame(session, &frames, &mut sink, &socket_open, quality) => sent,
        };

        match sent {
            Ok(false) => {}
            Ok(true) => {
                let count = frames_sent.fetch_add(1, Ordering::SeqCst) + 1;
                debug!(session = %session, frames_sent = count, "Frame sent");
            }
            Err(e) => {
                error!(session = %session, error = %e, "Frame send failed");
                socket_open.store(false, Ordering::SeqCst);
                let _ = events.unbounded_send(SessionEvent {
                    session,
                    kind: SessionEventKind::Failed(e.to_string()),
                });
                break;
            }
        }
    }

    match tokio::time::timeout(SOCKET_CLOSE_TIMEOUT, sink.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!(session = %session, error = %e, "Socket close reported an error"),
        Err(_) => warn!(session = %session, "Socket close timed out, dropping connection"),
    }
}

/// Encode the newest frame and send it. `Ok(false)` means nothing was sent
/// because there was no frame, the socket was not open or encoding failed.
async fn send_latest_frame(
    session: SessionId,
    frames: &tokio::sync::watch::Receiver<Option<Frame>>,
    sink: &mut FrameSink,
    socket_open: &AtomicBool,
    quality: u8,
) -> Result<bool, ClientError> {
    if !socket_open.load(Ordering::SeqCst) {
        return Ok(false);
    }
    let frame = frames.borrow().clone();
    let Some(frame) = frame else {
        return Ok(false);
    };

    let payload = match tokio::task::spawn_blocking(move || encode_jpeg_data_url(&frame, quality)).await {
        Ok(Ok(payload)) => payload,
        Ok(Err(e)) => {
            warn!(session = %session, error = %e, "Frame encode failed");
            return Ok(false);
        }
        Err(e) => {
            warn!(session = %session, error = %e, "Frame encode task failed");
            return Ok(false);
        }
    };

    // The socket may have closed while encoding.
    if !socket_open.load(Ordering::SeqCst) {
        return Ok(false);
    }
    sink.send(payload).await?;
    Ok(true)
}

async fn receive_loop(
    session: SessionId,
    mut inbound: MessageStream,
    socket_open: Arc<AtomicBool>,
    events: mpsc::UnboundedSender<SessionEvent>,
) {
    let emit = |kind: SessionEventKind| {
        let _ = events.unbounded_send(SessionEvent { session, kind });
    };

    while let Some(message) = inbound.next().await {
        let text = match message {
            Ok(text) => text,
            Err(e) => {
                error!(session = %session, error = %e, "WebSocket error");
                socket_open.store(false, Ordering::SeqCst);
                emit(SessionEventKind::Failed(e.to_string()));
                return;
            }
        };

        match parse_inbound(&text) {
            Ok(InboundMessage::Detection(result)) => {
                debug!(session = %session, detected = result.total_detected, "Live result");
                emit(SessionEventKind::Detection(result));
            }
            Ok(InboundMessage::ServerError(message)) => {
                error!(session = %session, error = %message, "Server reported an error");
                emit(SessionEventKind::ServerError(message));
            }
            Err(e) => {
                warn!(session = %session, error = %e, "Ignoring malformed message");
                emit(SessionEventKind::Malformed(e.to_string()));
            }
        }
    }

    socket_open.store(false, Ordering::SeqCst);
    info!(session = %session, "WebSocket disconnected");
    emit(SessionEventKind::Closed);
}
