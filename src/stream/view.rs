use time::OffsetDateTime;
use tracing::{debug, error};

use crate::error::{ClientError, MSG_WEBSOCKET};
use crate::models::DetectionResult;
use crate::stream::{SessionEvent, SessionEventKind, SessionId, StreamSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    Idle,
    Starting,
    Streaming,
    Error,
}

/// Latest live result together with the local time it arrived.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveResult {
    pub result: DetectionResult,
    pub received_at: OffsetDateTime,
}

/// State of the streaming view. Owns at most one [`StreamSession`].
#[derive(Debug)]
pub struct StreamView {
    phase: StreamPhase,
    session: Option<StreamSession>,
    latest: Option<LiveResult>,
    error: Option<String>,
    camera_permission: Option<bool>,
}

impl Default for StreamView {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamView {
    pub fn new() -> Self {
        Self {
            phase: StreamPhase::Idle,
            session: None,
            latest: None,
            error: None,
            camera_permission: None,
        }
    }

    pub fn phase(&self) -> StreamPhase {
        self.phase
    }

    pub fn session(&self) -> Option<&StreamSession> {
        self.session.as_ref()
    }

    pub fn latest(&self) -> Option<&LiveResult> {
        self.latest.as_ref()
    }

    pub fn result(&self) -> Option<&DetectionResult> {
        self.latest.as_ref().map(|live| &live.result)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// `Some(false)` once camera access has been refused.
    pub fn camera_permission(&self) -> Option<bool> {
        self.camera_permission
    }

    pub fn is_streaming(&self) -> bool {
        self.phase == StreamPhase::Streaming
    }

    /// `idle|error → starting`. Returns false if a start is already under way
    /// or a session is running.
    pub fn begin_start(&mut self) -> bool {
        match self.phase {
            StreamPhase::Starting | StreamPhase::Streaming => false,
            StreamPhase::Idle | StreamPhase::Error => {
                self.phase = StreamPhase::Starting;
                self.error = None;
                true
            }
        }
    }

    /// Outcome of [`StreamSession::start`].
    pub fn started(&mut self, outcome: Result<StreamSession, ClientError>) {
        if self.phase != StreamPhase::Starting {
            // Stopped while starting: release the late session right away.
            if let Ok(mut session) = outcome {
                session.stop();
            }
            return;
        }

        match outcome {
            Ok(session) => {
                self.camera_permission = Some(true);
                self.session = Some(session);
                self.phase = StreamPhase::Streaming;
            }
            Err(e) => {
                error!(error = %e, "Could not start streaming");
                if e.is_media_access() {
                    self.camera_permission = Some(false);
                }
                self.error = Some(e.alert_message());
                self.phase = StreamPhase::Error;
            }
        }
    }

    fn is_current(&self, session: SessionId) -> bool {
        self.session.as_ref().map(StreamSession::id) == Some(session)
    }

    /// Apply one session event. Events from a previous session are ignored.
    pub fn handle(&mut self, event: SessionEvent) {
        if !self.is_current(event.session) {
            debug!(session = %event.session, "Dropping event from a stale session");
            return;
        }

        match event.kind {
            SessionEventKind::Detection(result) => {
                self.latest = Some(LiveResult {
                    result,
                    received_at: OffsetDateTime::now_local()
                        .unwrap_or_else(|_| OffsetDateTime::now_utc()),
                });
            }
            // Already logged by the receive loop; the displayed result stays.
            SessionEventKind::ServerError(_) | SessionEventKind::Malformed(_) => {}
            SessionEventKind::Closed => self.stop(),
            SessionEventKind::Failed(reason) => {
                error!(reason = %reason, "Streaming connection failed");
                self.stop();
                self.error = Some(MSG_WEBSOCKET.to_string());
            }
        }
    }

    /// Release camera, socket and timer and clear the displayed result.
    /// Safe to call repeatedly and from any state.
    pub fn stop(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.stop();
        }
        self.latest = None;
        self.phase = StreamPhase::Idle;
    }
}
