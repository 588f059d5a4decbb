//! Live classification over the streaming endpoint.

pub mod session;
pub mod transport;
pub mod view;

use std::fmt;

use uuid::Uuid;

use crate::models::DetectionResult;

pub use session::{SessionEvents, StreamSession};
pub use transport::{FrameSink, MessageStream, Transport, WebSocketTransport};
pub use view::{StreamPhase, StreamView};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionEvent {
    pub session: SessionId,
    pub kind: SessionEventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEventKind {
    /// A `success` frame from the server
    Detection(DetectionResult),
    /// An `{"error": ...}` frame; the stream keeps running
    ServerError(String),
    /// A frame that could not be understood
    Malformed(String),
    /// The server closed the connection
    Closed,
    /// The connection failed
    Failed(String),
}

impl SessionEventKind {
    /// Whether the event ends the session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Failed(_))
    }
}
