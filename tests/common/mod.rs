mod fixtures;
mod transport;
pub use fixtures::*;
pub use transport::*;

// Re-export commonly used types from billetes for tests
pub use billetes::config::ClientConfig;
pub use billetes::error::{ClientError, MSG_SELECT_IMAGE, MSG_SERVER_UNREACHABLE, MSG_WEBSOCKET};
pub use billetes::media::FakeCamera;
pub use billetes::stream::{
    SessionEvent, SessionEventKind, SessionEvents, StreamPhase, StreamSession, StreamView,
};
pub use billetes::{ApiClient, ImageFile, UploadView};
