pub mod api;
pub mod codec;
pub mod config;
pub mod error;
pub mod media;
pub mod models;
pub mod render;
pub mod stream;
pub mod upload;

pub use api::{ApiClient, PredictionService};
pub use config::ClientConfig;
pub use error::{ClientError, MediaError};
pub use models::{Detection, DetectionResult, InboundMessage, ServerStatus};
pub use stream::{SessionEvent, SessionEventKind, StreamSession, StreamView};
pub use upload::{ImageFile, UploadView};

#[cfg(feature = "gui")]
pub mod gui;
