//! Upload view: pick one image, send it for classification, show the result.

use std::path::Path;

use image::{ImageFormat, RgbaImage};
use tracing::{error, info};

use crate::api::PredictionService;
use crate::error::{ClientError, MSG_INVALID_IMAGE, MSG_SELECT_IMAGE};
use crate::models::DetectionResult;

/// Longest edge of the local preview thumbnail.
pub const PREVIEW_MAX_EDGE: u32 = 480;

/// A user-selected image file.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    pub async fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        Ok(Self { name, bytes })
    }

    /// MIME type guessed from the file name, then from the content.
    pub fn mime_type(&self) -> &'static str {
        ImageFormat::from_path(&self.name)
            .ok()
            .or_else(|| image::guess_format(&self.bytes).ok())
            .map(|format| format.to_mime_type())
            .unwrap_or("application/octet-stream")
    }
}

/// Thumbnail decoded from the selected file's local bytes.
#[derive(Debug, Clone)]
pub struct Preview {
    pub width: u32,
    pub height: u32,
    pub thumbnail: RgbaImage,
}

impl Preview {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ClientError> {
        let image = image::load_from_memory(bytes)?;
        let thumbnail = if image.width() > PREVIEW_MAX_EDGE || image.height() > PREVIEW_MAX_EDGE {
            image.thumbnail(PREVIEW_MAX_EDGE, PREVIEW_MAX_EDGE)
        } else {
            image.clone()
        };
        Ok(Self {
            width: image.width(),
            height: image.height(),
            thumbnail: thumbnail.to_rgba8(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    Idle,
    Selected,
    Submitting,
    Ready,
}

/// Ticket for an in-flight classification; completions carrying an outdated
/// id are dropped.
#[derive(Debug, Clone)]
pub struct Submission {
    pub id: u64,
    pub image: ImageFile,
}

#[derive(Debug, Default)]
pub struct UploadView {
    file: Option<ImageFile>,
    preview: Option<Preview>,
    result: Option<DetectionResult>,
    error: Option<String>,
    in_flight: Option<u64>,
    next_submission: u64,
}

impl UploadView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> UploadPhase {
        match (&self.file, self.in_flight, &self.result) {
            (None, _, _) => UploadPhase::Idle,
            (Some(_), Some(_), _) => UploadPhase::Submitting,
            (Some(_), None, Some(_)) => UploadPhase::Ready,
            (Some(_), None, None) => UploadPhase::Selected,
        }
    }

    pub fn file(&self) -> Option<&ImageFile> {
        self.file.as_ref()
    }

    pub fn preview(&self) -> Option<&Preview> {
        self.preview.as_ref()
    }

    pub fn result(&self) -> Option<&DetectionResult> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Whether the submit control is enabled.
    pub fn can_submit(&self) -> bool {
        self.file.is_some() && self.in_flight.is_none()
    }

    /// Replace the selection. The preview is built from local bytes only.
    pub fn select(&mut self, file: ImageFile) -> Result<(), ClientError> {
        let preview = match Preview::from_bytes(&file.bytes) {
            Ok(preview) => preview,
            Err(e) => {
                error!(file = %file.name, error = %e, "Selected file is not a readable image");
                self.error = Some(MSG_INVALID_IMAGE.to_string());
                return Err(ClientError::Validation(MSG_INVALID_IMAGE.to_string()));
            }
        };

        info!(file = %file.name, width = preview.width, height = preview.height, "Image selected");
        self.file = Some(file);
        self.preview = Some(preview);
        self.result = None;
        self.error = None;
        self.in_flight = None;
        Ok(())
    }

    /// Move to `submitting`. Without a selected file nothing is sent and the
    /// validation alert is raised.
    pub fn begin_submit(&mut self) -> Result<Submission, ClientError> {
        let Some(file) = &self.file else {
            self.error = Some(MSG_SELECT_IMAGE.to_string());
            return Err(ClientError::Validation(MSG_SELECT_IMAGE.to_string()));
        };
        if self.in_flight.is_some() {
            return Err(ClientError::Validation(
                "Ya hay una clasificación en curso".to_string(),
            ));
        }

        self.next_submission += 1;
        let id = self.next_submission;
        self.in_flight = Some(id);
        self.error = None;
        Ok(Submission {
            id,
            image: file.clone(),
        })
    }

    pub fn complete(&mut self, id: u64, result: DetectionResult) {
        if self.in_flight != Some(id) {
            return;
        }
        self.in_flight = None;
        self.result = Some(result);
    }

    /// The request failed: show the alert and go back to `selected` so the
    /// user can retry with the same file.
    pub fn fail(&mut self, id: u64, error: &ClientError) {
        if self.in_flight != Some(id) {
            return;
        }
        self.in_flight = None;
        self.result = None;
        self.error = Some(error.alert_message());
    }

    /// Show an alert that did not come from a submission (e.g. the picked
    /// file could not be read). Selection and result are left alone.
    pub fn report(&mut self, error: &ClientError) {
        self.error = Some(error.alert_message());
    }

    /// Clear file, preview, result and alert together.
    pub fn reset(&mut self) {
        self.file = None;
        self.preview = None;
        self.result = None;
        self.error = None;
        self.in_flight = None;
    }

    /// Run a full submit cycle against `service`.
    pub async fn submit_with<S: PredictionService>(
        &mut self,
        service: &S,
    ) -> Result<&DetectionResult, ClientError> {
        let submission = self.begin_submit()?;
        match service.predict(&submission.image).await {
            Ok(result) => {
                self.complete(submission.id, result);
                self.result
                    .as_ref()
                    .ok_or_else(|| ClientError::request(None, None))
            }
            Err(e) => {
                self.fail(submission.id, &e);
                Err(e)
            }
        }
    }
}
