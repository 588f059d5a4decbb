use std::sync::{Arc, Mutex};

use crate::gui::screens::{ScreenMessage, Tab, camera::CameraScreen, upload::UploadScreen};

#[derive(Debug, Clone)]
pub enum Message {
    SelectTab(Tab),
    Upload(ScreenMessage<UploadScreen>),
    Camera(ScreenMessage<CameraScreen>),
}

/// Moves a value that is not `Clone` (a running stream session) through a
/// message. The first `take` wins; later clones see `None`.
pub struct Handoff<T>(Arc<Mutex<Option<T>>>);

impl<T> Handoff<T> {
    pub fn new(value: T) -> Self {
        Self(Arc::new(Mutex::new(Some(value))))
    }

    pub fn take(&self) -> Option<T> {
        self.0.lock().ok()?.take()
    }
}

impl<T> Clone for Handoff<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> std::fmt::Debug for Handoff<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pending = self.0.lock().map(|slot| slot.is_some()).unwrap_or(false);
        f.debug_struct("Handoff").field("pending", &pending).finish()
    }
}
