pub mod camera;
pub mod upload;

use iced::{Element, Subscription, Task};

use crate::gui::{AppState, Message};

#[derive(Debug)]
pub enum ScreenMessage<S: Screen> {
    ScreenMessage(S::Message),
    ParentMessage(S::ParentMessage),
}

// Only the payloads need to be `Clone`; screens own resources that are not.
impl<S: Screen> Clone for ScreenMessage<S>
where
    S::Message: Clone,
    S::ParentMessage: Clone,
{
    fn clone(&self) -> Self {
        match self {
            Self::ScreenMessage(msg) => Self::ScreenMessage(msg.clone()),
            Self::ParentMessage(msg) => Self::ParentMessage(msg.clone()),
        }
    }
}

pub trait Screen: Sized {
    type Message: std::fmt::Debug;
    type ParentMessage: std::fmt::Debug;
    fn view(&self) -> Element<'_, ScreenMessage<Self>>;
    fn update(&mut self, message: Self::Message, state: &mut AppState)
    -> Task<ScreenMessage<Self>>;

    fn subscription(&self) -> Subscription<ScreenMessage<Self>> {
        Subscription::none()
    }

    /// Called before the screen is replaced.
    fn teardown(&mut self, _state: &mut AppState) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Upload,
    Camera,
}

impl Tab {
    pub const ALL: [Tab; 2] = [Tab::Upload, Tab::Camera];

    pub fn label(self) -> &'static str {
        match self {
            Tab::Upload => "📤 Subir Imagen",
            Tab::Camera => "📹 Cámara en Tiempo Real",
        }
    }
}

#[derive(Debug)]
pub enum ScreenData {
    Upload(upload::UploadScreen),
    Camera(camera::CameraScreen),
}

impl ScreenData {
    pub fn for_tab(tab: Tab) -> Self {
        match tab {
            Tab::Upload => ScreenData::Upload(upload::UploadScreen::default()),
            Tab::Camera => ScreenData::Camera(camera::CameraScreen::default()),
        }
    }

    pub fn tab(&self) -> Tab {
        match self {
            ScreenData::Upload(_) => Tab::Upload,
            ScreenData::Camera(_) => Tab::Camera,
        }
    }
}

impl Screen for ScreenData {
    type Message = Message;
    type ParentMessage = std::convert::Infallible;

    fn view(&self) -> Element<'_, ScreenMessage<Self>> {
        match self {
            ScreenData::Upload(screen) => screen.view().map(Message::Upload),
            ScreenData::Camera(screen) => screen.view().map(Message::Camera),
        }
        .map(ScreenMessage::ScreenMessage)
    }

    fn update(
        &mut self,
        message: Self::Message,
        state: &mut AppState,
    ) -> Task<ScreenMessage<Self>> {
        match (self, message) {
            (x, Message::SelectTab(tab)) => {
                if x.tab() != tab {
                    x.teardown(state);
                    *x = ScreenData::for_tab(tab);
                }
                Task::none()
            }
            (ScreenData::Upload(page), Message::Upload(msg)) => match msg {
                ScreenMessage::ScreenMessage(msg) => page
                    .update(msg, state)
                    .map(Message::Upload)
                    .map(ScreenMessage::ScreenMessage),
                ScreenMessage::ParentMessage(never) => match never {},
            },
            (ScreenData::Camera(page), Message::Camera(msg)) => match msg {
                ScreenMessage::ScreenMessage(msg) => page
                    .update(msg, state)
                    .map(Message::Camera)
                    .map(ScreenMessage::ScreenMessage),
                ScreenMessage::ParentMessage(never) => match never {},
            },
            // Results addressed to a screen that has since been replaced.
            // Dropping the message releases anything it carries.
            _ => Task::none(),
        }
    }

    fn subscription(&self) -> Subscription<ScreenMessage<Self>> {
        match self {
            ScreenData::Upload(screen) => screen.subscription().map(Message::Upload),
            ScreenData::Camera(screen) => screen.subscription().map(Message::Camera),
        }
        .map(ScreenMessage::ScreenMessage)
    }

    fn teardown(&mut self, state: &mut AppState) {
        match self {
            ScreenData::Upload(screen) => screen.teardown(state),
            ScreenData::Camera(screen) => screen.teardown(state),
        }
    }
}
