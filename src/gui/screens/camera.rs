use std::time::Duration;

use iced::{
    Alignment::Center,
    Element, Length, Subscription, Task,
    widget::{Stack, button, column, container, image, scrollable, text},
};
use time::macros::format_description;
use tracing::warn;

use crate::{
    codec::decode_data_url,
    error::{ClientError, MSG_CAMERA_PERMISSION_HINT},
    gui::{
        AppState, Handoff,
        screens::{Screen, ScreenMessage},
        widgets::{alert, notice, result_panel},
    },
    media::Frame,
    render::{RenderedResult, ResultView, render_result},
    stream::{SessionEvent, SessionEvents, StreamPhase, StreamSession, StreamView},
};

/// How often the local camera preview is redrawn while streaming.
const PREVIEW_INTERVAL: Duration = Duration::from_millis(100);

type StartOutcome = Result<(StreamSession, SessionEvents), ClientError>;

#[derive(Debug, Default)]
pub struct CameraScreen {
    view: StreamView,
    preview: Option<image::Handle>,
    annotated: Option<image::Handle>,
    rendered: Option<RenderedResult>,
    updated_at: Option<String>,
}

#[derive(Debug, Clone)]
pub enum CameraMessage {
    Start,
    Started(Handoff<StartOutcome>),
    Event(SessionEvent),
    PreviewTick,
    Stop,
}

fn frame_handle(frame: &Frame) -> image::Handle {
    let rgba = ::image::DynamicImage::ImageRgb8(frame.as_ref().clone()).into_rgba8();
    image::Handle::from_rgba(rgba.width(), rgba.height(), rgba.into_raw())
}

impl CameraScreen {
    fn sync_result(&mut self) {
        let Some(live) = self.view.latest() else {
            self.rendered = None;
            self.annotated = None;
            self.updated_at = None;
            return;
        };

        self.rendered = Some(render_result(&live.result, ResultView::Live));
        self.updated_at = live
            .received_at
            .format(format_description!("[hour]:[minute]:[second]"))
            .ok();
        self.annotated = match decode_data_url(&live.result.annotated_image) {
            Ok(bytes) => Some(image::Handle::from_bytes(bytes)),
            Err(e) => {
                warn!(error = %e, "Annotated frame could not be decoded");
                None
            }
        };
    }

    fn clear(&mut self) {
        self.preview = None;
        self.sync_result();
    }
}

impl Screen for CameraScreen {
    type Message = CameraMessage;
    type ParentMessage = std::convert::Infallible;

    fn view(&self) -> Element<'_, ScreenMessage<Self>> {
        let mut content = column![].spacing(16).padding(20).align_x(Center);

        match self.view.phase() {
            StreamPhase::Idle | StreamPhase::Error | StreamPhase::Starting => {
                let starting = self.view.phase() == StreamPhase::Starting;
                let label = if starting {
                    "⏳ Iniciando..."
                } else {
                    "🎥 Iniciar Cámara"
                };
                content = content.push(
                    column![
                        text("📹").size(48),
                        text("Clasificación en Tiempo Real").size(22),
                        text("Apunta la cámara a un billete colombiano"),
                        button(text(label)).on_press_maybe(
                            (!starting)
                                .then_some(ScreenMessage::ScreenMessage(CameraMessage::Start)),
                        ),
                    ]
                    .spacing(10)
                    .align_x(Center),
                );
            }
            StreamPhase::Streaming => {
                let mut video = Stack::new();
                if let Some(frame) = &self.preview {
                    video = video.push(image(frame.clone()).width(Length::Fill));
                }
                if let Some(annotated) = &self.annotated {
                    video = video.push(image(annotated.clone()).width(Length::Fill));
                }
                content = content.push(container(video).max_width(720.0));
                content = content.push(
                    button(text("⏹️ Detener Cámara"))
                        .style(button::danger)
                        .on_press(ScreenMessage::ScreenMessage(CameraMessage::Stop)),
                );
            }
        }

        if let Some(error) = self.view.error() {
            content = content.push(alert(error));
        }
        if self.view.camera_permission() == Some(false) {
            content = content.push(notice(MSG_CAMERA_PERMISSION_HINT));
        }

        if self.view.is_streaming()
            && let Some(rendered) = &self.rendered
        {
            content = content.push(result_panel("📊 Resultados en Vivo", rendered, None));
            if let Some(at) = &self.updated_at {
                content = content.push(text(format!("Actualizado: {at}")).size(12));
            }
        }

        container(scrollable(content))
            .center_x(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn update(&mut self, message: Self::Message, state: &mut AppState) -> Task<ScreenMessage<Self>> {
        match message {
            CameraMessage::Start => {
                if !self.view.begin_start() {
                    return Task::none();
                }
                let config = state.config.clone();
                let camera = state.camera.clone();
                let transport = state.transport.clone();
                Task::perform(
                    async move {
                        StreamSession::start(&config, camera.as_ref(), transport.as_ref()).await
                    },
                    |outcome| ScreenMessage::ScreenMessage(CameraMessage::Started(Handoff::new(outcome))),
                )
            }
            CameraMessage::Started(handoff) => {
                let Some(outcome) = handoff.take() else {
                    return Task::none();
                };
                match outcome {
                    Ok((session, events)) => {
                        self.view.started(Ok(session));
                        if !self.view.is_streaming() {
                            return Task::none();
                        }
                        Task::run(events, |event| {
                            ScreenMessage::ScreenMessage(CameraMessage::Event(event))
                        })
                    }
                    Err(e) => {
                        self.view.started(Err(e));
                        Task::none()
                    }
                }
            }
            CameraMessage::Event(event) => {
                self.view.handle(event);
                if self.view.is_streaming() {
                    self.sync_result();
                } else {
                    self.clear();
                }
                Task::none()
            }
            CameraMessage::PreviewTick => {
                self.preview = self
                    .view
                    .session()
                    .and_then(StreamSession::latest_frame)
                    .map(|frame| frame_handle(&frame));
                Task::none()
            }
            CameraMessage::Stop => {
                self.view.stop();
                self.clear();
                Task::none()
            }
        }
    }

    fn subscription(&self) -> Subscription<ScreenMessage<Self>> {
        if self.view.is_streaming() {
            iced::time::every(PREVIEW_INTERVAL)
                .map(|_| ScreenMessage::ScreenMessage(CameraMessage::PreviewTick))
        } else {
            Subscription::none()
        }
    }

    fn teardown(&mut self, _state: &mut AppState) {
        self.view.stop();
        self.clear();
    }
}
