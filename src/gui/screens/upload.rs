use std::sync::Arc;

use iced::{
    Alignment::Center,
    Element, Length, Task,
    widget::{button, column, container, image, row, scrollable, text},
};
use rfd::AsyncFileDialog;
use tracing::warn;

use crate::{
    codec::decode_data_url,
    error::ClientError,
    gui::{
        AppState,
        screens::{Screen, ScreenMessage},
        widgets::{alert, result_panel},
    },
    models::DetectionResult,
    render::{RenderedResult, ResultView, render_result},
    upload::{ImageFile, UploadView},
};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp"];

#[derive(Debug, Default)]
pub struct UploadScreen {
    view: UploadView,
    preview: Option<image::Handle>,
    annotated: Option<image::Handle>,
    rendered: Option<RenderedResult>,
}

#[derive(Debug, Clone)]
pub enum UploadMessage {
    PickFile,
    Picked(Result<ImageFile, Arc<ClientError>>),
    Submit,
    Predicted(u64, Result<DetectionResult, Arc<ClientError>>),
    Reset,
    None,
}

impl UploadScreen {
    fn sync_preview(&mut self) {
        self.preview = self.view.preview().map(|preview| {
            image::Handle::from_rgba(
                preview.thumbnail.width(),
                preview.thumbnail.height(),
                preview.thumbnail.as_raw().clone(),
            )
        });
    }

    fn sync_result(&mut self) {
        self.rendered = self
            .view
            .result()
            .map(|result| render_result(result, ResultView::Upload));
        self.annotated = self.view.result().and_then(|result| {
            match decode_data_url(&result.annotated_image) {
                Ok(bytes) => Some(image::Handle::from_bytes(bytes)),
                Err(e) => {
                    warn!(error = %e, "Annotated image could not be decoded");
                    None
                }
            }
        });
    }
}

impl Screen for UploadScreen {
    type Message = UploadMessage;
    type ParentMessage = std::convert::Infallible;

    fn view(&self) -> Element<'_, ScreenMessage<Self>> {
        let submitting = self.view.is_submitting();
        let mut content = column![].spacing(16).padding(20).align_x(Center);

        content = content.push(
            button(
                column![
                    text("📁").size(40),
                    text("Click para seleccionar una imagen"),
                    text("JPG, PNG, JPEG - Max 10MB").size(12),
                ]
                .align_x(Center)
                .spacing(6),
            )
            .padding(20)
            .on_press_maybe(
                (!submitting).then_some(ScreenMessage::ScreenMessage(UploadMessage::PickFile)),
            ),
        );

        if let Some(handle) = &self.preview {
            content = content.push(
                column![
                    text("Vista Previa:").size(18),
                    image(handle.clone()).width(Length::Fixed(360.0)),
                ]
                .spacing(8)
                .align_x(Center),
            );
        }

        let submit_label = if submitting {
            "🔄 Clasificando..."
        } else {
            "🚀 Clasificar Billete"
        };
        let mut buttons = row![
            button(text(submit_label)).on_press_maybe(
                (!submitting).then_some(ScreenMessage::ScreenMessage(UploadMessage::Submit)),
            )
        ]
        .spacing(12);
        if self.view.file().is_some() {
            buttons = buttons.push(
                button(text("🔄 Limpiar"))
                    .style(button::secondary)
                    .on_press(ScreenMessage::ScreenMessage(UploadMessage::Reset)),
            );
        }
        content = content.push(buttons);

        if let Some(error) = self.view.error() {
            content = content.push(alert(error));
        }

        if let Some(rendered) = &self.rendered {
            content = content.push(result_panel(
                "📊 Resultados",
                rendered,
                self.annotated.as_ref(),
            ));
        }

        container(scrollable(content))
            .center_x(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn update(&mut self, message: Self::Message, state: &mut AppState) -> Task<ScreenMessage<Self>> {
        match message {
            UploadMessage::PickFile => Task::perform(
                async {
                    let handle = AsyncFileDialog::new()
                        .set_title("Seleccionar imagen")
                        .add_filter("Imágenes", IMAGE_EXTENSIONS)
                        .pick_file()
                        .await?;
                    Some(ImageFile::from_path(handle.path()).await.map_err(Arc::new))
                },
                |picked| match picked {
                    Some(file) => ScreenMessage::ScreenMessage(UploadMessage::Picked(file)),
                    None => ScreenMessage::ScreenMessage(UploadMessage::None),
                },
            ),
            UploadMessage::Picked(Ok(file)) => {
                // A rejected file keeps the previous selection; the alert is
                // set by the view either way.
                if self.view.select(file).is_ok() {
                    self.sync_preview();
                    self.sync_result();
                }
                Task::none()
            }
            UploadMessage::Picked(Err(e)) => {
                warn!(error = %e, "Could not read selected file");
                self.view.report(&e);
                Task::none()
            }
            UploadMessage::Submit => {
                let Ok(submission) = self.view.begin_submit() else {
                    return Task::none();
                };
                let api = state.api.clone();
                let id = submission.id;
                Task::perform(
                    async move { api.predict(&submission.image).await.map_err(Arc::new) },
                    move |outcome| ScreenMessage::ScreenMessage(UploadMessage::Predicted(id, outcome)),
                )
            }
            UploadMessage::Predicted(id, Ok(result)) => {
                self.view.complete(id, result);
                self.sync_result();
                Task::none()
            }
            UploadMessage::Predicted(id, Err(e)) => {
                self.view.fail(id, &e);
                self.sync_result();
                Task::none()
            }
            UploadMessage::Reset => {
                self.view.reset();
                self.sync_preview();
                self.sync_result();
                Task::none()
            }
            UploadMessage::None => Task::none(),
        }
    }
}
