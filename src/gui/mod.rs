mod app;
mod message;
mod screens;
mod state;
mod widgets;

use std::sync::Arc;

use crate::config::ClientConfig;
use crate::media::CameraProvider;
use crate::stream::WebSocketTransport;

pub use app::BilletesApp;
pub use message::{Handoff, Message};
pub use screens::Tab;
pub use state::AppState;

/// Open the desktop window. Blocks until it is closed.
pub fn run(config: ClientConfig, camera: Arc<dyn CameraProvider>) -> anyhow::Result<()> {
    let state = AppState::new(config, camera, Arc::new(WebSocketTransport))?;

    iced::application(
        move || BilletesApp::new(state.clone()),
        BilletesApp::update,
        BilletesApp::view,
    )
    .title("Clasificador de Billetes Colombianos")
    .subscription(BilletesApp::subscription)
    .theme(BilletesApp::theme)
    .run()
    .map_err(|e| anyhow::anyhow!("GUI error: {e}"))
}
