use std::sync::Arc;

use crate::api::ApiClient;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::media::CameraProvider;
use crate::stream::Transport;

/// Services shared by every screen. Screens keep their own view state; nothing
/// here is mutated by one screen on behalf of another.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ClientConfig>,
    pub api: ApiClient,
    pub camera: Arc<dyn CameraProvider>,
    pub transport: Arc<dyn Transport>,
}

impl AppState {
    pub fn new(
        config: ClientConfig,
        camera: Arc<dyn CameraProvider>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ClientError> {
        let api = ApiClient::new(&config)?;
        Ok(Self {
            config: Arc::new(config),
            api,
            camera,
            transport,
        })
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("api_url", &self.config.api_url.as_str())
            .finish_non_exhaustive()
    }
}
