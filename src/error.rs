use thiserror::Error;

/// Alert shown when an upload is attempted without a file.
pub const MSG_SELECT_IMAGE: &str = "Por favor selecciona una imagen";
/// Alert shown when the chosen file cannot be decoded as an image.
pub const MSG_INVALID_IMAGE: &str = "El archivo seleccionado no es una imagen válida";
/// Fallback for HTTP failures that carry no server-provided message.
pub const MSG_SERVER_UNREACHABLE: &str = "Error al comunicarse con el servidor";
pub const MSG_CAMERA_ACCESS: &str = "No se pudo acceder a la cámara. Verifica los permisos.";
pub const MSG_CAMERA_PERMISSION_HINT: &str =
    "Necesitas permitir el acceso a la cámara para usar esta función.";
pub const MSG_WEBSOCKET: &str = "Error en la conexión WebSocket";

/// Failure of a single camera acquisition attempt.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("no camera matches the requested constraints ({0})")]
    NoMatchingDevice(String),

    #[error("failed to start capture for {device}: {source}")]
    Spawn {
        device: String,
        #[source]
        source: std::io::Error,
    },

    #[error("camera {0} produced no frame in time")]
    NotReady(String),

    #[error("camera {0} stopped delivering frames")]
    Ended(String),

    #[error("camera unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum ClientError {
    /// User input rejected before any I/O happens
    #[error("{0}")]
    Validation(String),

    /// `/predict` failed: non-2xx, network failure, timeout or unreadable body
    #[error("request failed: {message}")]
    Request {
        status: Option<u16>,
        message: String,
    },

    /// Raw HTTP failure, surfaced without message normalization
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    /// Camera could not be acquired after every attempt
    #[error("camera access failed: {source}")]
    MediaAccess {
        #[source]
        source: MediaError,
    },

    /// WebSocket-level failure
    #[error("stream error: {0}")]
    Stream(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Base64(#[from] base64::DecodeError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ClientError {
    pub fn request(status: Option<u16>, server_message: Option<String>) -> Self {
        Self::Request {
            status,
            message: server_message.unwrap_or_else(|| MSG_SERVER_UNREACHABLE.to_string()),
        }
    }

    /// The string a view renders in its alert box.
    pub fn alert_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Request { message, .. } => message.clone(),
            Self::Transport(_) => MSG_SERVER_UNREACHABLE.to_string(),
            Self::MediaAccess { .. } => MSG_CAMERA_ACCESS.to_string(),
            Self::Stream(_) => MSG_WEBSOCKET.to_string(),
            Self::Image(_) | Self::Base64(_) => MSG_INVALID_IMAGE.to_string(),
            Self::Config(message) => message.clone(),
            Self::Io(e) => e.to_string(),
        }
    }

    pub fn is_media_access(&self) -> bool {
        matches!(self, Self::MediaAccess { .. })
    }
}

impl From<MediaError> for ClientError {
    fn from(source: MediaError) -> Self {
        Self::MediaAccess { source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_error_prefers_server_message() {
        let err = ClientError::request(Some(400), Some("No se pudo leer la imagen".into()));
        assert_eq!(err.alert_message(), "No se pudo leer la imagen");

        let err = ClientError::request(None, None);
        assert_eq!(err.alert_message(), MSG_SERVER_UNREACHABLE);
    }

    #[test]
    fn media_and_stream_errors_map_to_fixed_alerts() {
        let err: ClientError = MediaError::Unavailable("denied".into()).into();
        assert!(err.is_media_access());
        assert_eq!(err.alert_message(), MSG_CAMERA_ACCESS);
        assert_eq!(
            ClientError::Stream("reset".into()).alert_message(),
            MSG_WEBSOCKET
        );
    }
}
