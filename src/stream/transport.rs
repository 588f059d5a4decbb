use std::pin::Pin;

use futures::future::{self, BoxFuture};
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info};

use crate::error::ClientError;

/// Outbound half of an open connection: one text message per frame.
pub type FrameSink = Pin<Box<dyn Sink<String, Error = ClientError> + Send>>;

/// Inbound half: text messages until the peer closes (end of stream) or the
/// connection fails (an `Err` item).
pub type MessageStream = Pin<Box<dyn Stream<Item = Result<String, ClientError>> + Send>>;

/// Opens the streaming connection. The returned future resolves only once the
/// connection is open.
pub trait Transport: Send + Sync {
    fn connect<'a>(&'a self, url: &'a str)
    -> BoxFuture<'a, Result<(FrameSink, MessageStream), ClientError>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketTransport;

impl Transport for WebSocketTransport {
    fn connect<'a>(
        &'a self,
        url: &'a str,
    ) -> BoxFuture<'a, Result<(FrameSink, MessageStream), ClientError>> {
        Box::pin(async move {
            let (socket, response) = connect_async(url)
                .await
                .map_err(|e| ClientError::Stream(format!("connect to {url} failed: {e}")))?;
            info!(url, status = response.status().as_u16(), "WebSocket connected");

            let (write, read) = socket.split();

            let sink = write
                .sink_map_err(|e| ClientError::Stream(e.to_string()))
                .with(|text: String| future::ready(Ok::<_, ClientError>(Message::text(text))));

            let stream = read.filter_map(|message| {
                future::ready(match message {
                    Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
                    Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                        Ok(text) => Some(Ok(text)),
                        Err(_) => {
                            debug!(len = bytes.len(), "Ignoring non-UTF-8 binary frame");
                            None
                        }
                    },
                    Ok(Message::Close(frame)) => {
                        debug!(?frame, "Server sent close frame");
                        None
                    }
                    Ok(_) => None,
                    Err(e) => Some(Err(ClientError::Stream(e.to_string()))),
                })
            });

            Ok((Box::pin(sink) as FrameSink, Box::pin(stream) as MessageStream))
        })
    }
}
