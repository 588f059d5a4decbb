use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use billetes::error::ClientError;
use billetes::stream::{FrameSink, MessageStream, Transport};
use futures::channel::mpsc;
use futures::future::BoxFuture;
use futures::{FutureExt, Sink, SinkExt, StreamExt};
use tokio::sync::watch;

/// The server side of one fake connection.
pub struct FakePeer {
    /// Frames the client sent, in order. Ends once the client closes.
    pub frames: mpsc::UnboundedReceiver<String>,
    inbound: Option<mpsc::UnboundedSender<Result<String, ClientError>>>,
}

impl FakePeer {
    /// Push a text message to the client.
    pub fn push(&self, text: impl Into<String>) {
        if let Some(inbound) = &self.inbound {
            let _ = inbound.unbounded_send(Ok(text.into()));
        }
    }

    /// Fail the connection from the server side.
    pub fn fail(&self, reason: &str) {
        if let Some(inbound) = &self.inbound {
            let _ = inbound.unbounded_send(Err(ClientError::Stream(reason.to_string())));
        }
    }

    /// Close the connection from the server side.
    pub fn close(&mut self) {
        self.inbound.take();
    }

    /// A frame the client has already sent, without waiting.
    pub fn try_frame(&mut self) -> Option<String> {
        self.frames.next().now_or_never().flatten()
    }

    /// Wait for the next frame, failing the test after two seconds.
    pub async fn next_frame(&mut self) -> Option<String> {
        tokio::time::timeout(Duration::from_secs(2), self.frames.next())
            .await
            .expect("Timed out waiting for a frame")
    }
}

/// Sink that never accepts a frame or finishes closing, like a connection
/// whose send buffer stays full.
struct StalledSink {
    _held: Arc<()>,
}

impl Sink<String> for StalledSink {
    type Error = ClientError;

    fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), ClientError>> {
        Poll::Pending
    }

    fn start_send(self: Pin<&mut Self>, _item: String) -> Result<(), ClientError> {
        Ok(())
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), ClientError>> {
        Poll::Pending
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), ClientError>> {
        Poll::Pending
    }
}

/// In-memory [`Transport`]. Optionally holds every connection in the
/// "connecting" state until [`FakeTransport::open`] is called.
pub struct FakeTransport {
    connects: AtomicUsize,
    open: watch::Sender<bool>,
    refuse: bool,
    stall: bool,
    sinks: Arc<()>,
    peer: Mutex<Option<FakePeer>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::with_state(true, false)
    }

    /// Connections stay pending until `open()`.
    pub fn gated() -> Self {
        Self::with_state(false, false)
    }

    /// Every connection attempt fails.
    pub fn refusing() -> Self {
        Self::with_state(true, true)
    }

    /// Connections open, but their sink never accepts a frame.
    pub fn stalled() -> Self {
        Self {
            stall: true,
            ..Self::new()
        }
    }

    fn with_state(open: bool, refuse: bool) -> Self {
        let (open, _) = watch::channel(open);
        Self {
            connects: AtomicUsize::new(0),
            open,
            refuse,
            stall: false,
            sinks: Arc::new(()),
            peer: Mutex::new(None),
        }
    }

    /// Stalled sinks handed out that the client still holds.
    pub fn open_sinks(&self) -> usize {
        Arc::strong_count(&self.sinks) - 1
    }

    pub fn open(&self) {
        self.open.send_replace(true);
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// The peer of the most recent connection.
    pub fn take_peer(&self) -> FakePeer {
        self.peer
            .lock()
            .expect("peer lock poisoned")
            .take()
            .expect("no connection was made")
    }
}

impl Transport for FakeTransport {
    fn connect<'a>(
        &'a self,
        _url: &'a str,
    ) -> BoxFuture<'a, Result<(FrameSink, MessageStream), ClientError>> {
        Box::pin(async move {
            self.connects.fetch_add(1, Ordering::SeqCst);
            if self.refuse {
                return Err(ClientError::Stream("connection refused".to_string()));
            }

            let (frames_tx, frames_rx) = mpsc::unbounded::<String>();
            let (inbound_tx, inbound_rx) = mpsc::unbounded::<Result<String, ClientError>>();
            *self.peer.lock().expect("peer lock poisoned") = Some(FakePeer {
                frames: frames_rx,
                inbound: Some(inbound_tx),
            });

            let mut open = self.open.subscribe();
            open.wait_for(|open| *open)
                .await
                .map_err(|e| ClientError::Stream(e.to_string()))?;

            let sink: FrameSink = if self.stall {
                Box::pin(StalledSink {
                    _held: self.sinks.clone(),
                })
            } else {
                Box::pin(frames_tx.sink_map_err(|e| ClientError::Stream(e.to_string())))
            };
            Ok((sink, Box::pin(inbound_rx) as MessageStream))
        })
    }
}
