//! Integration tests for live streaming sessions.
//!
//! Tests cover:
//! - Two-tier camera acquisition, including a rear camera that never delivers
//!   a frame, and its failure path
//! - No frames before the socket is open
//! - Idempotent teardown from every trigger (stop, server close, failure),
//!   also while a send is stuck
//! - Inbound messages that must not replace the displayed result
//! - A full round trip against a real WebSocket server

mod common;

use std::time::Duration;

use billetes::codec::decode_data_url;
use billetes::media::{FacingMode, MediaStream};
use billetes::stream::WebSocketTransport;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

use common::*;

#[tokio::test]
async fn test_camera_failure_never_opens_socket() -> anyhow::Result<()> {
    let config = test_config("http://127.0.0.1:8000");
    let camera = FakeCamera::new().unavailable();
    let transport = FakeTransport::new();

    let mut view = StreamView::new();
    assert!(view.begin_start());
    let outcome = StreamSession::start(&config, &camera, &transport).await;
    assert!(matches!(&outcome, Err(ClientError::MediaAccess { .. })));
    view.started(outcome.map(|(session, _)| session));

    let attempts = camera.attempts();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[0].facing, Some(FacingMode::Environment));
    assert_eq!(attempts[1].facing, None);

    assert_eq!(transport.connects(), 0);
    assert_eq!(view.phase(), StreamPhase::Error);
    assert_eq!(view.camera_permission(), Some(false));
    assert!(view.session().is_none());

    Ok(())
}

#[tokio::test]
async fn test_desktop_camera_fallback_starts_streaming() -> anyhow::Result<()> {
    let config = test_config("http://127.0.0.1:8000");
    let camera = FakeCamera::new().without_rear_camera();
    let transport = FakeTransport::new();

    let (mut session, _events) = StreamSession::start(&config, &camera, &transport).await?;
    assert_eq!(transport.connects(), 1);
    assert_eq!(camera.streams().len(), 1);
    assert!(session.is_active());

    session.stop();
    assert_eq!(camera.live_streams(), 0);

    Ok(())
}

#[tokio::test]
async fn test_silent_rear_camera_falls_back_and_streams() -> anyhow::Result<()> {
    let config = test_config("http://127.0.0.1:8000");
    let camera = FakeCamera::new().with_silent_rear_camera();
    let transport = FakeTransport::new();

    let (mut session, _events) = StreamSession::start(&config, &camera, &transport).await?;
    let mut peer = transport.take_peer();
    peer.next_frame().await.expect("frames from the fallback camera");

    let streams = camera.streams();
    assert_eq!(streams.len(), 2);
    assert_eq!(streams[0].stop_calls(), 1);
    assert!(streams[1].is_live());
    assert_eq!(transport.connects(), 1);

    session.stop();
    assert_eq!(camera.live_streams(), 0);

    Ok(())
}

#[tokio::test]
async fn test_silent_camera_is_released() -> anyhow::Result<()> {
    let config = test_config("http://127.0.0.1:8000");
    let camera = FakeCamera::new().silent();
    let transport = FakeTransport::new();

    let err = StreamSession::start(&config, &camera, &transport)
        .await
        .unwrap_err();
    assert!(err.is_media_access());
    assert_eq!(transport.connects(), 0);
    assert_eq!(camera.live_streams(), 0);

    Ok(())
}

#[tokio::test]
async fn test_connect_failure_releases_camera() -> anyhow::Result<()> {
    let config = test_config("http://127.0.0.1:8000");
    let camera = FakeCamera::new();
    let transport = FakeTransport::refusing();

    let mut view = StreamView::new();
    view.begin_start();
    let outcome = StreamSession::start(&config, &camera, &transport).await;
    view.started(outcome.map(|(session, _)| session));

    assert_eq!(transport.connects(), 1);
    assert_eq!(camera.live_streams(), 0);
    assert_eq!(view.phase(), StreamPhase::Error);
    assert_eq!(view.error(), Some(MSG_WEBSOCKET));

    Ok(())
}

#[tokio::test]
async fn test_no_frames_before_socket_open() -> anyhow::Result<()> {
    let config = test_config("http://127.0.0.1:8000");
    let camera = FakeCamera::new();
    let transport = FakeTransport::gated();

    let (started, ()) = tokio::join!(
        StreamSession::start(&config, &camera, &transport),
        async {
            // Several capture intervals pass while the socket is connecting.
            tokio::time::sleep(Duration::from_millis(150)).await;
            let mut peer = transport.take_peer();
            assert!(peer.try_frame().is_none(), "frame sent before open");
            transport.open();

            let frame = peer.next_frame().await.expect("a frame after open");
            assert!(frame.starts_with("data:image/jpeg;base64,"));
            let jpeg = decode_data_url(&frame).expect("valid data URL");
            let decoded = image::load_from_memory(&jpeg).expect("valid JPEG");
            assert_eq!((decoded.width(), decoded.height()), (64, 48));
        }
    );

    let (mut session, _events) = started?;
    assert!(session.frames_sent() >= 1);
    session.stop();

    Ok(())
}

#[tokio::test]
async fn test_stop_twice_releases_everything_once() -> anyhow::Result<()> {
    let config = test_config("http://127.0.0.1:8000");
    let camera = FakeCamera::new();
    let transport = FakeTransport::new();

    let (session, _events) = StreamSession::start(&config, &camera, &transport).await?;
    let mut peer = transport.take_peer();
    peer.next_frame().await.expect("capture loop running");

    let mut view = StreamView::new();
    view.begin_start();
    view.started(Ok(session));
    assert!(view.is_streaming());

    view.stop();
    view.stop();

    assert_eq!(view.phase(), StreamPhase::Idle);
    assert!(view.session().is_none());
    assert!(view.result().is_none());

    // camera
    let streams = camera.streams();
    assert_eq!(streams.len(), 1);
    assert_eq!(streams[0].stop_calls(), 1);
    assert_eq!(camera.live_streams(), 0);

    // socket and timer: the capture loop closes the sink on its way out
    let drained = tokio::time::timeout(Duration::from_secs(2), async {
        while peer.frames.next().await.is_some() {}
    })
    .await;
    assert!(drained.is_ok(), "socket was not closed");

    Ok(())
}

#[tokio::test]
async fn test_stop_releases_socket_stuck_in_send() -> anyhow::Result<()> {
    let config = test_config("http://127.0.0.1:8000");
    let camera = FakeCamera::new();
    let transport = FakeTransport::stalled();

    let (mut session, _events) = StreamSession::start(&config, &camera, &transport).await?;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(transport.open_sinks(), 1);
    assert_eq!(session.frames_sent(), 0);

    session.stop();
    assert_eq!(camera.live_streams(), 0);

    let released = tokio::time::timeout(Duration::from_secs(2), async {
        while transport.open_sinks() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(released.is_ok(), "socket still held after stop");

    Ok(())
}

#[tokio::test]
async fn test_server_close_then_stop() -> anyhow::Result<()> {
    let config = test_config("http://127.0.0.1:8000");
    let camera = FakeCamera::new();
    let transport = FakeTransport::new();

    let (session, mut events) = StreamSession::start(&config, &camera, &transport).await?;
    let mut peer = transport.take_peer();

    let mut view = StreamView::new();
    view.begin_start();
    view.started(Ok(session));

    peer.push(live_result(50000, 4.8).to_string());
    view.handle(next_event(&mut events).await);
    assert!(view.result().is_some());

    peer.close();
    let event = next_event(&mut events).await;
    assert_eq!(event.kind, SessionEventKind::Closed);
    view.handle(event);

    assert_eq!(view.phase(), StreamPhase::Idle);
    assert!(view.result().is_none());
    assert!(view.error().is_none());
    assert_eq!(camera.live_streams(), 0);

    // an explicit stop afterwards is harmless
    view.stop();
    assert_eq!(camera.streams()[0].stop_calls(), 1);

    Ok(())
}

#[tokio::test]
async fn test_socket_failure_tears_down_with_alert() -> anyhow::Result<()> {
    let config = test_config("http://127.0.0.1:8000");
    let camera = FakeCamera::new();
    let transport = FakeTransport::new();

    let (session, mut events) = StreamSession::start(&config, &camera, &transport).await?;
    let peer = transport.take_peer();

    let mut view = StreamView::new();
    view.begin_start();
    view.started(Ok(session));

    peer.fail("connection reset");
    let event = next_event(&mut events).await;
    assert!(matches!(event.kind, SessionEventKind::Failed(_)));
    view.handle(event);

    assert_eq!(view.phase(), StreamPhase::Idle);
    assert_eq!(view.error(), Some(MSG_WEBSOCKET));
    assert_eq!(camera.live_streams(), 0);

    Ok(())
}

#[tokio::test]
async fn test_bad_messages_keep_last_result() -> anyhow::Result<()> {
    let config = test_config("http://127.0.0.1:8000");
    let camera = FakeCamera::new();
    let transport = FakeTransport::new();

    let (session, mut events) = StreamSession::start(&config, &camera, &transport).await?;
    let peer = transport.take_peer();

    let mut view = StreamView::new();
    view.begin_start();
    view.started(Ok(session));

    peer.push(live_result(20000, 5.0).to_string());
    view.handle(next_event(&mut events).await);
    let shown = view.result().cloned().expect("result displayed");

    peer.push("not json at all");
    let event = next_event(&mut events).await;
    assert!(matches!(event.kind, SessionEventKind::Malformed(_)));
    view.handle(event);

    peer.push(r#"{"error": "No se pudo decodificar el frame"}"#);
    let event = next_event(&mut events).await;
    assert_eq!(
        event.kind,
        SessionEventKind::ServerError("No se pudo decodificar el frame".to_string())
    );
    view.handle(event);

    assert_eq!(view.result(), Some(&shown));
    assert!(view.is_streaming());
    assert!(view.error().is_none());

    // newest result wins
    peer.push(live_result(70000, 5.2).to_string());
    view.handle(next_event(&mut events).await);
    assert_eq!(view.result().map(|r| r.total_value), Some(70000.0));

    view.stop();
    Ok(())
}

#[tokio::test]
async fn test_events_from_previous_session_are_ignored() -> anyhow::Result<()> {
    let config = test_config("http://127.0.0.1:8000");
    let camera = FakeCamera::new();
    let transport = FakeTransport::new();
    let mut view = StreamView::new();

    let (first, mut first_events) = StreamSession::start(&config, &camera, &transport).await?;
    let first_peer = transport.take_peer();
    view.begin_start();
    view.started(Ok(first));
    first_peer.push(live_result(10000, 5.0).to_string());
    let stale = next_event(&mut first_events).await;
    view.stop();

    let (second, _second_events) = StreamSession::start(&config, &camera, &transport).await?;
    view.begin_start();
    view.started(Ok(second));

    view.handle(stale);
    assert!(view.result().is_none());
    assert!(view.is_streaming());

    view.stop();
    assert_eq!(camera.live_streams(), 0);
    Ok(())
}

#[tokio::test]
async fn test_round_trip_over_websocket() -> anyhow::Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let server = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await?;
        let mut ws = tokio_tungstenite::accept_async(tcp).await?;

        let frame = loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => break text.as_str().to_owned(),
                Some(Ok(_)) => continue,
                other => anyhow::bail!("no frame received: {other:?}"),
            }
        };
        let jpeg = decode_data_url(&frame)?;
        image::load_from_memory(&jpeg)?;

        ws.send(Message::text(live_result(50000, 4.9).to_string()))
            .await?;
        ws.send(Message::text(r#"{"error": "modelo ocupado"}"#))
            .await?;
        ws.close(None).await?;
        while let Some(Ok(_)) = ws.next().await {}
        Ok::<_, anyhow::Error>(())
    });

    let config = test_config(&format!("http://{addr}"));
    let camera = FakeCamera::new();
    let (session, mut events) = StreamSession::start(&config, &camera, &WebSocketTransport).await?;

    let mut view = StreamView::new();
    view.begin_start();
    view.started(Ok(session));

    let mut live_fps = None;
    while view.is_streaming() {
        let event = next_event(&mut events).await;
        view.handle(event);
        if let Some(result) = view.result() {
            live_fps = result.fps;
        }
    }

    assert_eq!(live_fps, Some(4.9));
    assert_eq!(view.phase(), StreamPhase::Idle);
    assert!(view.session().is_none());
    assert_eq!(camera.live_streams(), 0);

    server.await??;
    Ok(())
}

#[tokio::test]
async fn test_latest_frame_follows_camera() -> anyhow::Result<()> {
    let config = test_config("http://127.0.0.1:8000");
    let camera = FakeCamera::new();
    let transport = FakeTransport::new();

    let (mut session, _events) = StreamSession::start(&config, &camera, &transport).await?;
    let first = session.latest_frame().expect("first frame");
    assert_eq!((first.width(), first.height()), (64, 48));

    camera.streams()[0].push_frame(image::RgbImage::new(32, 24));
    let latest = session.latest_frame().expect("pushed frame");
    assert_eq!((latest.width(), latest.height()), (32, 24));

    session.stop();
    assert!(!session.is_active());
    assert!(session.latest_frame().is_none());
    Ok(())
}
