//! Session tests driven by replay sources
//!
//! These verify status transitions, observable outputs and teardown without
//! a network.

use super::*;
use crate::sources::{ReplayFeed, ReplaySource};
use crate::test_utils::{header_json, uniform_cycle};
use crate::types::StreamMessage;
use crate::{ErrorCategory, StreamError};
use std::time::Duration;

fn config() -> StreamConfig {
    StreamConfig::new("127.0.0.1", "secret").with_display_width(200)
}

async fn fed_session() -> (ReplayFeed, StreamSession) {
    let _ = tracing_subscriber::fmt::try_init();
    let (feed, source) = ReplaySource::feed();
    let mut session = StreamSession::new(config());
    session.connect_with_source(source).await;
    (feed, session)
}

async fn next_frame(frames: &mut BoxStream<'static, RenderedFrame>) -> RenderedFrame {
    tokio::time::timeout(Duration::from_secs(5), frames.next())
        .await
        .expect("timed out waiting for a frame")
        .expect("frame stream ended")
}

async fn wait_for_status(
    session: &StreamSession,
    wanted: fn(&ConnectionStatus) -> bool,
) -> ConnectionStatus {
    let mut updates = Box::pin(session.status_updates());
    tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(status) = updates.next().await {
            if wanted(&status) {
                return status;
            }
        }
        panic!("status stream ended");
    })
    .await
    .expect("timed out waiting for status")
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition never became true");
}

struct FailingSource;

#[async_trait::async_trait]
impl MessageSource for FailingSource {
    async fn next_message(&mut self) -> Result<Option<StreamMessage>> {
        Err(StreamError::transport("connection reset by peer"))
    }

    fn describe(&self) -> String {
        "failing".to_string()
    }
}

#[tokio::test]
async fn renders_completed_cycles() {
    let (feed, session) = fed_session().await;
    let mut frames = session.frames(UpdateRate::Native);
    assert_eq!(session.status(), ConnectionStatus::Connected);

    assert!(feed.send_all(uniform_cycle(1.0, 8, 6, [0, 0, 255], 1500)));
    let frame = next_frame(&mut frames).await;

    assert_eq!(frame.mode, ViewMode::Depth);
    assert_eq!(frame.timestamp, 1.0);
    assert_eq!(frame.dimensions(), (8, 6));
    assert!(frame.probe.is_some());

    let header = session.current_header().expect("header published");
    assert_eq!((header.depth.width, header.depth.height), (8, 6));

    let stats = session.stats();
    assert_eq!(stats.messages, 4);
    assert_eq!(stats.cycles_completed, 1);
    assert_eq!(stats.frames_rendered, 1);
    assert!(session.last_frame().is_some());
}

#[tokio::test]
async fn frame_rate_follows_headers() {
    let (feed, session) = fed_session().await;
    let mut frames = session.frames(UpdateRate::Native);

    for ts in [0.0, 100.0, 250.0] {
        feed.send_all(uniform_cycle(ts, 2, 2, [0, 0, 0], 500));
    }
    while next_frame(&mut frames).await.timestamp < 250.0 {}

    let rate = session.frame_rate().expect("rate after two headers");
    assert!((rate - 6.67).abs() < 0.01, "got {rate}");
}

#[tokio::test]
async fn switching_view_mode_redraws_last_cycle() {
    let (feed, mut session) = fed_session().await;
    let mut frames = session.frames(UpdateRate::Native);

    feed.send_all(uniform_cycle(7.0, 8, 6, [0, 0, 255], 1500));
    let depth = next_frame(&mut frames).await;
    assert_eq!(depth.mode, ViewMode::Depth);

    assert_eq!(session.toggle_view_mode(), ViewMode::Color);
    let color = next_frame(&mut frames).await;

    assert_eq!(color.mode, ViewMode::Color);
    assert_eq!(color.timestamp, 7.0);
    assert_eq!(color.dimensions(), (200, 150));
    assert_eq!(color.buffer.pixel(0, 0), Some([255, 0, 0, 255]));
    assert_eq!(session.stats().cycles_completed, 1);
    assert_eq!(session.stats().frames_rendered, 2);
}

#[tokio::test]
async fn malformed_messages_do_not_interrupt_the_stream() {
    let (feed, session) = fed_session().await;
    let mut frames = session.frames(UpdateRate::Native);

    feed.send(StreamMessage::Binary(bytes::Bytes::from_static(&[0; 8])));
    feed.send(StreamMessage::Text("{\"type\":\"status\"}".into()));
    feed.send_all(uniform_cycle(3.0, 4, 4, [0, 0, 0], 900));

    let frame = next_frame(&mut frames).await;
    assert_eq!(frame.timestamp, 3.0);
    assert_eq!(session.status(), ConnectionStatus::Connected);

    let stats = session.stats();
    assert_eq!(stats.unexpected_payloads, 1);
    assert_eq!(stats.malformed_headers, 1);
}

#[tokio::test]
async fn missing_host_is_rejected_before_connecting() {
    let mut session = StreamSession::new(StreamConfig::new("", "secret"));

    let err = session.connect().await.unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Configuration);
    assert!(!err.is_recoverable());
    assert!(matches!(session.status(), ConnectionStatus::Error { .. }));
}

#[tokio::test]
async fn end_of_stream_disconnects() {
    let _ = tracing_subscriber::fmt::try_init();
    let mut session = StreamSession::new(config());
    session.connect_with_source(ReplaySource::new(uniform_cycle(1.0, 2, 2, [0, 0, 0], 500))).await;

    wait_for_status(&session, |s| *s == ConnectionStatus::Disconnected).await;

    assert!(session.last_frame().is_some());
    assert!(!session.is_online());
}

#[tokio::test]
async fn transport_failure_surfaces_as_error_status() {
    let _ = tracing_subscriber::fmt::try_init();
    let mut session = StreamSession::new(config());
    session.connect_with_source(FailingSource).await;

    let status = wait_for_status(&session, |s| matches!(s, ConnectionStatus::Error { .. })).await;

    assert_eq!(status.error_message(), Some("Stream transport error: connection reset by peer"));
}

#[tokio::test]
async fn close_tears_down_the_source() {
    let (feed, mut session) = fed_session().await;

    session.close().await;

    assert_eq!(session.status(), ConnectionStatus::Disconnected);
    assert!(!feed.send(StreamMessage::Text(header_json(1.0, 2, 2))));
}

#[tokio::test]
async fn dropping_the_session_cancels_the_driver() {
    let (feed, session) = fed_session().await;
    drop(session);

    wait_until(|| !feed.send(StreamMessage::Text(header_json(1.0, 2, 2)))).await;
}

#[tokio::test]
async fn reconnecting_replaces_the_driver() {
    let (first_feed, mut session) = fed_session().await;
    let mut frames = session.frames(UpdateRate::Native);
    first_feed.send_all(uniform_cycle(1.0, 2, 2, [0, 0, 0], 500));
    next_frame(&mut frames).await;

    let (second_feed, source) = ReplaySource::feed();
    session.connect_with_source(source).await;

    // The old driver has already exited, so its source is gone
    assert!(!first_feed.send(StreamMessage::Text(header_json(9.0, 2, 2))));
    assert_eq!(session.stats(), PipelineStats::default());

    second_feed.send_all(uniform_cycle(2.0, 2, 2, [0, 0, 0], 500));
    assert_eq!(next_frame(&mut frames).await.timestamp, 2.0);
    assert_eq!(session.status(), ConnectionStatus::Connected);
}

#[tokio::test(start_paused = true)]
async fn liveness_expires_without_messages() {
    let (feed, mut session) = fed_session().await;
    assert!(!session.is_online());

    feed.send(StreamMessage::Text(header_json(1.0, 2, 2)));
    wait_until(|| session.current_header().is_some()).await;
    assert!(session.is_online());

    // Independent of view mode
    session.set_view_mode(ViewMode::Color);
    tokio::time::advance(Duration::from_millis(1499)).await;
    assert!(session.is_online());

    tokio::time::advance(Duration::from_millis(1)).await;
    assert!(!session.is_online());
}

#[tokio::test(start_paused = true)]
async fn diagnostic_tick_never_renders() {
    let _ = tracing_subscriber::fmt::try_init();
    let (feed, source) = ReplaySource::feed();
    let config = config().with_diagnostic_interval(Duration::from_millis(16));
    let mut session = StreamSession::new(config);
    session.connect_with_source(source).await;

    feed.send(StreamMessage::Text(header_json(1.0, 2, 2)));
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert_eq!(session.stats().frames_rendered, 0);
    assert!(session.last_frame().is_none());
    assert_eq!(session.status(), ConnectionStatus::Connected);
}
