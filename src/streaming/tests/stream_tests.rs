//! Tests for the assembled pipeline.

use super::super::error::StreamError;
use super::super::link::LinkEvent;
use super::super::sources::{HostInterface, TcpTransport};
use super::super::stream::*;
use super::super::transmitter::ConnectionState;
use super::{
    Behavior, CountingSource, MockTransport, PanickingSource, RecordingInterface, ScriptedSource,
    decode_le,
};
use crate::config::StreamerConfig;
use crate::error::MicStreamError;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;

fn test_config() -> StreamerConfig {
    StreamerConfig {
        buffer_length: 4,
        sample_period_ms: 10,
        send_period_ms: 100,
        endpoint: "collector.local:12345".to_string(),
        reconnect_backoff_ms: 50,
        connect_timeout_ms: 200,
        write_timeout_ms: 200,
        ..StreamerConfig::default()
    }
}

#[tokio::test]
async fn test_pipeline_rejects_invalid_config() {
    let config = StreamerConfig {
        buffer_length: 0,
        ..test_config()
    };

    let result = Pipeline::start(
        &config,
        CountingSource::new(2048),
        MockTransport::healthy(),
        RecordingInterface::responsive(),
    );

    assert!(matches!(result, Err(MicStreamError::Config(_))));
}

#[tokio::test]
async fn test_pipeline_streams_windows_over_tcp() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let config = StreamerConfig {
        endpoint: listener.local_addr().unwrap().to_string(),
        sample_period_ms: 1,
        send_period_ms: 10,
        ..test_config()
    };

    // 3071 on a 12-bit scale is (3071 - 2048) / 2048.
    let expected = 1023.0f32 / 2048.0;
    let pipeline = Pipeline::start(
        &config,
        CountingSource::new(3071),
        TcpTransport::default(),
        HostInterface::default(),
    )
    .unwrap();

    let (mut socket, _) = tokio::time::timeout(Duration::from_secs(5), listener.accept())
        .await
        .expect("pipeline should connect")
        .unwrap();

    let mut frame = [0u8; 16];
    let full_window = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            socket.read_exact(&mut frame).await.unwrap();
            let window = decode_le(&frame);
            assert_eq!(window.len(), 4);
            if window.iter().all(|&v| v == expected) {
                break window;
            }
        }
    })
    .await
    .expect("a full window should arrive");
    assert_eq!(full_window, vec![expected; 4]);

    let stats = pipeline.shutdown().await.unwrap();
    assert!(stats.windows_sent >= 1);
    assert_eq!(stats.bytes_sent, stats.windows_sent * 16);
    assert_eq!(stats.association_attempts, 1);
}

#[tokio::test(start_paused = true)]
async fn test_sampler_cadence_independent_of_network() {
    async fn samples_in_one_second(transport: MockTransport) -> u64 {
        let pipeline = Pipeline::start(
            &test_config(),
            CountingSource::new(2048),
            transport,
            RecordingInterface::responsive(),
        )
        .unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        let pushed = pipeline.stats().samples_pushed;
        pipeline.shutdown().await.unwrap();
        pushed
    }

    let healthy = samples_in_one_second(MockTransport::healthy()).await;
    let refused = samples_in_one_second(MockTransport::with_fallbacks(
        Behavior::Fail,
        Behavior::Succeed,
    ))
    .await;
    let stalled = samples_in_one_second(MockTransport::with_fallbacks(
        Behavior::Hang,
        Behavior::Succeed,
    ))
    .await;
    let stalled_writes = samples_in_one_second(MockTransport::with_fallbacks(
        Behavior::Succeed,
        Behavior::Hang,
    ))
    .await;

    assert!((99..=102).contains(&healthy), "healthy pipeline pushed {healthy}");
    for (name, pushed) in [
        ("refused", refused),
        ("stalled", stalled),
        ("stalled writes", stalled_writes),
    ] {
        assert!(
            pushed.abs_diff(healthy) <= 1,
            "{name}: {pushed} samples vs {healthy} with a healthy network"
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_hardware_errors_repeat_previous_sample() {
    let source = ScriptedSource::new(vec![
        Ok(3072),
        Err(StreamError::hardware("conversion timeout")),
        Ok(1024),
    ]);
    let pipeline = Pipeline::start(
        &test_config(),
        source,
        MockTransport::healthy(),
        RecordingInterface::silent(),
    )
    .unwrap();

    tokio::time::sleep(Duration::from_millis(25)).await;

    let window: Vec<f32> = pipeline
        .buffer()
        .snapshot()
        .into_iter()
        .map(f32::from)
        .collect();
    assert_eq!(window, vec![0.0, 0.5, 0.5, -0.5]);

    let stats = pipeline.stats();
    assert_eq!(stats.samples_pushed, 3);
    assert_eq!(stats.read_errors, 1);
    assert_eq!(pipeline.error_metrics().hardware_errors, 1);
    pipeline.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_link_loss_closes_connection_and_reassociates() {
    let transport = MockTransport::healthy();
    let interface = RecordingInterface::silent();
    let pipeline = Pipeline::start(
        &test_config(),
        CountingSource::new(2048),
        transport.clone(),
        interface.clone(),
    )
    .unwrap();
    let events = pipeline.link_events();
    let mut state = pipeline.subscribe_state();

    // Nothing connects until the interface reports association.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(transport.connect_attempts(), 0);
    assert!(!pipeline.link().is_link_ready());
    assert_eq!(interface.requests(), 1);

    events.send(LinkEvent::Associated).unwrap();
    state.wait_for(|s| s.is_connected()).await.unwrap();
    assert_eq!(pipeline.connection_state(), ConnectionState::Connected);

    events.send(LinkEvent::Disassociated).unwrap();
    state
        .wait_for(|s| *s == ConnectionState::Disconnected)
        .await
        .unwrap();
    assert_eq!(transport.closes(), 1);

    // The loss triggered a new association request and no reconnect.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(interface.requests(), 2);
    assert_eq!(transport.connect_attempts(), 1);

    let stats = pipeline.shutdown().await.unwrap();
    assert_eq!(stats.link_losses, 1);
    assert_eq!(stats.association_attempts, 2);
    assert_eq!(stats.connections_closed, 1);
}

#[tokio::test(start_paused = true)]
async fn test_link_flap_with_responsive_interface_reconnects() {
    let transport = MockTransport::healthy();
    let interface = RecordingInterface::responsive();
    let pipeline = Pipeline::start(
        &test_config(),
        CountingSource::new(2048),
        transport.clone(),
        interface.clone(),
    )
    .unwrap();
    let events = pipeline.link_events();
    let mut state = pipeline.subscribe_state();
    state.wait_for(|s| s.is_connected()).await.unwrap();
    assert_eq!(transport.connect_attempts(), 1);

    // The interface reassociates at once, so the link is ready again
    // before the transmitter is scheduled.
    events.send(LinkEvent::Disassociated).unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert!(pipeline.link().is_link_ready());
    assert_eq!(pipeline.link().status().losses, 1);
    assert_eq!(transport.closes(), 1);
    assert_eq!(transport.connect_attempts(), 2);
    assert_eq!(transport.open_connections(), 1);
    assert_eq!(pipeline.connection_state(), ConnectionState::Connected);

    let stats = pipeline.shutdown().await.unwrap();
    assert_eq!(stats.link_losses, 1);
    assert_eq!(stats.association_attempts, 2);
    assert_eq!(stats.connections_closed, 2);
}

#[tokio::test(start_paused = true)]
async fn test_fatal_transmitter_error_leaves_sampler_running() {
    let pipeline = Pipeline::start(
        &test_config(),
        CountingSource::new(2048),
        MockTransport::with_fallbacks(Behavior::Fatal, Behavior::Succeed),
        RecordingInterface::responsive(),
    )
    .unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(pipeline.is_transmitter_finished());
    assert!(pipeline.is_sampler_running());
    let before = pipeline.stats().samples_pushed;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(pipeline.stats().samples_pushed > before);

    match pipeline.shutdown().await {
        Err(MicStreamError::Stream(StreamError::ResourceAllocation { .. })) => {}
        other => panic!("expected fatal transmitter error, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_closes_open_connection() {
    let transport = MockTransport::healthy();
    let pipeline = Pipeline::start(
        &test_config(),
        CountingSource::new(2048),
        transport.clone(),
        RecordingInterface::responsive(),
    )
    .unwrap();
    let cancel = pipeline.cancel_token();

    tokio::time::sleep(Duration::from_millis(450)).await;
    assert_eq!(transport.open_connections(), 1);

    let stats = pipeline.shutdown().await.unwrap();
    assert!(cancel.is_cancelled());
    assert_eq!(transport.open_connections(), 0);
    assert_eq!(stats.connect_attempts, 1);
    assert!(stats.windows_sent >= 4);
    assert_eq!(transport.frames().len() as u64, stats.windows_sent);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_joins_every_task_after_sampler_panic() {
    let transport = MockTransport::healthy();
    let pipeline = Pipeline::start(
        &test_config(),
        PanickingSource,
        transport.clone(),
        RecordingInterface::responsive(),
    )
    .unwrap();

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(!pipeline.is_sampler_running());
    assert_eq!(transport.open_connections(), 1);

    match pipeline.shutdown().await {
        Err(MicStreamError::TaskJoin { task: "sampler", .. }) => {}
        other => panic!("expected sampler join error, got {other:?}"),
    }
    // The transmitter was still awaited and closed its connection.
    assert_eq!(transport.open_connections(), 0);
    assert_eq!(transport.closes(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_fatal_transmitter_error_wins_over_sampler_panic() {
    let pipeline = Pipeline::start(
        &test_config(),
        PanickingSource,
        MockTransport::with_fallbacks(Behavior::Fatal, Behavior::Succeed),
        RecordingInterface::responsive(),
    )
    .unwrap();

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(pipeline.is_transmitter_finished());
    assert!(!pipeline.is_sampler_running());

    match pipeline.shutdown().await {
        Err(MicStreamError::Stream(StreamError::ResourceAllocation { .. })) => {}
        other => panic!("expected fatal transmitter error, got {other:?}"),
    }
}
