//! Session lifecycle tests: state sealing, teardown idempotence, and the
//! error taxonomy at the start boundary.

mod common;

use std::sync::Arc;
use std::time::Duration;

use aura_live::{ErrorKind, LiveError, LiveSession, MemoryTransport, SessionState};
use common::*;

#[tokio::test]
async fn test_clean_lifecycle_reaches_active_then_idle() {
    let (transport, _remote) = MemoryTransport::pair();
    let (capture, _feed) = ScriptedCapture::new();
    let counters = Arc::clone(&capture.counters);

    let session = LiveSession::new(
        quick_config("lifecycle"),
        Box::new(transport),
        Box::new(capture),
    );
    assert_eq!(session.state(), SessionState::Idle);

    session.start().await.unwrap();
    assert_eq!(session.state(), SessionState::Active);
    assert_eq!(counters.opens(), 1);

    let stats = session.stop().await;
    assert_eq!(stats.state, SessionState::Idle);
    assert_eq!(stats.session_id, "lifecycle");
    assert!(stats.duration_secs >= 0.0);
    assert_eq!(counters.closes(), 1);
}

#[tokio::test]
async fn test_capability_denial_never_touches_the_endpoint() {
    let transport = StallingTransport::new();
    let transport_counters = Arc::clone(&transport.counters);

    let session = LiveSession::new(
        quick_config("denied"),
        Box::new(transport),
        Box::new(ScriptedCapture::denying()),
    );

    let err = session.start().await.unwrap_err();
    assert!(matches!(err, LiveError::CapabilityDenied(_)));
    assert!(matches!(
        session.state(),
        SessionState::Error {
            kind: ErrorKind::CapabilityDenied,
            ..
        }
    ));
    // No handshake was ever attempted
    assert_eq!(transport_counters.connects(), 0);

    let stats = session.stats().await;
    assert_eq!(stats.audio_chunks, 0);
    assert_eq!(stats.video_chunks, 0);
}

#[tokio::test]
async fn test_handshake_timeout_seals_error_and_releases_hardware() {
    let (transport, _remote) = MemoryTransport::pair();
    let transport = transport.with_handshake_delay(Duration::from_secs(30));
    let (capture, _feed) = ScriptedCapture::new();
    let counters = Arc::clone(&capture.counters);

    let mut config = quick_config("slow-endpoint");
    config.handshake_timeout = Duration::from_millis(100);

    let session = LiveSession::new(config, Box::new(transport), Box::new(capture));
    let err = session.start().await.unwrap_err();
    assert!(matches!(err, LiveError::HandshakeTimeout(_)));
    assert!(matches!(
        session.state(),
        SessionState::Error {
            kind: ErrorKind::HandshakeTimeout,
            ..
        }
    ));
    // The microphone grant was given back even though we never went live
    assert_eq!(counters.opens(), 1);
    assert_eq!(counters.closes(), 1);
}

#[tokio::test]
async fn test_refused_handshake_is_a_transport_error() {
    let (capture, _feed) = ScriptedCapture::new();
    let session = LiveSession::new(
        quick_config("refused"),
        Box::new(RefusingTransport),
        Box::new(capture),
    );

    let err = session.start().await.unwrap_err();
    assert!(matches!(err, LiveError::Transport(_)));
    assert!(matches!(
        session.state(),
        SessionState::Error {
            kind: ErrorKind::Transport,
            ..
        }
    ));
}

#[tokio::test]
async fn test_repeated_stops_release_hardware_once() {
    let (transport, _remote) = MemoryTransport::pair();
    let (capture, _feed) = ScriptedCapture::new();
    let counters = Arc::clone(&capture.counters);

    let session = LiveSession::new(
        quick_config("double-stop"),
        Box::new(transport),
        Box::new(capture),
    );
    session.start().await.unwrap();

    session.stop().await;
    session.stop().await;
    let stats = session.stop().await;

    assert_eq!(stats.state, SessionState::Idle);
    assert_eq!(counters.opens(), 1);
    assert_eq!(counters.closes(), 1);
}

#[tokio::test]
async fn test_concurrent_stops_tear_down_once() {
    let (transport, _remote) = MemoryTransport::pair();
    let (capture, _feed) = ScriptedCapture::new();
    let counters = Arc::clone(&capture.counters);

    let session = LiveSession::new(
        quick_config("racing-stops"),
        Box::new(transport),
        Box::new(capture),
    );
    session.start().await.unwrap();

    let mut stoppers = Vec::new();
    for _ in 0..3 {
        let session = Arc::clone(&session);
        stoppers.push(tokio::spawn(async move { session.stop().await }));
    }
    for stopper in stoppers {
        let stats = stopper.await.unwrap();
        assert_eq!(stats.state, SessionState::Idle);
    }

    assert_eq!(counters.closes(), 1);
}

#[tokio::test]
async fn test_stop_during_handshake_cancels_cleanly() {
    let (transport, _remote) = MemoryTransport::pair();
    let transport = transport.with_handshake_delay(Duration::from_secs(30));
    let (capture, _feed) = ScriptedCapture::new();
    let counters = Arc::clone(&capture.counters);

    let mut config = quick_config("cancelled");
    config.handshake_timeout = Duration::from_secs(60);

    let session = LiveSession::new(config, Box::new(transport), Box::new(capture));
    let starter = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.start().await })
    };

    // Let start() get into the handshake, then pull the plug
    tokio::time::sleep(Duration::from_millis(100)).await;
    let stats = session.stop().await;

    // Cancellation is not an error
    starter.await.unwrap().unwrap();
    assert_eq!(stats.state, SessionState::Idle);
    assert_eq!(counters.closes(), 1);
}

#[tokio::test]
async fn test_stop_during_capture_open_cancels_before_the_handshake() {
    let transport = StallingTransport::new();
    let transport_counters = Arc::clone(&transport.counters);
    let (capture, _feed) = ScriptedCapture::new();
    let capture = capture.with_open_delay(Duration::from_millis(150));
    let counters = Arc::clone(&capture.counters);

    let session = LiveSession::new(
        quick_config("early-hangup"),
        Box::new(transport),
        Box::new(capture),
    );
    let starter = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.start().await })
    };

    // Pull the plug while the permission prompt is still up
    tokio::time::sleep(Duration::from_millis(50)).await;
    let stats = session.stop().await;

    // Cancellation is not an error, and the endpoint was never dialed
    starter.await.unwrap().unwrap();
    assert_eq!(stats.state, SessionState::Idle);
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(transport_counters.connects(), 0);
    assert_eq!(counters.opens(), 1);
    assert_eq!(counters.closes(), 1);
}

#[tokio::test]
async fn test_send_failures_escalate_after_bounded_retries() {
    let transport = FailingTransport::new();
    let transport_counters = Arc::clone(&transport.counters);
    let (capture, feed) = ScriptedCapture::new();
    let capture_counters = Arc::clone(&capture.counters);

    let session = LiveSession::new(
        quick_config("broken-pipe"),
        Box::new(transport),
        Box::new(capture),
    );
    session.start().await.unwrap();

    feed.send(flat_buffer(1024, 0)).await.unwrap();

    let state = wait_for_state(session.watch_state(), Duration::from_secs(2), |s| {
        s.is_error()
    })
    .await;
    assert!(matches!(
        state,
        SessionState::Error {
            kind: ErrorKind::Transport,
            ..
        }
    ));

    // One chunk, the configured number of attempts, one close
    assert_eq!(transport_counters.sends(), 3);
    assert_eq!(transport_counters.closes(), 1);
    assert_eq!(capture_counters.closes(), 1);

    // A later stop() cannot overwrite the error outcome
    let stats = session.stop().await;
    assert!(stats.state.is_error());
}

#[tokio::test]
async fn test_unencodable_buffer_is_dropped_not_fatal() {
    let (transport, _remote) = MemoryTransport::pair();
    let (capture, feed) = ScriptedCapture::new();

    let session = LiveSession::new(
        quick_config("bad-buffer"),
        Box::new(transport),
        Box::new(capture),
    );
    session.start().await.unwrap();

    // One poisoned buffer, then a clean one
    feed.send(nan_buffer(1024, 0)).await.unwrap();
    feed.send(flat_buffer(1024, 64)).await.unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let stats = session.stats().await;
        if stats.audio_chunks == 1 {
            assert_eq!(stats.encode_failures, 1);
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "clean chunk never made it through"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    // One bad buffer costs one chunk, not the session
    assert_eq!(session.state(), SessionState::Active);

    let stats = session.stop().await;
    assert_eq!(stats.state, SessionState::Idle);
}

#[tokio::test]
async fn test_repeated_encode_failures_seal_an_encoding_error() {
    let (transport, _remote) = MemoryTransport::pair();
    let (capture, feed) = ScriptedCapture::new();
    let counters = Arc::clone(&capture.counters);

    let mut config = quick_config("poisoned-mic");
    config.encode_failure_limit = 3;

    let session = LiveSession::new(config, Box::new(transport), Box::new(capture));
    session.start().await.unwrap();

    for n in 0..3 {
        feed.send(nan_buffer(1024, n * 64)).await.unwrap();
    }

    let state = wait_for_state(session.watch_state(), Duration::from_secs(2), |s| {
        s.is_error()
    })
    .await;
    assert!(matches!(
        state,
        SessionState::Error {
            kind: ErrorKind::Encoding,
            ..
        }
    ));

    let stats = session.stats().await;
    assert_eq!(stats.encode_failures, 3);
    assert_eq!(stats.audio_chunks, 0);
    assert_eq!(counters.closes(), 1);
}

#[tokio::test]
async fn test_a_good_buffer_resets_the_failure_ladder() {
    let (transport, _remote) = MemoryTransport::pair();
    let (capture, feed) = ScriptedCapture::new();

    let mut config = quick_config("flaky-mic");
    config.encode_failure_limit = 2;

    let session = LiveSession::new(config, Box::new(transport), Box::new(capture));
    session.start().await.unwrap();

    // Alternating bad and good: the total reaches the limit but the
    // consecutive count never does
    feed.send(nan_buffer(1024, 0)).await.unwrap();
    feed.send(flat_buffer(1024, 64)).await.unwrap();
    feed.send(nan_buffer(1024, 128)).await.unwrap();
    feed.send(flat_buffer(1024, 192)).await.unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let stats = session.stats().await;
        if stats.audio_chunks == 2 {
            assert_eq!(stats.encode_failures, 2);
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "clean chunks never made it through"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(session.state(), SessionState::Active);
    session.stop().await;
}

#[tokio::test]
async fn test_endpoint_hanging_up_fails_the_session() {
    let (transport, mut remote) = MemoryTransport::pair();
    let (capture, _feed) = ScriptedCapture::new();

    let session = LiveSession::new(
        quick_config("hangup"),
        Box::new(transport),
        Box::new(capture),
    );
    session.start().await.unwrap();

    remote.hang_up();

    let state = wait_for_state(session.watch_state(), Duration::from_secs(2), |s| {
        s.is_error()
    })
    .await;
    assert!(matches!(
        state,
        SessionState::Error {
            kind: ErrorKind::Transport,
            ..
        }
    ));
}

#[tokio::test]
async fn test_capture_stream_ending_fails_the_session() {
    let (transport, _remote) = MemoryTransport::pair();
    let (capture, feed) = ScriptedCapture::new();

    let session = LiveSession::new(
        quick_config("dead-mic"),
        Box::new(transport),
        Box::new(capture),
    );
    session.start().await.unwrap();

    // Microphone dies mid-session
    drop(feed);

    let state = wait_for_state(session.watch_state(), Duration::from_secs(2), |s| {
        s.is_error()
    })
    .await;
    assert!(matches!(
        state,
        SessionState::Error {
            kind: ErrorKind::Transport,
            ..
        }
    ));
}

#[tokio::test]
async fn test_start_after_terminal_state_is_rejected() {
    let (transport, _remote) = MemoryTransport::pair();
    let (capture, _feed) = ScriptedCapture::new();

    let session = LiveSession::new(
        quick_config("one-shot"),
        Box::new(transport),
        Box::new(capture),
    );
    session.start().await.unwrap();
    session.stop().await;

    assert!(matches!(
        session.start().await,
        Err(LiveError::AlreadyStarted)
    ));
    // Still idle; the failed restart did not disturb the terminal state
    assert_eq!(session.state(), SessionState::Idle);
}
