//! Shared stubs for the integration tests.
//!
//! Capture and transport doubles that count their lifecycle calls, so
//! tests can assert resources are acquired and released exactly once.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use aura_live::{
    AudioBuffer, CaptureBackend, CaptureConfig, CaptureError, CaptureStreams, FrameSource,
    LiveTransport, MediaPayload, MediaSender, RawFrame, ServerStream, SessionConfig, SessionState,
    TransportChannels, TransportError,
};

/// Session config tuned for fast tests.
pub fn quick_config(session_id: &str) -> SessionConfig {
    SessionConfig {
        frame_interval: Duration::from_millis(25),
        handshake_timeout: Duration::from_millis(500),
        ..SessionConfig::new(session_id)
    }
}

/// A small valid RGB frame.
pub fn tiny_frame() -> RawFrame {
    RawFrame {
        width: 8,
        height: 8,
        pixels: vec![200; 8 * 8 * 3],
        timestamp_ms: 0,
    }
}

/// An audio buffer of constant 0.25 samples (encodes to PCM 8192).
pub fn flat_buffer(samples: usize, timestamp_ms: u64) -> AudioBuffer {
    AudioBuffer {
        samples: vec![0.25; samples],
        sample_rate: 16_000,
        timestamp_ms,
    }
}

/// An audio buffer poisoned with non-finite samples; never encodes.
pub fn nan_buffer(samples: usize, timestamp_ms: u64) -> AudioBuffer {
    AudioBuffer {
        samples: vec![f32::NAN; samples],
        sample_rate: 16_000,
        timestamp_ms,
    }
}

/// Block until the session state satisfies `pred`, or panic on timeout.
pub async fn wait_for_state<F>(
    mut rx: watch::Receiver<SessionState>,
    timeout: Duration,
    pred: F,
) -> SessionState
where
    F: Fn(&SessionState) -> bool,
{
    tokio::time::timeout(timeout, async {
        loop {
            {
                let state = rx.borrow();
                if pred(&state) {
                    return state.clone();
                }
            }
            rx.changed().await.expect("state channel closed");
        }
    })
    .await
    .expect("state not reached in time")
}

// ============================================================================
// Capture stubs
// ============================================================================

#[derive(Default)]
pub struct CaptureCounters {
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
}

impl CaptureCounters {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

struct StaticFrameSource {
    frame: Option<RawFrame>,
}

impl FrameSource for StaticFrameSource {
    fn latest_frame(&self) -> Option<RawFrame> {
        self.frame.clone()
    }
}

/// Capture backend driven by the test: audio buffers arrive on a channel
/// the test writes to, and the camera shows a fixed frame (or nothing).
pub struct ScriptedCapture {
    pub counters: Arc<CaptureCounters>,
    deny: bool,
    feed: Option<mpsc::Receiver<AudioBuffer>>,
    frame: Option<RawFrame>,
    open: bool,
    open_delay: Duration,
}

impl ScriptedCapture {
    /// A backend plus the sender that feeds its microphone.
    pub fn new() -> (Self, mpsc::Sender<AudioBuffer>) {
        let (tx, rx) = mpsc::channel(64);
        let backend = Self {
            counters: Arc::new(CaptureCounters::default()),
            deny: false,
            feed: Some(rx),
            frame: None,
            open: false,
            open_delay: Duration::ZERO,
        };
        (backend, tx)
    }

    /// A backend that refuses access outright.
    pub fn denying() -> Self {
        Self {
            counters: Arc::new(CaptureCounters::default()),
            deny: true,
            feed: None,
            frame: None,
            open: false,
            open_delay: Duration::ZERO,
        }
    }

    /// Give the camera something to show.
    pub fn with_frame(mut self, frame: RawFrame) -> Self {
        self.frame = Some(frame);
        self
    }

    /// Make open() take a while, like a real permission prompt.
    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = delay;
        self
    }
}

#[async_trait]
impl CaptureBackend for ScriptedCapture {
    async fn open(&mut self, _config: &CaptureConfig) -> Result<CaptureStreams, CaptureError> {
        if !self.open_delay.is_zero() {
            tokio::time::sleep(self.open_delay).await;
        }
        if self.deny {
            return Err(CaptureError::AccessDenied("microphone refused".to_string()));
        }
        let feed = self
            .feed
            .take()
            .ok_or_else(|| CaptureError::Stream("already opened".to_string()))?;
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        self.open = true;
        Ok(CaptureStreams {
            audio: feed,
            frames: Arc::new(StaticFrameSource {
                frame: self.frame.clone(),
            }),
        })
    }

    async fn close(&mut self) -> Result<(), CaptureError> {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
        self.open = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

// ============================================================================
// Transport stubs
// ============================================================================

#[derive(Default)]
pub struct TransportCounters {
    pub connects: AtomicUsize,
    pub sends: AtomicUsize,
    pub closes: AtomicUsize,
}

impl TransportCounters {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn sends(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

/// Transport whose sends hang forever: a wedged network path.
pub struct StallingTransport {
    pub counters: Arc<TransportCounters>,
}

impl StallingTransport {
    pub fn new() -> Self {
        Self {
            counters: Arc::new(TransportCounters::default()),
        }
    }
}

#[async_trait]
impl LiveTransport for StallingTransport {
    async fn connect(&self, _session_id: &str) -> Result<TransportChannels, TransportError> {
        self.counters.connects.fetch_add(1, Ordering::SeqCst);
        Ok(TransportChannels {
            sender: Box::new(StalledSender {
                counters: Arc::clone(&self.counters),
            }),
            stream: Box::new(SilentStream),
        })
    }
}

struct StalledSender {
    counters: Arc<TransportCounters>,
}

#[async_trait]
impl MediaSender for StalledSender {
    async fn send(&mut self, _payload: &MediaPayload) -> Result<(), TransportError> {
        self.counters.sends.fetch_add(1, Ordering::SeqCst);
        std::future::pending::<()>().await;
        unreachable!()
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Inbound stream that never produces anything (and never ends).
struct SilentStream;

#[async_trait]
impl ServerStream for SilentStream {
    async fn next(&mut self) -> Option<Result<Vec<u8>, TransportError>> {
        std::future::pending::<()>().await;
        unreachable!()
    }
}

/// Transport whose sends always fail after connecting fine.
pub struct FailingTransport {
    pub counters: Arc<TransportCounters>,
}

impl FailingTransport {
    pub fn new() -> Self {
        Self {
            counters: Arc::new(TransportCounters::default()),
        }
    }
}

#[async_trait]
impl LiveTransport for FailingTransport {
    async fn connect(&self, _session_id: &str) -> Result<TransportChannels, TransportError> {
        self.counters.connects.fetch_add(1, Ordering::SeqCst);
        Ok(TransportChannels {
            sender: Box::new(BrokenSender {
                counters: Arc::clone(&self.counters),
            }),
            stream: Box::new(SilentStream),
        })
    }
}

struct BrokenSender {
    counters: Arc<TransportCounters>,
}

#[async_trait]
impl MediaSender for BrokenSender {
    async fn send(&mut self, _payload: &MediaPayload) -> Result<(), TransportError> {
        self.counters.sends.fetch_add(1, Ordering::SeqCst);
        Err(TransportError::Send("connection reset".to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Transport that refuses the handshake.
pub struct RefusingTransport;

#[async_trait]
impl LiveTransport for RefusingTransport {
    async fn connect(&self, _session_id: &str) -> Result<TransportChannels, TransportError> {
        Err(TransportError::Handshake("endpoint refused".to_string()))
    }
}
