use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{error, info, warn};

use crate::capture::CaptureBackend;
use crate::transport::LiveTransport;

use super::config::SessionConfig;
use super::error::{FailureSignal, LiveError};
use super::mux::OutboundMux;
use super::pipeline::AudioPipeline;
use super::relay::InboundRelay;
use super::sampler::FrameSampler;
use super::state::{ErrorKind, SessionState};
use super::stats::{SessionCounters, SessionStats};
use super::transcript::Transcript;

/// How long tasks get to drain before being aborted
const TEARDOWN_GRACE: Duration = Duration::from_secs(1);

/// First producer failure wins; later ones are dropped
const FAILURE_CAPACITY: usize = 4;

type NamedTask = (&'static str, JoinHandle<()>);

/// How a teardown was reached; decides the terminal state.
enum Teardown {
    Clean,
    Failed(LiveError),
}

/// A live multimodal session: microphone and camera in, reply text out.
///
/// One instance runs one session from `Idle` through `Connecting` and
/// `Active` to a terminal `Idle` or `Error`. Once started, four tasks do
/// the work: the audio pipeline and frame sampler produce encoded
/// chunks, the outbound multiplexer is the transport's single writer,
/// and the inbound relay feeds the transcript. Teardown runs exactly
/// once regardless of how many callers race into it.
pub struct LiveSession {
    /// Session configuration
    config: SessionConfig,

    /// When the session was created
    created_at: DateTime<Utc>,

    /// Observable lifecycle state
    state: watch::Sender<SessionState>,

    /// Stop signal watched by every session task
    shutdown: watch::Sender<bool>,

    /// Reply text accumulated by the inbound relay
    transcript: Arc<Transcript>,

    /// Media counters shared with the producer tasks
    counters: Arc<SessionCounters>,

    /// Set once start() has been called
    started: AtomicBool,

    /// Set by whichever teardown ran first
    closed: AtomicBool,

    /// Transport, consumed by start()
    transport: Mutex<Option<Box<dyn LiveTransport>>>,

    /// Capture backend; stays here so teardown releases it exactly once
    capture: Mutex<Option<Box<dyn CaptureBackend>>>,

    /// Running session tasks, joined on teardown
    tasks: Mutex<Vec<NamedTask>>,

    /// Producer-failure channel; the monitor reads, tasks write
    failure_tx: mpsc::Sender<LiveError>,
    failure_rx: Mutex<Option<mpsc::Receiver<LiveError>>>,
}

impl LiveSession {
    /// Create a session in `Idle`. Nothing is opened until `start()`.
    pub fn new(
        config: SessionConfig,
        transport: Box<dyn LiveTransport>,
        capture: Box<dyn CaptureBackend>,
    ) -> Arc<Self> {
        info!(session_id = %config.session_id, "creating live session");
        let (state, _) = watch::channel(SessionState::Idle);
        let (shutdown, _) = watch::channel(false);
        let (failure_tx, failure_rx) = mpsc::channel(FAILURE_CAPACITY);

        Arc::new(Self {
            config,
            created_at: Utc::now(),
            state,
            shutdown,
            transcript: Arc::new(Transcript::new()),
            counters: Arc::new(SessionCounters::default()),
            started: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            transport: Mutex::new(Some(transport)),
            capture: Mutex::new(Some(capture)),
            tasks: Mutex::new(Vec::new()),
            failure_tx,
            failure_rx: Mutex::new(Some(failure_rx)),
        })
    }

    /// Acquire hardware, perform the handshake, and go live.
    ///
    /// Returns once the session is `Active` (or has failed). Capability
    /// denial and handshake problems come back as the error, with the
    /// session already sealed in the matching `Error` state. A `stop()`
    /// racing this call cancels it cleanly; that is not an error.
    pub async fn start(self: &Arc<Self>) -> Result<(), LiveError> {
        if self.started.swap(true, Ordering::SeqCst) || self.closed.load(Ordering::SeqCst) {
            return Err(LiveError::AlreadyStarted);
        }

        info!(session_id = %self.config.session_id, "starting live session");
        self.transition(SessionState::Connecting);

        // Hardware first: a denial must surface before any transport work.
        // The backend never leaves the holder, so a concurrent teardown
        // waits on the lock and then releases whatever we opened.
        let streams = {
            let mut guard = self.capture.lock().await;
            let Some(backend) = guard.as_mut() else {
                // stop() already consumed this instance
                return Ok(());
            };
            match backend.open(&self.config.capture_config()).await {
                Ok(streams) => {
                    info!(backend = backend.name(), "capture opened");
                    streams
                }
                Err(err) => {
                    drop(guard);
                    let error = LiveError::from(err);
                    self.fail(error.clone()).await;
                    return Err(error);
                }
            }
        };

        let mut shutdown = self.shutdown.subscribe();
        if self.closed.load(Ordering::SeqCst) || *shutdown.borrow() {
            // Cancelled while the hardware was opening; the teardown that
            // set the flag releases the backend
            return Ok(());
        }

        let transport = match self.transport.lock().await.take() {
            Some(transport) => transport,
            None => return Err(LiveError::AlreadyStarted),
        };

        // Handshake, bounded by the configured timeout and cancellable
        // by stop()
        info!(
            session_id = %self.config.session_id,
            timeout_secs = self.config.handshake_timeout.as_secs(),
            "opening live transport"
        );
        let connect = time::timeout(
            self.config.handshake_timeout,
            transport.connect(&self.config.session_id),
        );
        let channels = tokio::select! {
            // When cancellation and a handshake outcome are ready at the
            // same time, cancellation wins
            biased;
            _ = shutdown.changed() => {
                // stop() owns the teardown in this case
                return Ok(());
            }
            result = connect => match result {
                Ok(Ok(channels)) => channels,
                Ok(Err(err)) => {
                    let error = LiveError::from(err);
                    self.fail(error.clone()).await;
                    return Err(error);
                }
                Err(_) => {
                    let error = LiveError::HandshakeTimeout(self.config.handshake_timeout);
                    self.fail(error.clone()).await;
                    return Err(error);
                }
            },
        };

        if self.closed.load(Ordering::SeqCst) || *shutdown.borrow() {
            // Handshake won the race against a concurrent stop(); give the
            // write half back before bowing out
            let mut channels = channels;
            if let Err(err) = channels.sender.close().await {
                warn!("failed to close media sender: {err}");
            }
            return Ok(());
        }

        // Producers only run against an Active session
        self.transition(SessionState::Active);

        let (outbound_tx, outbound_rx) = mpsc::channel(self.config.outbound_queue);
        let failures = FailureSignal::new(self.failure_tx.clone());

        let pipeline = AudioPipeline {
            audio_rx: streams.audio,
            outbound: outbound_tx.clone(),
            shutdown: self.shutdown.subscribe(),
            failures: failures.clone(),
            counters: Arc::clone(&self.counters),
            encode_failure_limit: self.config.encode_failure_limit,
        };
        let sampler = FrameSampler {
            frames: streams.frames,
            outbound: outbound_tx,
            shutdown: self.shutdown.subscribe(),
            failures: failures.clone(),
            counters: Arc::clone(&self.counters),
            frame_interval: self.config.frame_interval,
            jpeg_quality: self.config.jpeg_quality,
            max_frame_width: self.config.max_frame_width,
            encode_failure_limit: self.config.encode_failure_limit,
        };
        let mux = OutboundMux {
            outbound_rx,
            sender: channels.sender,
            shutdown: self.shutdown.subscribe(),
            failures: failures.clone(),
            send_retry_limit: self.config.send_retry_limit,
        };
        let relay = InboundRelay {
            stream: channels.stream,
            transcript: Arc::clone(&self.transcript),
            shutdown: self.shutdown.subscribe(),
            failures,
        };

        {
            let mut tasks = self.tasks.lock().await;
            tasks.push(("audio-pipeline", tokio::spawn(pipeline.run())));
            tasks.push(("frame-sampler", tokio::spawn(sampler.run())));
            tasks.push(("outbound-mux", tokio::spawn(mux.run())));
            tasks.push(("inbound-relay", tokio::spawn(relay.run())));
        }

        // Failure monitor: first task failure tears the session down.
        // Deliberately not in the task list; it runs the teardown that
        // joins the list.
        if let Some(mut failure_rx) = self.failure_rx.lock().await.take() {
            let session = Arc::clone(self);
            let mut monitor_shutdown = self.shutdown.subscribe();
            tokio::spawn(async move {
                if *monitor_shutdown.borrow() {
                    return;
                }
                tokio::select! {
                    maybe = failure_rx.recv() => {
                        if let Some(error) = maybe {
                            session.fail(error).await;
                        }
                    }
                    _ = monitor_shutdown.changed() => {}
                }
            });
        }

        info!(session_id = %self.config.session_id, "live session active");
        Ok(())
    }

    /// Stop the session and return final statistics.
    ///
    /// Safe to call at any point, any number of times, from any task;
    /// only the first call (or a racing failure) actually tears down.
    pub async fn stop(&self) -> SessionStats {
        info!(session_id = %self.config.session_id, "stopping live session");
        // send_replace stores the flag even with no receiver yet, so a
        // start() still opening hardware finds it when it subscribes
        self.shutdown.send_replace(true);
        self.teardown(Teardown::Clean).await;
        self.stats().await
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// True once teardown has begun. A session instance is single-use:
    /// a finished one can never go live again, so whatever slot holds it
    /// may be reclaimed.
    pub fn is_finished(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Watch lifecycle state changes.
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// The session's transcript.
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn session_id(&self) -> &str {
        &self.config.session_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Snapshot of session statistics.
    pub async fn stats(&self) -> SessionStats {
        let duration = Utc::now().signed_duration_since(self.created_at);
        SessionStats {
            session_id: self.config.session_id.clone(),
            state: self.state(),
            started_at: self.created_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            audio_chunks: self.counters.audio_chunks(),
            video_chunks: self.counters.video_chunks(),
            chunks_dropped: self.counters.chunks_dropped(),
            encode_failures: self.counters.encode_failures(),
            transcript_entries: self.transcript.len().await,
        }
    }

    /// Seal the session in an error state.
    async fn fail(&self, error: LiveError) {
        warn!(session_id = %self.config.session_id, "live session failed: {error}");
        self.teardown(Teardown::Failed(error)).await;
    }

    /// The one and only teardown path.
    ///
    /// Whoever flips `closed` first runs it: stops the tasks, releases
    /// the hardware, and seals the terminal state. Everyone else returns
    /// immediately.
    async fn teardown(&self, outcome: Teardown) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shutdown.send_replace(true);

        // Give tasks a moment to drain, then abort stragglers
        let tasks: Vec<NamedTask> = {
            let mut guard = self.tasks.lock().await;
            guard.drain(..).collect()
        };
        for (name, mut handle) in tasks {
            match time::timeout(TEARDOWN_GRACE, &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => error!(task = name, "session task panicked: {err}"),
                Err(_) => {
                    warn!(task = name, "session task did not stop in time, aborting");
                    handle.abort();
                }
            }
        }

        // Release the hardware exactly once
        if let Some(mut backend) = self.capture.lock().await.take() {
            if let Err(err) = backend.close().await {
                warn!("failed to release capture backend: {err}");
            } else {
                info!(backend = backend.name(), "capture backend released");
            }
        }

        let final_state = match outcome {
            Teardown::Clean => SessionState::Idle,
            Teardown::Failed(error) => SessionState::Error {
                kind: error.kind().unwrap_or(ErrorKind::Transport),
                message: error.to_string(),
            },
        };
        self.transition(final_state);
        info!(
            session_id = %self.config.session_id,
            state = self.state().as_label(),
            "live session closed"
        );
    }

    /// Apply a state change, enforcing the lifecycle graph.
    ///
    /// Once `closed` is set the terminal state is sealed; a live state
    /// arriving late (a `start()` that lost the race to a teardown) is
    /// refused so the session cannot get stuck non-terminal.
    fn transition(&self, next: SessionState) {
        self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            if self.closed.load(Ordering::SeqCst) && next.is_live() {
                warn!(
                    to = next.as_label(),
                    "ignoring live transition on a closed session"
                );
                return false;
            }
            if !current.can_transition(&next) {
                error!(
                    from = current.as_label(),
                    to = next.as_label(),
                    "refusing invalid session state transition"
                );
                return false;
            }
            info!(from = current.as_label(), to = next.as_label(), "session state");
            *current = next;
            true
        });
    }
}
