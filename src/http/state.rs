use std::sync::Arc;

use anyhow::Result;
use tokio::sync::RwLock;

use crate::capture::{CaptureBackend, CaptureBackendFactory, CaptureSource};
use crate::session::{LiveSession, SessionConfig};
use crate::transport::{LiveTransport, NatsTransport};

/// Builds the per-session capture and transport boundaries.
///
/// Each started session gets fresh boundary objects; a session instance
/// is single-use, so its boundaries are too.
pub trait SessionBoundaries: Send + Sync {
    fn transport(&self) -> Box<dyn LiveTransport>;
    fn capture(&self) -> Result<Box<dyn CaptureBackend>>;
}

/// Default boundaries: NATS transport plus the configured capture source.
pub struct ConfigBoundaries {
    pub nats_url: String,
    pub capture_source: CaptureSource,
}

impl SessionBoundaries for ConfigBoundaries {
    fn transport(&self) -> Box<dyn LiveTransport> {
        Box::new(NatsTransport::new(self.nats_url.clone()))
    }

    fn capture(&self) -> Result<Box<dyn CaptureBackend>> {
        CaptureBackendFactory::create(self.capture_source.clone())
    }
}

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The most recent live session; terminal sessions stay queryable
    /// until the next start replaces them
    pub session: Arc<RwLock<Option<Arc<LiveSession>>>>,

    /// Template config applied to each new session
    pub defaults: SessionConfig,

    /// Boundary factories for new sessions
    pub boundaries: Arc<dyn SessionBoundaries>,
}

impl AppState {
    pub fn new(defaults: SessionConfig, boundaries: Arc<dyn SessionBoundaries>) -> Self {
        Self {
            session: Arc::new(RwLock::new(None)),
            defaults,
            boundaries,
        }
    }
}
