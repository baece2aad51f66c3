use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use serde::Deserialize;

use crate::capture::CaptureSource;
use crate::session::SessionConfig;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub live: LiveConfig,
    pub transport: TransportConfig,
    pub capture: CaptureSection,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

/// Session tunables applied to every started session
#[derive(Debug, Deserialize)]
pub struct LiveConfig {
    pub sample_rate: u32,
    pub buffer_samples: usize,
    pub frame_interval_ms: u64,
    pub jpeg_quality: u8,
    pub max_frame_width: u32,
    pub outbound_queue: usize,
    pub handshake_timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct TransportConfig {
    pub nats_url: String,
}

/// Which capture backend to use: "synthetic" or "wav"
#[derive(Debug, Deserialize)]
pub struct CaptureSection {
    pub source: String,
    pub wav_path: Option<PathBuf>,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Session config template from the [live] section.
    pub fn session_template(&self) -> SessionConfig {
        SessionConfig {
            sample_rate: self.live.sample_rate,
            buffer_samples: self.live.buffer_samples,
            frame_interval: Duration::from_millis(self.live.frame_interval_ms),
            jpeg_quality: self.live.jpeg_quality,
            max_frame_width: self.live.max_frame_width,
            outbound_queue: self.live.outbound_queue,
            handshake_timeout: Duration::from_secs(self.live.handshake_timeout_secs),
            ..SessionConfig::default()
        }
    }

    /// Capture source from the [capture] section.
    pub fn capture_source(&self) -> Result<CaptureSource> {
        match self.capture.source.as_str() {
            "synthetic" => Ok(CaptureSource::Synthetic),
            "wav" => match &self.capture.wav_path {
                Some(path) => Ok(CaptureSource::WavFile(path.clone())),
                None => bail!("capture.source = \"wav\" requires capture.wav_path"),
            },
            other => bail!("unknown capture source: {other}"),
        }
    }
}
