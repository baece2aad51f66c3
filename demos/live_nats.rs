//! Live session over a real NATS server.
//!
//! Embeds a small echo endpoint so no AI backend is needed: it acks the
//! handshake, counts incoming media, and periodically narrates the
//! counts back as reply text.
//!
//! Run with: cargo run --example live_nats -- --nats-url nats://localhost:4222

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use aura_live::{
    CaptureBackendFactory, CaptureSource, ContentDelta, LiveSession, MediaKind, MediaPayload,
    NatsTransport, ServerEnvelope, SessionAck, SessionConfig, SessionOpen,
};
use clap::Parser;
use futures::StreamExt;
use tokio::time::sleep;
use tracing::info;

#[derive(Parser, Debug)]
#[command(about = "Run a live session against a NATS server")]
struct Args {
    /// NATS server URL
    #[arg(long, default_value = "nats://localhost:4222")]
    nats_url: String,

    /// How long to stream before stopping
    #[arg(long, default_value_t = 5)]
    duration_secs: u64,

    /// Replay this WAV file instead of the synthetic tone
    #[arg(long)]
    wav: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let endpoint = tokio::spawn(run_echo_endpoint(args.nats_url.clone()));
    // Let the endpoint get its subscriptions in place
    sleep(Duration::from_millis(200)).await;

    let source = match args.wav {
        Some(path) => CaptureSource::WavFile(path),
        None => CaptureSource::Synthetic,
    };
    let session = LiveSession::new(
        SessionConfig::new(format!("demo-{}", uuid::Uuid::new_v4())),
        Box::new(NatsTransport::new(args.nats_url.clone())),
        CaptureBackendFactory::create(source)?,
    );

    session.start().await?;
    info!("session active, streaming for {} seconds", args.duration_secs);
    sleep(Duration::from_secs(args.duration_secs)).await;

    let stats = session.stop().await;
    endpoint.await??;

    println!("\n--- session summary ---");
    println!("final state:  {}", stats.state.as_label());
    println!("audio chunks: {}", stats.audio_chunks);
    println!("video chunks: {}", stats.video_chunks);
    println!("dropped:      {}", stats.chunks_dropped);
    println!("transcript:   {}", session.transcript().joined_text().await);

    Ok(())
}

/// Minimal stand-in for the real endpoint: serves exactly one session.
async fn run_echo_endpoint(url: String) -> Result<()> {
    let client = async_nats::connect(url.as_str()).await?;
    let mut open_sub = client.subscribe("aura.live.*.open").await?;
    info!("echo endpoint waiting for a session");

    let Some(request) = open_sub.next().await else {
        return Ok(());
    };
    let open: SessionOpen = serde_json::from_slice(&request.payload)?;
    let ack = SessionAck {
        session_id: open.session_id.clone(),
        ready: true,
    };
    if let Some(reply) = request.reply {
        client.publish(reply, serde_json::to_vec(&ack)?.into()).await?;
    }
    info!(session_id = %open.session_id, "session acked");

    let mut media_sub = client
        .subscribe(format!("aura.live.{}.media", open.session_id))
        .await?;
    let mut closed_sub = client
        .subscribe(format!("aura.live.{}.closed", open.session_id))
        .await?;
    let events_subject = format!("aura.live.{}.events", open.session_id);

    let mut audio = 0u64;
    let mut video = 0u64;
    loop {
        tokio::select! {
            maybe = media_sub.next() => {
                let Some(message) = maybe else { break };
                let payload: MediaPayload = match serde_json::from_slice(&message.payload) {
                    Ok(payload) => payload,
                    Err(_) => continue,
                };
                match payload.kind {
                    MediaKind::Audio => audio += 1,
                    MediaKind::Video => video += 1,
                }

                if (audio + video) % 25 == 0 {
                    let envelope = ServerEnvelope {
                        deltas: vec![ContentDelta {
                            text: Some(format!("Seen {audio} audio and {video} video chunks. ")),
                            audio: None,
                        }],
                        turn_complete: false,
                    };
                    client
                        .publish(events_subject.clone(), serde_json::to_vec(&envelope)?.into())
                        .await?;
                }
            }
            _ = closed_sub.next() => {
                info!("client closed the session");
                break;
            }
        }
    }

    info!(audio, video, "echo endpoint done");
    Ok(())
}
