//! In-process loopback demo: synthetic capture on one side, a scripted
//! endpoint on the other, no hardware or servers required.
//!
//! Run with: cargo run --example live_loopback

use std::time::Duration;

use anyhow::Result;
use aura_live::{
    ContentDelta, LiveSession, MediaKind, MemoryTransport, ServerEnvelope, SessionConfig,
    SyntheticBackend,
};
use tokio::time::sleep;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let (transport, mut remote) = MemoryTransport::pair();

    // Scripted endpoint: counts what it receives and narrates back
    let endpoint = tokio::spawn(async move {
        let script = [
            "I hear ",
            "a steady tone, ",
            "and I can see ",
            "your test pattern.",
        ];
        let mut next_line = 0;
        let mut audio = 0usize;
        let mut video = 0usize;
        let mut seen = 0usize;

        while let Some(payload) = remote.next_payload().await {
            seen += 1;
            match payload.kind {
                MediaKind::Audio => audio += 1,
                MediaKind::Video => video += 1,
            }

            if seen % 8 == 0 && next_line < script.len() {
                let envelope = ServerEnvelope {
                    deltas: vec![ContentDelta {
                        text: Some(script[next_line].to_string()),
                        audio: None,
                    }],
                    turn_complete: next_line + 1 == script.len(),
                };
                if !remote.push_envelope(&envelope).await {
                    break;
                }
                next_line += 1;
            }
        }
        (audio, video)
    });

    let session = LiveSession::new(
        SessionConfig::new("loopback-demo"),
        Box::new(transport),
        Box::new(SyntheticBackend::new()),
    );

    session.start().await?;
    info!("session active, streaming for 3 seconds");
    sleep(Duration::from_secs(3)).await;

    let stats = session.stop().await;
    let (audio, video) = endpoint.await?;

    println!("\n--- session summary ---");
    println!("final state:  {}", stats.state.as_label());
    println!("audio chunks: {} queued, {} delivered", stats.audio_chunks, audio);
    println!("video chunks: {} queued, {} delivered", stats.video_chunks, video);
    println!("dropped:      {}", stats.chunks_dropped);
    println!("transcript:   {}", session.transcript().joined_text().await);

    Ok(())
}
