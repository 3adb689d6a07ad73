//! Command line client for a running storyteller server.
//!
//! Sends one request, prints every text event and optionally saves the
//! audio frames to a file.
//!
//! ```bash
//! cargo run -p storyteller --bin tell -- "a lighthouse keeper" --audio-out story.pcm
//! ```

use std::path::PathBuf;

use clap::Parser;
use futures::{SinkExt, StreamExt};
use storyteller::{RequestMessage, StoryEvent};
use tokio::io::AsyncWriteExt;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{info, warn};

#[derive(Parser)]
/// Command line arguments for the client.
struct Cli {
    /// WebSocket endpoint
    #[arg(long, default_value = "ws://127.0.0.1:8080/ws")]
    ws: String,
    #[arg(long)]
    voice: Option<String>,
    #[arg(long)]
    tts_model: Option<String>,
    /// Summary of an earlier story to continue
    #[arg(long)]
    context: Option<String>,
    /// Append raw audio frames to this file
    #[arg(long)]
    audio_out: Option<PathBuf>,
    topic: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    let (mut ws, _) = connect_async(&cli.ws).await?;
    info!("connected to {ws}", ws = cli.ws);

    let request = RequestMessage {
        topic: cli.topic,
        voice: cli.voice,
        tts_model: cli.tts_model,
        context: cli.context,
    };
    ws.send(Message::Text(serde_json::to_string(&request)?.into()))
        .await?;

    let mut audio = match &cli.audio_out {
        Some(path) => Some(tokio::fs::File::create(path).await?),
        None => None,
    };
    let mut audio_bytes = 0usize;
    while let Some(msg) = ws.next().await {
        match msg? {
            Message::Text(text) => match serde_json::from_str::<StoryEvent>(text.as_str()) {
                Ok(StoryEvent::Title { content }) => println!("# {content}\n"),
                Ok(StoryEvent::Sentence { content }) => println!("{content}"),
                Ok(StoryEvent::Image { content }) => {
                    println!("[image: {} base64 chars]", content.len())
                }
                Ok(StoryEvent::Context { content }) => println!("\n[context] {content}"),
                Ok(StoryEvent::Suggestions { data }) => {
                    for suggestion in data {
                        println!("  > {suggestion}");
                    }
                    break;
                }
                Err(e) => warn!(error = %e, "unrecognised event"),
            },
            Message::Binary(bytes) => {
                audio_bytes += bytes.len();
                if let Some(file) = audio.as_mut() {
                    file.write_all(&bytes).await?;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
    if let Some(mut file) = audio {
        file.flush().await?;
    }
    info!(audio_bytes, "story complete");
    if let Err(e) = ws.close(None).await {
        warn!(error = %e, "closing websocket failed");
    }
    Ok(())
}
