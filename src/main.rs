use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use live_translate::audio::{AudioBackendConfig, MicrophoneBackend};
use live_translate::capture::{CaptureConfig, CaptureSession, UploadStatus};
use live_translate::feed::{ChunkFeed, HttpFeedSource};
use live_translate::{
    create_router, AppState, ChunkPipeline, Config, MemoryStore, OpenAiModel,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "live-translate", about = "Near-real-time speech translation for live events")]
struct Cli {
    /// Config file (without extension), loaded via the config crate
    #[arg(long, default_value = "config/live-translate")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the processing server
    Serve,
    /// Capture the microphone and upload segments for an event
    Capture {
        #[arg(long)]
        event_id: String,
        #[arg(long, default_value = "http://127.0.0.1:8080")]
        server: String,
        /// Input device name (default input device if omitted)
        #[arg(long)]
        device: Option<String>,
    },
    /// Follow an event's caption feed and print it
    Watch {
        #[arg(long)]
        event_id: String,
        #[arg(long, default_value = "http://127.0.0.1:8080")]
        server: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    match cli.command {
        Command::Serve => serve(config).await,
        Command::Capture {
            event_id,
            server,
            device,
        } => capture(config, event_id, server, device).await,
        Command::Watch { event_id, server } => watch(config, event_id, server).await,
    }
}

async fn serve(config: Config) -> Result<()> {
    let api_key =
        std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY environment variable is not set")?;

    let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
    let model = Arc::new(OpenAiModel::new(
        config.model.clone(),
        &config.translation,
        api_key,
    ));
    let pipeline = Arc::new(ChunkPipeline::new(
        store.clone(),
        model,
        &config.translation,
    ));
    let state = AppState::new(store, pipeline);

    let app = create_router(state);
    let addr = format!("{}:{}", config.service.http.bind, config.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!("{} listening on {}", config.service.name, addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn capture(
    config: Config,
    event_id: String,
    server: String,
    device: Option<String>,
) -> Result<()> {
    let backend_config = AudioBackendConfig {
        target_sample_rate: config.capture.sample_rate,
        target_channels: config.capture.channels,
        ..AudioBackendConfig::default()
    };
    let backend = Box::new(MicrophoneBackend::new(backend_config, device));

    let (status_tx, mut status_rx) = mpsc::unbounded_channel();
    let status_task = tokio::spawn(async move {
        while let Some(status) = status_rx.recv().await {
            match status {
                UploadStatus::Delivered { index, stored: true } => {
                    info!("chunk {} delivered", index)
                }
                UploadStatus::Delivered { index, stored: false } => {
                    info!("chunk {} delivered (no speech)", index)
                }
                UploadStatus::Skipped { index } => info!("chunk {} skipped (near-silence)", index),
                UploadStatus::Failed { index, error } => {
                    warn!("chunk {} failed: {}", index, error)
                }
                UploadStatus::Cancelled { index } => info!("chunk {} cancelled", index),
            }
        }
    });

    let mut session = CaptureSession::new(
        CaptureConfig {
            server_url: server,
            event_id,
            segment_duration: Duration::from_millis(config.capture.segment_duration_ms),
            min_segment_bytes: config.capture.min_segment_bytes,
            sample_rate: config.capture.sample_rate,
            channels: config.capture.channels,
        },
        status_tx,
    );

    session.start(backend).await?;
    info!("recording; press ctrl-c to stop");
    tokio::signal::ctrl_c().await?;
    session.stop().await?;
    status_task.abort();
    Ok(())
}

async fn watch(config: Config, event_id: String, server: String) -> Result<()> {
    let source = Arc::new(HttpFeedSource::new(&server));
    let feed = ChunkFeed::new(
        source,
        event_id,
        Duration::from_millis(config.capture.poll_interval_ms),
    );

    let (chunk_tx, mut chunk_rx) = mpsc::channel(32);
    let follow_task = tokio::spawn(feed.follow(chunk_tx));

    while let Some(chunk) = chunk_rx.recv().await {
        println!("[{:>4}] {}", chunk.chunk_index, chunk.target_text);
        println!("       {}", chunk.source_text);
    }

    follow_task.await??;
    Ok(())
}
