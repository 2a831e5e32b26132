use super::sender::{ChunkSender, UploadStatus};
use super::transcoder::{SegmentTranscoder, TranscoderConfig};
use crate::audio::AudioBackend;
use anyhow::{bail, Context, Result};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub server_url: String,
    pub event_id: String,
    pub segment_duration: Duration,
    pub min_segment_bytes: usize,
    pub sample_rate: u32,
    pub channels: u16,
}

/// A capture session: the single owner of the recording device and the
/// in-flight upload set.
///
/// Modeled as a two-state machine, Idle and Recording, with one authorized
/// transition in each direction. Starting while recording is rejected; stop
/// releases the device, drains the transcoder, cancels the uploads that were
/// already in flight, and delivers the final flushed segment, so a subsequent
/// start begins from a clean slate.
pub struct CaptureSession {
    config: CaptureConfig,
    client: reqwest::Client,
    status_tx: mpsc::UnboundedSender<UploadStatus>,
    state: State,
}

enum State {
    Idle,
    Recording(Active),
}

struct Active {
    backend: Box<dyn AudioBackend>,
    transcoder_task: JoinHandle<Result<()>>,
    dispatch_task: JoinHandle<()>,
    sender: ChunkSender,
}

impl CaptureSession {
    pub fn new(
        config: CaptureConfig,
        status_tx: mpsc::UnboundedSender<UploadStatus>,
    ) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            status_tx,
            state: State::Idle,
        }
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.state, State::Recording(_))
    }

    /// Begin recording on the given backend.
    ///
    /// Device-acquisition failure surfaces here and leaves the session idle;
    /// it is not retried automatically.
    pub async fn start(&mut self, mut backend: Box<dyn AudioBackend>) -> Result<()> {
        if self.is_recording() {
            bail!("capture session is already recording; stop it before starting again");
        }

        let frames = backend
            .start()
            .await
            .context("failed to start audio capture")?;

        let transcoder = SegmentTranscoder::new(TranscoderConfig {
            segment_duration: self.config.segment_duration,
            sample_rate: self.config.sample_rate,
            channels: self.config.channels,
        })?;

        let (segment_tx, mut segment_rx) = mpsc::channel(8);
        let transcoder_task = tokio::spawn(transcoder.run(frames, segment_tx));

        let sender = ChunkSender::new(
            self.client.clone(),
            &self.config.server_url,
            &self.config.event_id,
            self.config.min_segment_bytes,
            self.status_tx.clone(),
        );
        let dispatch_sender = sender.clone();
        let dispatch_task = tokio::spawn(async move {
            while let Some(segment) = segment_rx.recv().await {
                dispatch_sender.dispatch(segment);
            }
        });

        info!(
            event_id = %self.config.event_id,
            segment_ms = self.config.segment_duration.as_millis() as u64,
            "capture session started"
        );

        self.state = State::Recording(Active {
            backend,
            transcoder_task,
            dispatch_task,
            sender,
        });
        Ok(())
    }

    /// Stop recording: release the device, flush the final segment, and
    /// cancel whatever uploads were already in flight.
    pub async fn stop(&mut self) -> Result<()> {
        let mut active = match std::mem::replace(&mut self.state, State::Idle) {
            State::Recording(active) => active,
            State::Idle => return Ok(()),
        };

        // Only uploads in flight at this moment are cancelled; the final
        // segment flushed below is dispatched after this snapshot and must
        // reach the server.
        let stale = active.sender.in_flight_indices();

        // Closing the device closes the frame channel, which lets the
        // transcoder flush its final partial segment and exit.
        active.backend.stop().await?;
        active
            .transcoder_task
            .await
            .context("transcoder task panicked")??;
        active
            .dispatch_task
            .await
            .context("dispatch task panicked")?;

        active.sender.cancel(&stale);
        active.sender.drain().await;

        info!(event_id = %self.config.event_id, "capture session stopped");
        Ok(())
    }
}
