use crate::audio::AudioFrame;
use anyhow::{bail, Context, Result};
use std::io::Cursor;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Shortest supported segment cadence.
pub const MIN_SEGMENT_DURATION: Duration = Duration::from_secs(3);
/// Longest supported segment cadence.
pub const MAX_SEGMENT_DURATION: Duration = Duration::from_secs(15);
/// Default segment cadence.
pub const DEFAULT_SEGMENT_DURATION: Duration = Duration::from_secs(5);

/// One bounded-duration audio segment, encoded as a complete WAV file so it
/// can be transcribed in isolation.
#[derive(Debug, Clone)]
pub struct Segment {
    /// Assigned monotonically at production time, before upload.
    pub index: u32,
    pub wav: Vec<u8>,
    /// Start offset in milliseconds from capture start.
    pub start_ms: i64,
    /// Exclusive end offset in milliseconds from capture start; consecutive
    /// segments tile, so this equals the next segment's start.
    pub end_ms: i64,
}

#[derive(Debug, Clone)]
pub struct TranscoderConfig {
    pub segment_duration: Duration,
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            segment_duration: DEFAULT_SEGMENT_DURATION,
            sample_rate: 16000,
            channels: 1,
        }
    }
}

/// Splits a continuous frame stream into bounded-duration WAV segments.
///
/// The output is a lazy, unbounded, non-restartable sequence: segments are
/// emitted as frame timestamps cross the cadence boundary, and a final
/// partial segment is flushed when the frame channel closes.
pub struct SegmentTranscoder {
    config: TranscoderConfig,
}

impl SegmentTranscoder {
    pub fn new(config: TranscoderConfig) -> Result<Self> {
        if config.segment_duration < MIN_SEGMENT_DURATION
            || config.segment_duration > MAX_SEGMENT_DURATION
        {
            bail!(
                "segment duration {:?} outside supported range {:?}-{:?}",
                config.segment_duration,
                MIN_SEGMENT_DURATION,
                MAX_SEGMENT_DURATION
            );
        }
        Ok(Self { config })
    }

    /// Consume frames until the channel closes, emitting finished segments.
    pub async fn run(
        self,
        mut frames: mpsc::Receiver<AudioFrame>,
        segments: mpsc::Sender<Segment>,
    ) -> Result<()> {
        let duration_ms = self.config.segment_duration.as_millis() as u64;
        let mut current: Option<PendingSegment> = None;
        let mut next_index: u32 = 0;
        let mut produced: u32 = 0;

        while let Some(frame) = frames.recv().await {
            let rotate = match &current {
                None => true,
                Some(pending) => frame.timestamp_ms.saturating_sub(pending.start_ms) >= duration_ms,
            };

            if rotate {
                if let Some(done) = current.take() {
                    let segment = done.finish()?;
                    debug!(
                        index = segment.index,
                        start_ms = segment.start_ms,
                        end_ms = segment.end_ms,
                        bytes = segment.wav.len(),
                        "segment finalized"
                    );
                    produced += 1;
                    if segments.send(segment).await.is_err() {
                        // Consumer gone; stop producing.
                        return Ok(());
                    }
                }
                current = Some(PendingSegment::new(next_index, &frame));
                next_index += 1;
            }

            if let Some(pending) = current.as_mut() {
                pending.push(&frame);
            }
        }

        // Flush the final partial segment.
        if let Some(done) = current.take() {
            let segment = done.finish()?;
            produced += 1;
            let _ = segments.send(segment).await;
        }

        info!(segments = produced, "segment stream ended");
        Ok(())
    }
}

/// Accumulates samples for the segment currently being recorded.
struct PendingSegment {
    index: u32,
    start_ms: u64,
    end_ms: u64,
    sample_rate: u32,
    channels: u16,
    samples: Vec<i16>,
}

impl PendingSegment {
    fn new(index: u32, first_frame: &AudioFrame) -> Self {
        Self {
            index,
            start_ms: first_frame.timestamp_ms,
            end_ms: first_frame.timestamp_ms,
            sample_rate: first_frame.sample_rate,
            channels: first_frame.channels,
            samples: Vec::new(),
        }
    }

    fn push(&mut self, frame: &AudioFrame) {
        self.samples.extend_from_slice(&frame.samples);
        // End of the frame, not its start, so segment offsets tile.
        let denom = (self.sample_rate as u64 * self.channels as u64).max(1);
        self.end_ms = frame.timestamp_ms + frame.samples.len() as u64 * 1000 / denom;
    }

    fn finish(self) -> Result<Segment> {
        let spec = hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut wav = Vec::new();
        {
            let mut writer = hound::WavWriter::new(Cursor::new(&mut wav), spec)
                .context("failed to create WAV writer")?;
            for &sample in &self.samples {
                writer
                    .write_sample(sample)
                    .context("failed to write sample to WAV")?;
            }
            writer.finalize().context("failed to finalize WAV")?;
        }

        Ok(Segment {
            index: self.index,
            wav,
            start_ms: self.start_ms as i64,
            end_ms: self.end_ms as i64,
        })
    }
}
