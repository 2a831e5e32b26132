//! Microphone capture via CPAL.
//!
//! The cpal stream is not `Send`, so it lives on a dedicated worker thread
//! that drains the callback buffer at a fixed cadence and forwards frames
//! over the backend channel.

use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame};
use anyhow::{anyhow, bail, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

pub struct MicrophoneBackend {
    config: AudioBackendConfig,
    device_name: Option<String>,
    capturing: Arc<AtomicBool>,
    worker: Option<thread::JoinHandle<()>>,
}

impl MicrophoneBackend {
    pub fn new(config: AudioBackendConfig, device_name: Option<String>) -> Self {
        Self {
            config,
            device_name,
            capturing: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }
}

#[async_trait::async_trait]
impl AudioBackend for MicrophoneBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.capturing.load(Ordering::SeqCst) {
            bail!("microphone backend is already capturing");
        }

        let (frame_tx, frame_rx) = mpsc::channel(64);
        let (ready_tx, ready_rx) = oneshot::channel();

        self.capturing.store(true, Ordering::SeqCst);
        let capturing = Arc::clone(&self.capturing);
        let config = self.config.clone();
        let device_name = self.device_name.clone();

        let worker = thread::spawn(move || {
            capture_worker(device_name, config, capturing, frame_tx, ready_tx);
        });
        self.worker = Some(worker);

        match ready_rx.await {
            Ok(Ok(())) => Ok(frame_rx),
            Ok(Err(e)) => {
                self.capturing.store(false, Ordering::SeqCst);
                self.worker = None;
                Err(e)
            }
            Err(_) => {
                self.capturing.store(false, Ordering::SeqCst);
                self.worker = None;
                Err(anyhow!("capture thread exited before reporting readiness"))
            }
        }
    }

    async fn stop(&mut self) -> Result<()> {
        self.capturing.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            tokio::task::spawn_blocking(move || worker.join())
                .await
                .context("failed to join capture thread")?
                .map_err(|_| anyhow!("capture thread panicked"))?;
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "microphone"
    }
}

fn capture_worker(
    device_name: Option<String>,
    config: AudioBackendConfig,
    capturing: Arc<AtomicBool>,
    frame_tx: mpsc::Sender<AudioFrame>,
    ready_tx: oneshot::Sender<Result<()>>,
) {
    let buffer: Arc<Mutex<Vec<i16>>> = Arc::new(Mutex::new(Vec::new()));

    let stream = match open_stream(device_name.as_deref(), &config, Arc::clone(&buffer)) {
        Ok(stream) => {
            let _ = ready_tx.send(Ok(()));
            stream
        }
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    let tick = Duration::from_millis(config.buffer_duration_ms);
    let mut emitted_samples: u64 = 0;

    while capturing.load(Ordering::SeqCst) {
        thread::sleep(tick);

        let samples = buffer
            .lock()
            .map(|mut pending| std::mem::take(&mut *pending))
            .unwrap_or_default();
        if samples.is_empty() {
            continue;
        }

        let timestamp_ms = emitted_samples * 1000 / config.target_sample_rate as u64;
        emitted_samples += (samples.len() / config.target_channels as usize) as u64;

        let frame = AudioFrame {
            samples,
            sample_rate: config.target_sample_rate,
            channels: config.target_channels,
            timestamp_ms,
        };
        if frame_tx.blocking_send(frame).is_err() {
            // Consumer gone, nothing left to capture for.
            break;
        }
    }

    drop(stream);
    info!("microphone capture stopped");
}

/// Open an input stream that fills `buffer` with mono PCM at the target rate.
///
/// Tries in order: i16 at the target config, f32 at the target config, then
/// the device's native config with software channel mixing and decimation.
fn open_stream(
    device_name: Option<&str>,
    config: &AudioBackendConfig,
    buffer: Arc<Mutex<Vec<i16>>>,
) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = match device_name {
        Some(name) => {
            let mut devices = host
                .input_devices()
                .context("failed to enumerate input devices")?;
            devices
                .find(|device| device.name().map(|n| n == name).unwrap_or(false))
                .with_context(|| format!("audio input device not found: {}", name))?
        }
        None => host
            .default_input_device()
            .context("no default audio input device")?,
    };
    info!(
        device = %device.name().unwrap_or_else(|_| "unknown".to_string()),
        "opening microphone"
    );

    let target_config = cpal::StreamConfig {
        channels: config.target_channels,
        sample_rate: cpal::SampleRate(config.target_sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };
    let err_callback = |err| warn!("audio stream error: {}", err);

    // Preferred: i16 at the target format, no conversion needed.
    let sink = Arc::clone(&buffer);
    if let Ok(stream) = device.build_input_stream(
        &target_config,
        move |data: &[i16], _: &cpal::InputCallbackInfo| {
            if let Ok(mut pending) = sink.lock() {
                pending.extend_from_slice(data);
            }
        },
        err_callback,
        None,
    ) {
        stream.play().context("failed to start audio stream")?;
        return Ok(stream);
    }

    // Some devices only expose float formats.
    let sink = Arc::clone(&buffer);
    if let Ok(stream) = device.build_input_stream(
        &target_config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            if let Ok(mut pending) = sink.lock() {
                pending.extend(data.iter().map(|&s| f32_to_i16(s)));
            }
        },
        err_callback,
        None,
    ) {
        stream.play().context("failed to start audio stream")?;
        return Ok(stream);
    }

    // Fall back to the device's native config and convert in software.
    let native = device
        .default_input_config()
        .context("failed to query default input config")?;
    let native_rate = native.sample_rate().0;
    let native_channels = native.channels();
    let target_rate = config.target_sample_rate;
    let stream_config: cpal::StreamConfig = native.clone().into();
    info!(
        rate = native_rate,
        channels = native_channels,
        "using native audio format with software conversion"
    );

    let stream = match native.sample_format() {
        cpal::SampleFormat::I16 => {
            let sink = Arc::clone(&buffer);
            device
                .build_input_stream(
                    &stream_config,
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        let converted =
                            convert_to_target(data, native_channels, native_rate, target_rate);
                        if let Ok(mut pending) = sink.lock() {
                            pending.extend_from_slice(&converted);
                        }
                    },
                    err_callback,
                    None,
                )
                .context("failed to build native i16 input stream")?
        }
        cpal::SampleFormat::F32 => {
            let sink = Arc::clone(&buffer);
            device
                .build_input_stream(
                    &stream_config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        let as_i16: Vec<i16> = data.iter().map(|&s| f32_to_i16(s)).collect();
                        let converted =
                            convert_to_target(&as_i16, native_channels, native_rate, target_rate);
                        if let Ok(mut pending) = sink.lock() {
                            pending.extend_from_slice(&converted);
                        }
                    },
                    err_callback,
                    None,
                )
                .context("failed to build native f32 input stream")?
        }
        format => bail!("unsupported native sample format: {:?}", format),
    };

    stream.play().context("failed to start audio stream")?;
    Ok(stream)
}

fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

/// Mix interleaved multi-channel audio to mono and decimate to the target rate.
fn convert_to_target(
    samples: &[i16],
    channels: u16,
    source_rate: u32,
    target_rate: u32,
) -> Vec<i16> {
    let mono: Vec<i16> = if channels <= 1 {
        samples.to_vec()
    } else {
        samples
            .chunks_exact(channels as usize)
            .map(|frame| {
                let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                (sum / channels as i32) as i16
            })
            .collect()
    };

    if source_rate == target_rate {
        return mono;
    }
    let ratio = source_rate / target_rate;
    if ratio <= 1 {
        return mono; // Can't upsample
    }
    mono.iter().step_by(ratio as usize).copied().collect()
}
