use super::transcoder::Segment;
use crate::event::Chunk;
use crate::http::ApiEnvelope;
use anyhow::{bail, Context, Result};
use reqwest::multipart::{Form, Part};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Outcome of one segment upload, reported over the status channel.
///
/// Cancellation is deliberately distinct from failure: aborting in-flight
/// uploads on stop is expected behavior, not an error.
#[derive(Debug, Clone)]
pub enum UploadStatus {
    /// Suppressed client-side: below the minimum byte threshold.
    Skipped { index: u32 },
    /// Accepted by the server. `stored` is false when the server judged the
    /// segment degenerate and persisted nothing.
    Delivered { index: u32, stored: bool },
    /// Upload or processing failed. The segment is lost; it is not retried.
    Failed { index: u32, error: String },
    /// Aborted because recording stopped.
    Cancelled { index: u32 },
}

struct SenderInner {
    client: reqwest::Client,
    endpoint: String,
    event_id: String,
    min_segment_bytes: usize,
    status_tx: mpsc::UnboundedSender<UploadStatus>,
    in_flight: Mutex<HashMap<u32, JoinHandle<()>>>,
}

/// Uploads segments to the processing endpoint, one request per segment.
///
/// Uploads are fire-and-forget relative to segment production: dispatching
/// returns immediately and multiple uploads may be in flight concurrently.
#[derive(Clone)]
pub struct ChunkSender {
    inner: Arc<SenderInner>,
}

impl ChunkSender {
    pub fn new(
        client: reqwest::Client,
        server_url: &str,
        event_id: &str,
        min_segment_bytes: usize,
        status_tx: mpsc::UnboundedSender<UploadStatus>,
    ) -> Self {
        Self {
            inner: Arc::new(SenderInner {
                client,
                endpoint: format!("{}/transcribe", server_url.trim_end_matches('/')),
                event_id: event_id.to_string(),
                min_segment_bytes,
                status_tx,
                in_flight: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Spawn one upload for this segment. Near-silent segments below the
    /// byte threshold are suppressed here as a best-effort optimization; the
    /// server re-validates content independently.
    pub fn dispatch(&self, segment: Segment) {
        let index = segment.index;

        if segment.wav.len() < self.inner.min_segment_bytes {
            debug!(index, bytes = segment.wav.len(), "segment below size threshold, skipping");
            let _ = self.inner.status_tx.send(UploadStatus::Skipped { index });
            return;
        }

        let inner = Arc::clone(&self.inner);
        // Held across the spawn: the task's self-removal blocks on this
        // lock, so the insert always lands before the entry is removed.
        let mut in_flight = self
            .inner
            .in_flight
            .lock()
            .expect("in-flight upload map lock poisoned");
        let handle = tokio::spawn(async move {
            let status = match upload(&inner, segment).await {
                Ok(stored) => UploadStatus::Delivered { index, stored },
                Err(e) => UploadStatus::Failed {
                    index,
                    error: format!("{:#}", e),
                },
            };
            if let Ok(mut in_flight) = inner.in_flight.lock() {
                in_flight.remove(&index);
            }
            let _ = inner.status_tx.send(status);
        });
        in_flight.insert(index, handle);
    }

    /// Indices of uploads currently in flight.
    pub fn in_flight_indices(&self) -> Vec<u32> {
        self.inner
            .in_flight
            .lock()
            .map(|in_flight| in_flight.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Abort the given uploads if they are still in flight. Each aborted
    /// upload is reported as `Cancelled`, never as a failure, and is not
    /// retried.
    pub fn cancel(&self, indices: &[u32]) {
        let handles: Vec<(u32, JoinHandle<()>)> = {
            let mut in_flight = self
                .inner
                .in_flight
                .lock()
                .expect("in-flight upload map lock poisoned");
            indices
                .iter()
                .filter_map(|index| in_flight.remove(index).map(|handle| (*index, handle)))
                .collect()
        };

        for (index, handle) in handles {
            if handle.is_finished() {
                continue;
            }
            handle.abort();
            let _ = self.inner.status_tx.send(UploadStatus::Cancelled { index });
        }
    }

    /// Abort every in-flight upload.
    pub fn cancel_all(&self) {
        self.cancel(&self.in_flight_indices());
    }

    /// Wait for the remaining in-flight uploads to run to completion and
    /// report their own status.
    pub async fn drain(&self) {
        let handles: Vec<JoinHandle<()>> = {
            let mut in_flight = self
                .inner
                .in_flight
                .lock()
                .expect("in-flight upload map lock poisoned");
            in_flight.drain().map(|(_, handle)| handle).collect()
        };
        for handle in handles {
            let _ = handle.await;
        }
    }

    pub fn in_flight_count(&self) -> usize {
        self.inner
            .in_flight
            .lock()
            .map(|in_flight| in_flight.len())
            .unwrap_or(0)
    }
}

async fn upload(inner: &SenderInner, segment: Segment) -> Result<bool> {
    let part = Part::bytes(segment.wav)
        .file_name(format!("chunk_{}.wav", segment.index))
        .mime_str("audio/wav")
        .context("invalid segment mime type")?;
    let form = Form::new()
        .part("audio", part)
        .text("eventId", inner.event_id.clone())
        .text("chunkIndex", segment.index.to_string())
        .text("startTime", segment.start_ms.to_string())
        .text("endTime", segment.end_ms.to_string());

    let response = inner
        .client
        .post(&inner.endpoint)
        .multipart(form)
        .send()
        .await
        .context("failed to send segment")?;

    let status = response.status();
    if !status.is_success() {
        let detail = response.text().await.unwrap_or_default();
        bail!("server rejected segment ({}): {}", status, detail);
    }

    let body: ApiEnvelope<Chunk> = response
        .json()
        .await
        .context("invalid processing response")?;
    if !body.success {
        bail!(
            "{}",
            body.error
                .unwrap_or_else(|| "segment processing failed".to_string())
        );
    }

    Ok(body.data.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(index: u32, bytes: usize) -> Segment {
        Segment {
            index,
            wav: vec![0u8; bytes],
            start_ms: 0,
            end_ms: 5000,
        }
    }

    #[tokio::test]
    async fn tiny_segments_are_skipped_without_upload() {
        let (status_tx, mut status_rx) = mpsc::unbounded_channel();
        let sender = ChunkSender::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9",
            "event-test",
            1000,
            status_tx,
        );

        sender.dispatch(segment(0, 100));

        match status_rx.recv().await {
            Some(UploadStatus::Skipped { index }) => assert_eq!(index, 0),
            other => panic!("expected Skipped, got {:?}", other),
        }
        assert_eq!(sender.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn failed_upload_reports_failure_not_panic() {
        let (status_tx, mut status_rx) = mpsc::unbounded_channel();
        // Port 9 (discard) is not listening; the upload must fail cleanly.
        let sender = ChunkSender::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9",
            "event-test",
            10,
            status_tx,
        );

        sender.dispatch(segment(3, 2000));

        match status_rx.recv().await {
            Some(UploadStatus::Failed { index, .. }) => assert_eq!(index, 3),
            other => panic!("expected Failed, got {:?}", other),
        }
        // The task removes its map entry before reporting, so a completed
        // upload never lingers in the in-flight set.
        assert_eq!(sender.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn drain_waits_for_in_flight_uploads_to_report() {
        let (status_tx, mut status_rx) = mpsc::unbounded_channel();
        let sender = ChunkSender::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9",
            "event-test",
            10,
            status_tx,
        );

        sender.dispatch(segment(0, 2000));
        sender.dispatch(segment(1, 2000));
        sender.drain().await;

        let mut failed = Vec::new();
        while let Ok(status) = status_rx.try_recv() {
            match status {
                UploadStatus::Failed { index, .. } => failed.push(index),
                other => panic!("expected Failed, got {:?}", other),
            }
        }
        failed.sort_unstable();
        assert_eq!(failed, vec![0, 1]);
        assert_eq!(sender.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn cancel_all_reports_cancelled_for_in_flight_uploads() {
        let (status_tx, mut status_rx) = mpsc::unbounded_channel();
        // Reserved TEST-NET address: connecting hangs long enough to cancel.
        let sender = ChunkSender::new(
            reqwest::Client::new(),
            "http://192.0.2.1:80",
            "event-test",
            10,
            status_tx,
        );

        sender.dispatch(segment(7, 2000));
        assert_eq!(sender.in_flight_count(), 1);
        sender.cancel_all();

        match status_rx.recv().await {
            Some(UploadStatus::Cancelled { index }) => assert_eq!(index, 7),
            other => panic!("expected Cancelled, got {:?}", other),
        }
        assert_eq!(sender.in_flight_count(), 0);
    }
}
