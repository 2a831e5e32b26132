use crate::event::{Chunk, Event, EventStatus};
use crate::http::ApiEnvelope;
use anyhow::{bail, Context, Result};

/// Where a feed reads from. The HTTP implementation serves real viewers;
/// tests substitute scripted sources.
#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    async fn event_status(&self, event_id: &str) -> Result<EventStatus>;

    /// Chunks with index strictly greater than `after`, ascending.
    async fn chunks_after(&self, event_id: &str, after: i64) -> Result<Vec<Chunk>>;
}

/// Polls the caption server over HTTP.
pub struct HttpFeedSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFeedSource {
    pub fn new(server_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: server_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait::async_trait]
impl FeedSource for HttpFeedSource {
    async fn event_status(&self, event_id: &str) -> Result<EventStatus> {
        let response = self
            .client
            .get(format!("{}/events/{}", self.base_url, event_id))
            .send()
            .await
            .context("failed to fetch event")?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            bail!("event not found: {}", event_id);
        }
        let body: ApiEnvelope<Event> = response
            .error_for_status()
            .context("event request failed")?
            .json()
            .await
            .context("invalid event response")?;

        match body.data {
            Some(event) => Ok(event.status),
            None => bail!(
                "{}",
                body.error.unwrap_or_else(|| "event fetch failed".to_string())
            ),
        }
    }

    async fn chunks_after(&self, event_id: &str, after: i64) -> Result<Vec<Chunk>> {
        let body: ApiEnvelope<Vec<Chunk>> = self
            .client
            .get(format!("{}/events/{}/chunks", self.base_url, event_id))
            .query(&[("after", after)])
            .send()
            .await
            .context("failed to poll chunks")?
            .error_for_status()
            .context("chunk poll failed")?
            .json()
            .await
            .context("invalid chunk response")?;

        Ok(body.data.unwrap_or_default())
    }
}
