use anyhow::Result;
use live_translate::event::{Chunk, EventStatus};
use live_translate::feed::{ChunkFeed, FeedSource};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Feed source that replays canned poll responses and records the cursor it
/// was asked for.
#[derive(Default)]
struct ScriptedSource {
    statuses: Mutex<VecDeque<EventStatus>>,
    responses: Mutex<VecDeque<Vec<Chunk>>>,
    afters: Mutex<Vec<i64>>,
}

impl ScriptedSource {
    fn new(statuses: Vec<EventStatus>, responses: Vec<Vec<Chunk>>) -> Arc<Self> {
        Arc::new(Self {
            statuses: Mutex::new(statuses.into()),
            responses: Mutex::new(responses.into()),
            afters: Mutex::new(Vec::new()),
        })
    }

    fn recorded_afters(&self) -> Vec<i64> {
        self.afters.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl FeedSource for ScriptedSource {
    async fn event_status(&self, _event_id: &str) -> Result<EventStatus> {
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(EventStatus::Ended))
    }

    async fn chunks_after(&self, _event_id: &str, after: i64) -> Result<Vec<Chunk>> {
        self.afters.lock().unwrap().push(after);
        Ok(self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default())
    }
}

fn chunk(index: u32) -> Chunk {
    Chunk::new(
        "event-feed",
        index,
        format!("מקור {}", index),
        format!("caption {}", index),
        index as i64 * 5000,
        (index as i64 + 1) * 5000,
    )
}

fn feed(source: Arc<ScriptedSource>) -> ChunkFeed {
    ChunkFeed::new(source, "event-feed".to_string(), Duration::from_millis(1))
}

#[tokio::test]
async fn polling_advances_the_cursor_across_gaps() {
    let source = ScriptedSource::new(
        vec![],
        vec![vec![chunk(0), chunk(1)], vec![chunk(3), chunk(4)]],
    );
    let mut feed = feed(source.clone());

    let first = feed.poll_once().await.unwrap();
    assert_eq!(
        first.iter().map(|c| c.chunk_index).collect::<Vec<_>>(),
        vec![0, 1]
    );
    assert_eq!(feed.cursor(), 1);

    // Index 2 was discarded server-side; the gap is tolerated, not awaited.
    let second = feed.poll_once().await.unwrap();
    assert_eq!(
        second.iter().map(|c| c.chunk_index).collect::<Vec<_>>(),
        vec![3, 4]
    );
    assert_eq!(feed.cursor(), 4);

    let all: Vec<u32> = feed.chunks().iter().map(|c| c.chunk_index).collect();
    assert_eq!(all, vec![0, 1, 3, 4]);
    assert_eq!(source.recorded_afters(), vec![-1, 1]);
}

#[tokio::test]
async fn stale_chunks_never_rewrite_the_local_sequence() {
    let source = ScriptedSource::new(
        vec![],
        vec![vec![chunk(2), chunk(3)], vec![chunk(1), chunk(4)]],
    );
    let mut feed = feed(source);

    feed.poll_once().await.unwrap();
    let appended = feed.poll_once().await.unwrap();

    // The late index 1 is dropped; appended chunks only ever extend the end.
    assert_eq!(
        appended.iter().map(|c| c.chunk_index).collect::<Vec<_>>(),
        vec![4]
    );
    let all: Vec<u32> = feed.chunks().iter().map(|c| c.chunk_index).collect();
    assert_eq!(all, vec![2, 3, 4]);
}

#[tokio::test]
async fn duplicates_within_one_response_are_collapsed() {
    let source = ScriptedSource::new(vec![], vec![vec![chunk(0), chunk(0), chunk(1)]]);
    let mut feed = feed(source);

    let appended = feed.poll_once().await.unwrap();
    assert_eq!(
        appended.iter().map(|c| c.chunk_index).collect::<Vec<_>>(),
        vec![0, 1]
    );
}

#[tokio::test]
async fn follow_forwards_chunks_until_the_event_ends() {
    let source = ScriptedSource::new(
        vec![EventStatus::Live, EventStatus::Ended],
        vec![vec![chunk(0)], vec![chunk(1)]],
    );
    let feed = feed(source);

    let (tx, mut rx) = mpsc::channel(8);
    feed.follow(tx).await.unwrap();

    let mut received = Vec::new();
    while let Ok(chunk) = rx.try_recv() {
        received.push(chunk.chunk_index);
    }
    assert_eq!(received, vec![0, 1]);
}

#[tokio::test]
async fn follow_performs_a_single_poll_for_an_ended_event() {
    let source = ScriptedSource::new(vec![EventStatus::Ended], vec![vec![chunk(0), chunk(1)]]);
    let feed = feed(source.clone());

    let (tx, mut rx) = mpsc::channel(8);
    feed.follow(tx).await.unwrap();

    let mut received = Vec::new();
    while let Ok(chunk) = rx.try_recv() {
        received.push(chunk.chunk_index);
    }
    assert_eq!(received, vec![0, 1]);
    // The ended event is fetched exactly once, so it produces no polling load.
    assert_eq!(source.recorded_afters(), vec![-1]);
}
