//! Download queue with paced batch dispatch.

use crate::error::{Result, StreamgrabError};
use crate::services::dispatch::{download_url, DispatchGateway};
use crate::services::media::MediaKind;
use crate::services::playback::PlaybackContext;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A pending download. Created only through [`DownloadQueue::enqueue`];
/// identity is the URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub url: String,
    pub quality: String,
    /// 0 = unknown.
    pub size_bytes: u64,
    pub filename: String,
    /// Context snapshot taken at enqueue time.
    pub context: Option<PlaybackContext>,
    pub added_at: DateTime<Utc>,
}

impl QueueItem {
    pub fn new(
        url: String,
        quality: String,
        size_bytes: u64,
        filename: String,
        context: Option<PlaybackContext>,
    ) -> Self {
        Self {
            url,
            quality,
            size_bytes,
            filename,
            context,
            added_at: Utc::now(),
        }
    }
}

/// Ordered, URL-deduplicated queue of pending downloads.
///
/// Insertion order is display and dispatch order. Batch dispatch serializes
/// items with a fixed pacing delay so the external handler is never flooded.
pub struct DownloadQueue {
    items: Vec<QueueItem>,
    dispatch_delay: Duration,
}

impl DownloadQueue {
    pub fn new(dispatch_delay_ms: u64) -> Self {
        Self {
            items: Vec::new(),
            dispatch_delay: Duration::from_millis(dispatch_delay_ms),
        }
    }

    /// Append a download. A URL already present is rejected without any state
    /// change. Returns the new queue length.
    pub fn enqueue(&mut self, item: QueueItem) -> Result<usize> {
        if self.items.iter().any(|q| q.url == item.url) {
            return Err(StreamgrabError::DuplicateQueued(item.filename));
        }
        log::info!("Queued download: {} ({})", item.filename, item.quality);
        self.items.push(item);
        Ok(self.items.len())
    }

    pub fn items(&self) -> &[QueueItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn remove_at(&mut self, index: usize) -> Result<QueueItem> {
        if index >= self.items.len() {
            return Err(StreamgrabError::InvalidQueueIndex(index));
        }
        let item = self.items.remove(index);
        log::info!("Removed from queue: {}", item.filename);
        Ok(item)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Dispatch one item immediately and drop it from the queue.
    pub fn dispatch_at(&mut self, index: usize, gateway: &dyn DispatchGateway) -> Result<QueueItem> {
        if index >= self.items.len() {
            return Err(StreamgrabError::InvalidQueueIndex(index));
        }
        let item = self.items.remove(index);
        dispatch_item(&item, gateway);
        Ok(item)
    }

    /// Dispatch every item strictly in insertion order, one gateway call per
    /// item with the pacing delay between consecutive calls, then clear the
    /// queue. Returns the number of dispatched items.
    pub async fn dispatch_all(&mut self, gateway: &dyn DispatchGateway) -> Result<usize> {
        if self.items.is_empty() {
            return Err(StreamgrabError::EmptyQueue);
        }

        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.dispatch_delay).await;
            }
            dispatch_item(item, gateway);
        }

        let sent = self.items.len();
        self.items.clear();
        log::info!("Dispatched {} downloads to the external handler", sent);
        Ok(sent)
    }
}

fn dispatch_item(item: &QueueItem, gateway: &dyn DispatchGateway) {
    let url = download_url(&item.url, &item.filename, MediaKind::Video);
    if !gateway.open_externally(&url, &item.filename) {
        log::warn!("External handler refused: {}", item.filename);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::dispatch::MockDispatchGateway;
    use std::sync::Mutex;

    fn item(url: &str, filename: &str) -> QueueItem {
        QueueItem::new(
            url.to_string(),
            "1080p".to_string(),
            0,
            filename.to_string(),
            None,
        )
    }

    /// Records every dispatched URL with the (tokio) time it arrived.
    struct RecordingGateway {
        calls: Mutex<Vec<(String, tokio::time::Instant)>>,
    }

    impl RecordingGateway {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl DispatchGateway for RecordingGateway {
        fn open_externally(&self, url: &str, _display_title: &str) -> bool {
            self.calls
                .lock()
                .unwrap()
                .push((url.to_string(), tokio::time::Instant::now()));
            true
        }
    }

    #[test]
    fn test_enqueue_rejects_duplicate_url() {
        let mut queue = DownloadQueue::new(500);
        assert_eq!(queue.enqueue(item("http://host/a.mp4", "A")).unwrap(), 1);

        let err = queue.enqueue(item("http://host/a.mp4", "A")).unwrap_err();
        assert!(matches!(err, StreamgrabError::DuplicateQueued(_)));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_enqueue_reports_length() {
        let mut queue = DownloadQueue::new(500);
        assert_eq!(queue.enqueue(item("http://host/a.mp4", "A")).unwrap(), 1);
        assert_eq!(queue.enqueue(item("http://host/b.mp4", "B")).unwrap(), 2);
    }

    #[test]
    fn test_remove_at() {
        let mut queue = DownloadQueue::new(500);
        queue.enqueue(item("http://host/a.mp4", "A")).unwrap();
        queue.enqueue(item("http://host/b.mp4", "B")).unwrap();

        let removed = queue.remove_at(0).unwrap();
        assert_eq!(removed.filename, "A");
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.items()[0].filename, "B");

        let err = queue.remove_at(5).unwrap_err();
        assert!(matches!(err, StreamgrabError::InvalidQueueIndex(5)));
    }

    #[test]
    fn test_clear() {
        let mut queue = DownloadQueue::new(500);
        queue.enqueue(item("http://host/a.mp4", "A")).unwrap();
        queue.clear();
        assert!(queue.is_empty());
    }

    #[test]
    fn test_dispatch_at_removes_item() {
        let mut queue = DownloadQueue::new(500);
        queue.enqueue(item("http://host/a.mp4", "A")).unwrap();
        queue.enqueue(item("http://host/b.mp4", "B")).unwrap();

        let mut gateway = MockDispatchGateway::new();
        gateway
            .expect_open_externally()
            .withf(|url, title| url.starts_with("http://host/a.mp4#filename=") && title == "A")
            .times(1)
            .return_const(true);

        let dispatched = queue.dispatch_at(0, &gateway).unwrap();
        assert_eq!(dispatched.filename, "A");
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_all_empty_queue() {
        let mut queue = DownloadQueue::new(500);
        let gateway = MockDispatchGateway::new();
        let err = queue.dispatch_all(&gateway).await.unwrap_err();
        assert!(matches!(err, StreamgrabError::EmptyQueue));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_all_in_insertion_order_then_clears() {
        let mut queue = DownloadQueue::new(500);
        queue.enqueue(item("http://host/a.mp4", "A")).unwrap();
        queue.enqueue(item("http://host/b.mp4", "B")).unwrap();
        queue.enqueue(item("http://host/c.mp4", "C")).unwrap();

        let gateway = RecordingGateway::new();
        let sent = queue.dispatch_all(&gateway).await.unwrap();

        assert_eq!(sent, 3);
        assert!(queue.is_empty());

        let calls = gateway.calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        assert!(calls[0].0.starts_with("http://host/a.mp4"));
        assert!(calls[1].0.starts_with("http://host/b.mp4"));
        assert!(calls[2].0.starts_with("http://host/c.mp4"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_all_paces_consecutive_items() {
        let mut queue = DownloadQueue::new(500);
        queue.enqueue(item("http://host/a.mp4", "A")).unwrap();
        queue.enqueue(item("http://host/b.mp4", "B")).unwrap();

        let gateway = RecordingGateway::new();
        queue.dispatch_all(&gateway).await.unwrap();

        let calls = gateway.calls.lock().unwrap();
        let gap = calls[1].1.duration_since(calls[0].1);
        assert!(gap >= Duration::from_millis(500), "gap was {:?}", gap);
    }

    #[tokio::test]
    async fn test_dispatch_all_continues_when_handler_refuses() {
        let mut queue = DownloadQueue::new(0);
        queue.enqueue(item("http://host/a.mp4", "A")).unwrap();
        queue.enqueue(item("http://host/b.mp4", "B")).unwrap();

        let mut gateway = MockDispatchGateway::new();
        gateway.expect_open_externally().times(2).return_const(false);

        let sent = queue.dispatch_all(&gateway).await.unwrap();
        assert_eq!(sent, 2);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_queue_item_serializes_camel_case() {
        let json = serde_json::to_value(item("http://host/a.mp4", "A")).unwrap();
        assert!(json.get("sizeBytes").is_some());
        assert!(json.get("addedAt").is_some());
    }
}
