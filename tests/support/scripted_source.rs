//! In-memory [`MessageSource`] with scripted fetch outcomes.
//!
//! Records the order in which fetches start and end, how many run at once,
//! and the ledger status each item had when its fetch began.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use harvester_core::source::ProgressCallback;
use harvester_core::{
    ChannelRef, ContentFilter, DownloadError, Ledger, MediaItem, MessageSource, SourceError,
    Status,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchEvent {
    Start(i64),
    End(i64),
}

pub struct ScriptedSource {
    channel: ChannelRef,
    items: Vec<MediaItem>,
    failures: HashSet<i64>,
    panics: HashSet<i64>,
    fetch_delay: Duration,
    ledger: Mutex<Option<Arc<Ledger>>>,
    events: Mutex<Vec<FetchEvent>>,
    observed: Mutex<HashMap<i64, Vec<Option<Status>>>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(items: Vec<MediaItem>) -> Self {
        Self {
            channel: ChannelRef {
                id: 555,
                name: "Test Channel".to_string(),
                username: Some("test".to_string()),
            },
            items,
            failures: HashSet::new(),
            panics: HashSet::new(),
            fetch_delay: Duration::from_millis(20),
            ledger: Mutex::new(None),
            events: Mutex::new(Vec::new()),
            observed: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Sets how long each fetch takes.
    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    /// Fetches of these ids fail with a remote error.
    pub fn failing(mut self, ids: &[i64]) -> Self {
        self.failures.extend(ids.iter().copied());
        self
    }

    /// Fetches of these ids panic mid-transfer.
    pub fn panicking(mut self, ids: &[i64]) -> Self {
        self.panics.extend(ids.iter().copied());
        self
    }

    pub fn channel(&self) -> ChannelRef {
        self.channel.clone()
    }

    pub fn items(&self) -> Vec<MediaItem> {
        self.items.clone()
    }

    /// Lets fetches record the ledger status of their item.
    pub fn watch_ledger(&self, ledger: Arc<Ledger>) {
        *self.ledger.lock().unwrap() = Some(ledger);
    }

    pub fn events(&self) -> Vec<FetchEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, FetchEvent::Start(_)))
            .count()
    }

    pub fn fetches_of(&self, id: i64) -> usize {
        self.events()
            .iter()
            .filter(|e| **e == FetchEvent::Start(id))
            .count()
    }

    /// Number of fetches running when `id` started, itself included.
    pub fn in_flight_at_start(&self, id: i64) -> usize {
        let mut running = 0usize;
        for event in self.events() {
            match event {
                FetchEvent::Start(started) => {
                    running += 1;
                    if started == id {
                        return running;
                    }
                }
                FetchEvent::End(_) => running -= 1,
            }
        }
        0
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn observed_statuses(&self, id: i64) -> Vec<Option<Status>> {
        self.observed
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl MessageSource for ScriptedSource {
    async fn list_channels(&self) -> Result<Vec<ChannelRef>, SourceError> {
        Ok(vec![self.channel.clone()])
    }

    async fn list_messages(
        &self,
        channel: &ChannelRef,
        filter: ContentFilter,
        limit: usize,
    ) -> Result<Vec<MediaItem>, SourceError> {
        if channel.id != self.channel.id {
            return Err(SourceError::UnknownChannel {
                channel_id: channel.id,
            });
        }
        Ok(self
            .items
            .iter()
            .filter(|item| filter.matches(item))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn fetch_media(
        &self,
        item: &MediaItem,
        dest: &Path,
        on_progress: &mut ProgressCallback<'_>,
    ) -> Result<(), DownloadError> {
        self.events.lock().unwrap().push(FetchEvent::Start(item.id));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let ledger = self.ledger.lock().unwrap().clone();
        if let Some(ledger) = ledger {
            let status = ledger.status_of(item.id).await;
            self.observed
                .lock()
                .unwrap()
                .entry(item.id)
                .or_default()
                .push(status);
        }

        tokio::time::sleep(self.fetch_delay).await;
        assert!(!self.panics.contains(&item.id), "transfer of item {} blew up", item.id);

        let result = if self.failures.contains(&item.id) {
            on_progress(item.declared_size / 2, item.declared_size);
            Err(DownloadError::remote(item.id, "FILE_REFERENCE_EXPIRED"))
        } else {
            on_progress(item.declared_size / 2, item.declared_size);
            on_progress(item.declared_size, item.declared_size);
            let size = usize::try_from(item.declared_size).unwrap();
            tokio::fs::write(dest, vec![0u8; size])
                .await
                .map_err(|e| DownloadError::io(dest, e))
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.events.lock().unwrap().push(FetchEvent::End(item.id));
        result
    }
}
