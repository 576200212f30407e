//! Keeps a room's webhook state and activity feed in step with the backend.
//!
//! A snapshot fetch seeds `hook_id`, subscriptions and the feed; the live
//! stream then prepends events as they arrive. Both run as tokio tasks that
//! report back through the app's event channel, so every state change happens
//! on the main loop.

use crate::activity::backend::{ActivityBackend, ActivityStream};
use crate::activity::types::{ActivityEvent, HookId, Subscriptions, WebhookRecord};
use crate::error::Result;
use crate::event::AppEvent;
use crate::room::RoomId;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionId(u64);

/// An open push stream. Dropping it closes the connection.
struct LiveConnection {
    id: ConnectionId,
    hook_id: HookId,
    task: JoinHandle<()>,
}

impl Drop for LiveConnection {
    fn drop(&mut self) {
        self.task.abort();
        tracing::debug!(hook = %self.hook_id, connection = self.id.0, "live activity stream closed");
    }
}

/// Callbacks handed to the webhook configuration dialog.
pub trait WebhookMutator {
    fn set_subscriptions(&mut self, categories: &[String]);
    fn set_hook_id(&mut self, hook_id: Option<HookId>);
    fn reset_events(&mut self, events: Vec<ActivityEvent>);
}

pub struct FeedSynchronizer {
    backend: Arc<dyn ActivityBackend>,
    tx: mpsc::UnboundedSender<AppEvent>,
    room: Option<RoomId>,
    generation: u64,
    hook_id: Option<HookId>,
    subscriptions: Subscriptions,
    subscriptions_revision: u64,
    events: Vec<ActivityEvent>,
    live: Option<LiveConnection>,
    next_connection: u64,
}

impl FeedSynchronizer {
    pub fn new(backend: Arc<dyn ActivityBackend>, tx: mpsc::UnboundedSender<AppEvent>) -> Self {
        Self {
            backend,
            tx,
            room: None,
            generation: 0,
            hook_id: None,
            subscriptions: Subscriptions::default(),
            subscriptions_revision: 0,
            events: Vec::new(),
            live: None,
            next_connection: 0,
        }
    }

    #[cfg(test)]
    pub fn room(&self) -> Option<&RoomId> {
        self.room.as_ref()
    }

    pub fn hook_id(&self) -> Option<&HookId> {
        self.hook_id.as_ref()
    }

    pub fn subscriptions(&self) -> &Subscriptions {
        &self.subscriptions
    }

    /// Bumped each time the stored subscription set is replaced.
    #[cfg(test)]
    pub fn subscriptions_revision(&self) -> u64 {
        self.subscriptions_revision
    }

    pub fn events(&self) -> &[ActivityEvent] {
        &self.events
    }

    pub fn is_live(&self) -> bool {
        self.live.is_some()
    }

    pub fn backend(&self) -> Arc<dyn ActivityBackend> {
        Arc::clone(&self.backend)
    }

    /// Loads the snapshot for `room`. A different room discards all current state first.
    pub fn initialize(&mut self, room: &RoomId) {
        if self.room.as_ref() != Some(room) {
            self.set_hook_id(None);
            self.events.clear();
            self.set_subscriptions(&[]);
            self.room = Some(room.clone());
        }

        self.generation += 1;
        let generation = self.generation;
        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        let room = room.clone();
        tracing::debug!(%room, generation, "fetching webhook snapshot");
        tokio::spawn(async move {
            let result = backend.fetch_webhook(&room).await;
            let _ = tx.send(AppEvent::Snapshot { generation, result });
        });
    }

    pub fn refresh(&mut self) {
        if let Some(room) = self.room.clone() {
            self.initialize(&room);
        }
    }

    /// Releases the stream and forgets the room. In-flight snapshots are ignored.
    pub fn stop(&mut self) {
        self.generation += 1;
        self.set_hook_id(None);
        self.events.clear();
        self.set_subscriptions(&[]);
        self.room = None;
    }

    pub fn apply_snapshot(&mut self, generation: u64, result: Result<Option<WebhookRecord>>) {
        if generation != self.generation {
            tracing::debug!(generation, current = self.generation, "discarding stale snapshot");
            return;
        }

        match result {
            Ok(Some(record)) => {
                tracing::info!(
                    hook = %record.hook_id,
                    events = record.events.len(),
                    "webhook snapshot loaded"
                );
                self.set_hook_id(Some(record.hook_id));
                self.set_subscriptions(&record.subscriptions);
                self.reset_events(record.events);
            }
            Ok(None) => {
                tracing::info!(room = ?self.room, "room has no webhook");
                self.set_hook_id(None);
                self.events.clear();
            }
            Err(e) => {
                tracing::warn!(room = ?self.room, error = %e, "webhook snapshot failed");
            }
        }
    }

    /// Prepends a streamed event. Messages from a connection that is no longer live are
    /// dropped; returns whether the event was kept.
    pub fn push_stream_event(&mut self, connection: ConnectionId, event: ActivityEvent) -> bool {
        match self.live {
            Some(ref live) if live.id == connection => {
                self.events.insert(0, event);
                true
            }
            _ => {
                tracing::debug!(
                    connection = connection.0,
                    event = %event.id,
                    "dropping event from closed stream"
                );
                false
            }
        }
    }

    pub fn stream_closed(&mut self, connection: ConnectionId, reason: Option<String>) {
        if self.live.as_ref().is_some_and(|live| live.id == connection) {
            match reason {
                Some(reason) => tracing::warn!(connection = connection.0, %reason, "activity stream ended"),
                None => tracing::info!(connection = connection.0, "activity stream ended"),
            }
            self.live = None;
        }
    }

    fn connect(&mut self, hook_id: &HookId) {
        let stream = match self.backend.subscribe(hook_id) {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(hook = %hook_id, error = %e, "cannot open activity stream");
                return;
            }
        };

        self.next_connection += 1;
        let id = ConnectionId(self.next_connection);
        let task = tokio::spawn(forward_stream(id, stream, self.tx.clone()));
        tracing::info!(hook = %hook_id, connection = id.0, "live activity stream opened");
        self.live = Some(LiveConnection {
            id,
            hook_id: hook_id.clone(),
            task,
        });
    }
}

impl WebhookMutator for FeedSynchronizer {
    fn set_subscriptions(&mut self, categories: &[String]) {
        if self.subscriptions.differs_from(categories) {
            self.subscriptions = Subscriptions::from_slice(categories);
            self.subscriptions_revision += 1;
            tracing::debug!(
                revision = self.subscriptions_revision,
                count = categories.len(),
                "subscriptions replaced"
            );
        }
    }

    /// Drives the stream lifecycle: the old connection closes before a new one opens.
    fn set_hook_id(&mut self, hook_id: Option<HookId>) {
        if self.hook_id == hook_id {
            return;
        }
        self.live = None;
        self.hook_id = hook_id;
        if let Some(id) = self.hook_id.clone() {
            self.connect(&id);
        }
    }

    fn reset_events(&mut self, mut events: Vec<ActivityEvent>) {
        sort_newest_first(&mut events);
        self.events = events;
    }
}

/// Descending by `updated_at`; equal timestamps keep their incoming order.
pub fn sort_newest_first(events: &mut [ActivityEvent]) {
    events.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
}

async fn forward_stream(
    connection: ConnectionId,
    mut stream: ActivityStream,
    tx: mpsc::UnboundedSender<AppEvent>,
) {
    while let Some(item) = stream.next().await {
        match item {
            Ok(event) => {
                if tx.send(AppEvent::Activity { connection, event }).is_err() {
                    return;
                }
            }
            Err(e) => {
                let _ = tx.send(AppEvent::StreamClosed {
                    connection,
                    reason: Some(e.to_string()),
                });
                return;
            }
        }
    }
    let _ = tx.send(AppEvent::StreamClosed {
        connection,
        reason: None,
    });
}
