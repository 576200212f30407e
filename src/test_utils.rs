#![cfg(test)]

use crate::activity::backend::{ActivityBackend, ActivityStream};
use crate::activity::sync::FeedSynchronizer;
use crate::activity::types::*;
use crate::error::{Rc4GitError, Result};
use crate::event::AppEvent;
use crate::oauth::Redirector;
use crate::room::RoomId;
use async_trait::async_trait;
use base64::Engine;
use chrono::{TimeZone, Utc};
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

pub fn make_event(id: &str, secs: i64) -> ActivityEvent {
    ActivityEvent {
        id: id.to_string(),
        updated_at: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
        payload: serde_json::Map::new(),
    }
}

pub fn make_record(hook: &str, subscriptions: &[&str], events: Vec<ActivityEvent>) -> WebhookRecord {
    WebhookRecord {
        hook_id: HookId::new(hook),
        subscriptions: subscriptions.iter().map(|s| s.to_string()).collect(),
        events,
    }
}

/// Unsigned JWT carrying only a `username` claim.
pub fn make_jwt(username: &str) -> String {
    let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
    let header = engine.encode(br#"{"alg":"none"}"#);
    let claims = engine.encode(serde_json::json!({ "username": username }).to_string());
    format!("{header}.{claims}.sig")
}

type StreamSender = mpsc::UnboundedSender<Result<ActivityEvent>>;

/// In-memory backend: snapshots per room name, one channel per subscribed hook.
#[derive(Default)]
pub struct MockBackend {
    webhooks: Mutex<HashMap<String, Option<WebhookRecord>>>,
    streams: Mutex<Vec<(HookId, StreamSender)>>,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_webhook(&self, room: &str, record: Option<WebhookRecord>) {
        self.webhooks.lock().unwrap().insert(room.to_string(), record);
    }

    pub fn subscribed_hooks(&self) -> Vec<HookId> {
        self.streams.lock().unwrap().iter().map(|(h, _)| h.clone()).collect()
    }

    fn sender(&self, hook: &HookId) -> StreamSender {
        self.streams
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(h, _)| h == hook)
            .map(|(_, tx)| tx.clone())
            .expect("hook was never subscribed")
    }

    pub fn emit(&self, hook: &HookId, event: ActivityEvent) {
        let _ = self.sender(hook).send(Ok(event));
    }

    pub fn fail(&self, hook: &HookId, error: Rc4GitError) {
        let _ = self.sender(hook).send(Err(error));
    }

    /// True once the consumer side of the hook's latest stream is gone.
    pub fn is_closed(&self, hook: &HookId) -> bool {
        self.sender(hook).is_closed()
    }
}

#[async_trait]
impl ActivityBackend for MockBackend {
    async fn fetch_webhook(&self, room: &RoomId) -> Result<Option<WebhookRecord>> {
        self.webhooks
            .lock()
            .unwrap()
            .get(room.name())
            .cloned()
            .ok_or_else(|| Rc4GitError::Backend(format!("no such room {room}")))
    }

    fn subscribe(&self, hook_id: &HookId) -> Result<ActivityStream> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.streams.lock().unwrap().push((hook_id.clone(), tx));
        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });
        Ok(stream.boxed())
    }

    async fn save_webhook(
        &self,
        room: &RoomId,
        subscriptions: &[String],
    ) -> Result<Option<WebhookRecord>> {
        let record = WebhookRecord {
            hook_id: HookId::new(format!("hook-{}", room.name())),
            subscriptions: subscriptions.to_vec(),
            events: Vec::new(),
        };
        self.set_webhook(room.name(), Some(record.clone()));
        Ok(Some(record))
    }

    async fn delete_webhook(&self, _hook_id: &HookId) -> Result<()> {
        Ok(())
    }
}

pub fn make_synchronizer(
    backend: &Arc<MockBackend>,
) -> (FeedSynchronizer, mpsc::UnboundedReceiver<AppEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let backend: Arc<dyn ActivityBackend> = backend.clone();
    (FeedSynchronizer::new(backend, tx), rx)
}

/// Yields to the runtime until `cond` holds; aborted tasks are dropped asynchronously.
pub async fn wait_until(cond: impl Fn() -> bool) {
    for _ in 0..100 {
        if cond() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}

#[derive(Default)]
pub struct RecordingRedirector {
    urls: Mutex<Vec<String>>,
}

impl RecordingRedirector {
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

impl Redirector for RecordingRedirector {
    fn redirect(&self, url: &str) -> Result<()> {
        self.urls.lock().unwrap().push(url.to_string());
        Ok(())
    }
}
