use crate::activity::sync::ConnectionId;
use crate::activity::types::{ActivityEvent, WebhookRecord};
use crate::error::Result;
use crossterm::event::KeyEvent;

#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    /// Mouse press anywhere on the screen.
    Click,
    Resize,
    Tick,
    Snapshot {
        generation: u64,
        result: Result<Option<WebhookRecord>>,
    },
    Activity {
        connection: ConnectionId,
        event: ActivityEvent,
    },
    StreamClosed {
        connection: ConnectionId,
        reason: Option<String>,
    },
    WebhookSaved(Result<Option<WebhookRecord>>),
    WebhookDeleted(Result<()>),
}
