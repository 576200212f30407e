use crate::event::AppEvent;
use std::time::Duration;
use tokio::sync::mpsc;

/// Drives time-based UI state such as snackbar expiry.
pub async fn start_ticker(tx: mpsc::UnboundedSender<AppEvent>, interval_ms: u64) {
    let mut interval = tokio::time::interval(Duration::from_millis(interval_ms.max(50)));
    interval.tick().await;

    loop {
        interval.tick().await;
        if tx.send(AppEvent::Tick).is_err() {
            break;
        }
    }
}
