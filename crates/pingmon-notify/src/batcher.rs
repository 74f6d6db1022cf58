//! Area batcher — sliding-window debounce of transition events.
//!
//! One batcher per configured area. A flapping host or a shared-uplink
//! outage taking a whole area down produces one notification, not one
//! per host: each new event restarts the quiet-window countdown, and the
//! batch only flushes once the burst subsides.

use std::sync::Arc;
use std::time::Duration;

use pingmon_engine::TransitionEvent;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::notifier::{NotificationBatch, Notifier};

pub struct AreaBatcher {
    area_id: String,
    area_name: String,
    /// Quiet window; each received event resets the countdown.
    relay_time: Duration,
    notifier: Arc<dyn Notifier>,
}

impl AreaBatcher {
    pub fn new(
        area_id: &str,
        area_name: &str,
        relay_time: Duration,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            area_id: area_id.to_string(),
            area_name: area_name.to_string(),
            relay_time,
            notifier,
        }
    }

    /// Collect and flush batches until the inbound channel closes.
    /// A pending batch is flushed on closure, so no event is lost to
    /// shutdown once it reached the batcher.
    pub async fn run(self, mut rx: mpsc::Receiver<TransitionEvent>) {
        info!(area = %self.area_id, relay_time = ?self.relay_time, "area batcher waiting");
        while let Some(first) = rx.recv().await {
            let mut batch = vec![first];
            loop {
                match tokio::time::timeout(self.relay_time, rx.recv()).await {
                    Ok(Some(event)) => batch.push(event),
                    Ok(None) => {
                        self.flush(batch).await;
                        debug!(area = %self.area_id, "area batcher stopping");
                        return;
                    }
                    Err(_) => {
                        // Quiet window elapsed with no new event.
                        self.flush(batch).await;
                        break;
                    }
                }
            }
        }
        debug!(area = %self.area_id, "area batcher stopping");
    }

    async fn flush(&self, events: Vec<TransitionEvent>) {
        let count = events.len();
        let batch = NotificationBatch {
            area_id: self.area_id.clone(),
            area_name: self.area_name.clone(),
            events,
        };
        match self.notifier.deliver(batch).await {
            Ok(()) => info!(area = %self.area_id, events = count, "notification sent"),
            Err(err) => {
                // Fire-and-forget: log, never retry.
                error!(area = %self.area_id, error = %err, "notification delivery failed");
            }
        }
    }
}
