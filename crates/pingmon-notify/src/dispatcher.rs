//! Notification dispatcher — routes transition events to area batchers.

use std::collections::HashMap;
use std::time::Duration;

use pingmon_engine::TransitionEvent;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// How long a send toward one area batcher may block before the event is
/// dropped. The dispatcher sits directly downstream of the status
/// engine's emission path and must never stall.
pub const SEND_TIMEOUT: Duration = Duration::from_secs(2);

/// Single consumer of the engine's event queue. The area table is fixed
/// at startup; events for unknown areas are dropped.
pub struct Dispatcher {
    areas: HashMap<String, mpsc::Sender<TransitionEvent>>,
}

impl Dispatcher {
    pub fn new(areas: HashMap<String, mpsc::Sender<TransitionEvent>>) -> Self {
        Self { areas }
    }

    /// Drain the event queue until the engine side closes it.
    ///
    /// Dropping the dispatcher's area senders on exit lets each batcher
    /// flush its pending batch and stop.
    pub async fn run(self, mut events_rx: mpsc::Receiver<TransitionEvent>) {
        info!(areas = self.areas.len(), "dispatcher starting");
        while let Some(event) = events_rx.recv().await {
            let area_id = event.area_id.clone();
            let Some(tx) = self.areas.get(&area_id) else {
                debug!(area = %area_id, name = %event.name, "no batcher for area, dropping event");
                continue;
            };
            match tokio::time::timeout(SEND_TIMEOUT, tx.send(event)).await {
                Ok(Ok(())) => {}
                Ok(Err(_)) => {
                    debug!(area = %area_id, "area batcher gone, dropping event");
                }
                Err(_) => {
                    debug!(area = %area_id, "send to area batcher timed out, dropping event");
                }
            }
        }
        info!("dispatcher stopping");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;
    use std::time::SystemTime;

    fn event(area: &str, name: &str) -> TransitionEvent {
        TransitionEvent {
            name: name.to_string(),
            addr: "192.0.2.1".parse::<IpAddr>().unwrap(),
            area_id: area.to_string(),
            area_name: area.to_string(),
            up: false,
            rtt: None,
            last_seen: None,
            at: SystemTime::now(),
        }
    }

    #[tokio::test]
    async fn routes_by_area() {
        let (east_tx, mut east_rx) = mpsc::channel(4);
        let (west_tx, mut west_rx) = mpsc::channel(4);
        let areas = HashMap::from([
            ("east".to_string(), east_tx),
            ("west".to_string(), west_tx),
        ]);

        let (events_tx, events_rx) = mpsc::channel(8);
        let handle = tokio::spawn(Dispatcher::new(areas).run(events_rx));

        events_tx.send(event("east", "e1")).await.unwrap();
        events_tx.send(event("west", "w1")).await.unwrap();
        events_tx.send(event("east", "e2")).await.unwrap();
        drop(events_tx);
        handle.await.unwrap();

        assert_eq!(east_rx.recv().await.unwrap().name, "e1");
        assert_eq!(east_rx.recv().await.unwrap().name, "e2");
        assert_eq!(west_rx.recv().await.unwrap().name, "w1");
    }

    #[tokio::test]
    async fn unknown_area_dropped() {
        let (east_tx, mut east_rx) = mpsc::channel(4);
        let areas = HashMap::from([("east".to_string(), east_tx)]);

        let (events_tx, events_rx) = mpsc::channel(8);
        let handle = tokio::spawn(Dispatcher::new(areas).run(events_rx));

        events_tx.send(event("north", "n1")).await.unwrap();
        events_tx.send(event("east", "e1")).await.unwrap();
        drop(events_tx);
        handle.await.unwrap();

        assert_eq!(east_rx.recv().await.unwrap().name, "e1");
        assert!(east_rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_batcher_times_out_and_drops() {
        // Capacity one, receiver never drained: the second send blocks
        // until the timeout fires and the event is dropped.
        let (east_tx, east_rx) = mpsc::channel(1);
        let areas = HashMap::from([("east".to_string(), east_tx)]);

        let (events_tx, events_rx) = mpsc::channel(8);
        let handle = tokio::spawn(Dispatcher::new(areas).run(events_rx));

        events_tx.send(event("east", "e1")).await.unwrap();
        events_tx.send(event("east", "e2")).await.unwrap();
        drop(events_tx);
        handle.await.unwrap();

        let mut east_rx = east_rx;
        assert_eq!(east_rx.recv().await.unwrap().name, "e1");
        assert!(east_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn batcher_gone_dropped() {
        let (east_tx, east_rx) = mpsc::channel(4);
        drop(east_rx);
        let areas = HashMap::from([("east".to_string(), east_tx)]);

        let (events_tx, events_rx) = mpsc::channel(8);
        let handle = tokio::spawn(Dispatcher::new(areas).run(events_rx));

        events_tx.send(event("east", "e1")).await.unwrap();
        drop(events_tx);
        // The dispatcher must survive the dead batcher and exit cleanly.
        handle.await.unwrap();
    }
}
