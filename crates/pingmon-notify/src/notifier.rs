//! The notifier seam between batching and transport.

use pingmon_engine::TransitionEvent;
use thiserror::Error;
use tracing::info;

/// Errors from notification delivery.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("smtp transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// A sender or recipient address could not be parsed.
    #[error("address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The message could not be assembled.
    #[error("message build error: {0}")]
    Build(String),
}

/// One flushed batch for one area. Events are in emission order.
#[derive(Debug, Clone)]
pub struct NotificationBatch {
    pub area_id: String,
    pub area_name: String,
    pub events: Vec<TransitionEvent>,
}

/// Boxed delivery future, so the trait stays object-safe.
pub type NotifyFuture = std::pin::Pin<
    Box<dyn std::future::Future<Output = Result<(), NotifyError>> + Send>,
>;

/// Renders and transmits one composed notification per flushed batch.
///
/// Delivery is fire-and-forget from the batcher's point of view: failures
/// are logged by the caller and never retried.
pub trait Notifier: Send + Sync + 'static {
    fn deliver(&self, batch: NotificationBatch) -> NotifyFuture;
}

/// Fallback notifier when no mail transport is configured: writes each
/// transition to the log and succeeds.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn deliver(&self, batch: NotificationBatch) -> NotifyFuture {
        Box::pin(async move {
            for event in &batch.events {
                info!(
                    area = %batch.area_id,
                    name = %event.name,
                    addr = %event.addr,
                    up = event.up,
                    "status change"
                );
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;
    use std::time::SystemTime;

    fn event(name: &str) -> TransitionEvent {
        TransitionEvent {
            name: name.to_string(),
            addr: "192.0.2.1".parse::<IpAddr>().unwrap(),
            area_id: "east".to_string(),
            area_name: "East".to_string(),
            up: false,
            rtt: None,
            last_seen: None,
            at: SystemTime::now(),
        }
    }

    #[tokio::test]
    async fn log_notifier_always_succeeds() {
        let batch = NotificationBatch {
            area_id: "east".to_string(),
            area_name: "East".to_string(),
            events: vec![event("gw1"), event("gw2")],
        };
        assert!(LogNotifier.deliver(batch).await.is_ok());
    }

    #[test]
    fn build_error_display() {
        let err = NotifyError::Build("missing body".to_string());
        assert_eq!(err.to_string(), "message build error: missing body");
    }
}
