//! pingmon-notify — from transition events to outbound notifications.
//!
//! A single [`Dispatcher`] drains the engine's bounded event queue and
//! routes each event to its area's [`AreaBatcher`]. Each batcher debounces
//! bursts behind a sliding quiet window and hands the accumulated batch to
//! a [`Notifier`] as one composed notification. The pipeline is lossy by
//! design: a full or stalled downstream drops events rather than ever
//! backing up into the status engine.
//!
//! # Architecture
//!
//! ```text
//! engine events queue
//!   └── Dispatcher::run()            — route by area id, 2s send timeout
//!         ├── AreaBatcher (east)     — sliding relay_time window
//!         ├── AreaBatcher (west)
//!         └── ...
//!               └── Notifier::deliver()  — MailNotifier or LogNotifier
//! ```

pub mod batcher;
pub mod dispatcher;
pub mod mail;
pub mod notifier;

pub use batcher::AreaBatcher;
pub use dispatcher::Dispatcher;
pub use mail::MailNotifier;
pub use notifier::{LogNotifier, NotificationBatch, Notifier, NotifyError, NotifyFuture};
