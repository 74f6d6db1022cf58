//! pingmon-engine — the status-tracking core.
//!
//! Turns the prober's noisy stream of per-round outcomes into stable
//! up/down transitions with asymmetric hysteresis: a host must miss
//! `down_threshold` consecutive rounds to be declared down, and its
//! failure counter must unwind all the way to zero before it is declared
//! up again. Transitions are emitted as immutable events over a bounded
//! queue; the engine itself never blocks on downstream consumers.
//!
//! # Architecture
//!
//! ```text
//! StatusEngine::run()
//!   ├── reply channel   ← prober, one Reply per answered echo
//!   ├── round channel   ← prober, one marker per finished round
//!   ├── HostRegistry    — single-writer host state
//!   ├── round results   — addr → answered-this-round
//!   ├── events queue    → dispatcher (try_send, lossy)
//!   └── snapshots       → watch channel, copy-on-read for readers
//! ```

pub mod engine;
pub mod registry;
pub mod transition;

pub use engine::StatusEngine;
pub use registry::{FAIL_CAP, Host, HostRegistry};
pub use transition::TransitionEvent;
