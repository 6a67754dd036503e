//! Protocol engine for syncing historical sleep data from a wearable band.
//!
//! The band exposes a multi-stage, chunked, count-prefixed binary protocol
//! over an unreliable low-bandwidth link: one logical sync spans dozens of
//! request/response exchanges, any of which can be lost, delayed, or
//! malformed. This crate reconstructs a consistent, ordered record set
//! despite that, while the radio transport itself stays behind the
//! [`Channel`] seam on the embedder's side.
//!
//! # Architecture
//!
//! - **[`OrderTask`]**: one logical request, covering frame assembly,
//!   response interpretation, and timeout behavior. [`SleepIndexTask`] and
//!   [`SleepRecordTask`] chain to form a two-phase sleep sync.
//! - **[`TaskExecutor`]**: guarantees one in-flight exchange at a time,
//!   owns the re-armable per-task deadline, and always advances the queue
//!   past a failed exchange.
//! - **[`SyncSession`]**: per-sync aggregation state, the index-keyed
//!   record map and the two phase counters.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use bandsync_core::{ExecutorOptions, MockChannel, SleepIndexTask, SyncEvent, TaskExecutor};
//!
//! #[tokio::main]
//! async fn main() {
//!     let channel = Arc::new(MockChannel::new());
//!     let (executor, mut events) = TaskExecutor::spawn(channel, ExecutorOptions::default());
//!
//!     // Ask for everything recorded since the last sync
//!     let last_sync = time::PrimitiveDateTime::MIN;
//!     executor
//!         .enqueue(Box::new(SleepIndexTask::new(last_sync)))
//!         .unwrap();
//!
//!     // Inbound frames from the radio go to executor.handle_frame(...);
//!     // results come back on the event channel.
//!     while let Some(event) = events.recv().await {
//!         if let SyncEvent::SyncCompleted { sleeps } = event {
//!             println!("synced {} days", sleeps.len());
//!             break;
//!         }
//!     }
//! }
//! ```

pub mod channel;
pub mod commands;
pub mod error;
pub mod events;
pub mod executor;
pub mod mock;
pub mod session;
pub mod sleep;
pub mod task;

pub use channel::Channel;
pub use error::{Error, Result};
pub use events::{EventReceiver, SyncEvent, SyncEventStream};
pub use executor::{ExecutorOptions, TaskExecutor};
pub use mock::MockChannel;
pub use session::SyncSession;
pub use sleep::{SleepIndexTask, SleepRecordTask};
pub use task::{OrderStatus, OrderTask, ResponseKind, ResponseOutcome, TimeoutDecision};

// Re-export the shared data model
pub use bandsync_types::{codec, DailySleep, ParseError, SleepStage};
