//! Platform-agnostic types for wearable sleep-sync data.
//!
//! This crate provides the shared data model and binary codec used by the
//! bandsync protocol engine. It performs no I/O and has no async surface, so
//! it can be reused by any embedding (native, service, or wasm).
//!
//! # Features
//!
//! - [`DailySleep`] / [`SleepStage`]: reconstructed per-day sleep records
//! - [`codec`]: big-endian integer and packed date/time conversions
//! - [`ParseError`]: error type for data parsing

pub mod codec;
pub mod error;
pub mod types;

pub use error::{ParseError, ParseResult};
pub use types::{DailySleep, SleepStage, MIN_SLEEP_DETAIL_BYTES, MIN_SLEEP_INDEX_BYTES};
