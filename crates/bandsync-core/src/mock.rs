//! Mock channel implementation for testing.
//!
//! [`MockChannel`] implements the [`Channel`] trait without any radio
//! hardware: outbound frames are captured for inspection, writes can be made
//! to fail, and artificial latency can simulate a slow link. Inbound traffic
//! is driven by the test itself through
//! [`TaskExecutor::handle_frame`](crate::executor::TaskExecutor::handle_frame).

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::channel::Channel;
use crate::error::{Error, Result};

/// A mock band link for testing.
///
/// # Example
///
/// ```
/// use bandsync_core::{Channel, MockChannel};
///
/// #[tokio::main]
/// async fn main() {
///     let channel = MockChannel::new();
///     channel.write(&[0x2C, 0x00]).await.unwrap();
///     assert_eq!(channel.sent().await.len(), 1);
/// }
/// ```
pub struct MockChannel {
    address: String,
    sent: RwLock<Vec<Vec<u8>>>,
    should_fail: AtomicBool,
    fail_message: RwLock<String>,
    /// Simulated write latency in milliseconds (0 = no delay).
    write_latency_ms: AtomicU64,
    write_count: AtomicU32,
}

impl std::fmt::Debug for MockChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockChannel")
            .field("address", &self.address)
            .field("write_count", &self.write_count.load(Ordering::Relaxed))
            .field("should_fail", &self.should_fail.load(Ordering::Relaxed))
            .finish()
    }
}

impl MockChannel {
    /// Create a new mock channel with a random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self {
            address: format!("MOCK-{:06X}", rand::random::<u32>() % 0xFF_FFFF),
            sent: RwLock::new(Vec::new()),
            should_fail: AtomicBool::new(false),
            fail_message: RwLock::new("Mock write failure".to_string()),
            write_latency_ms: AtomicU64::new(0),
            write_count: AtomicU32::new(0),
        }
    }

    /// Get the mock identifier.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// All frames written so far, oldest first.
    pub async fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.read().await.clone()
    }

    /// The most recently written frame, if any.
    pub async fn last_sent(&self) -> Option<Vec<u8>> {
        self.sent.read().await.last().cloned()
    }

    /// Number of successful writes.
    pub fn write_count(&self) -> u32 {
        self.write_count.load(Ordering::Relaxed)
    }

    /// Make subsequent writes fail (or succeed again).
    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::Relaxed);
    }

    /// Set the message reported by failed writes.
    pub async fn set_fail_message(&self, message: &str) {
        *self.fail_message.write().await = message.to_string();
    }

    /// Add artificial latency to every write.
    pub fn set_write_latency(&self, latency: Duration) {
        self.write_latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Channel for MockChannel {
    async fn write(&self, frame: &[u8]) -> Result<()> {
        let latency = self.write_latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        if self.should_fail.load(Ordering::Relaxed) {
            return Err(Error::channel(self.fail_message.read().await.clone()));
        }

        self.write_count.fetch_add(1, Ordering::Relaxed);
        self.sent.write().await.push(frame.to_vec());
        Ok(())
    }
}
