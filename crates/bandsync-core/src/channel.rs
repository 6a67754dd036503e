//! Transport seam between the protocol engine and the radio link.
//!
//! The engine never talks to a radio directly. The embedding application
//! implements [`Channel`] over whatever link it owns (a BLE characteristic
//! write, a serial port, a test double) and feeds inbound frames back through
//! [`TaskExecutor::handle_frame`](crate::executor::TaskExecutor::handle_frame).
//! Connection lifecycle (discovery, pairing, reconnection) stays on the
//! embedder's side of this seam.

use async_trait::async_trait;

use crate::error::Result;

/// Outbound half of the band link.
///
/// Implementations must be cheap to call from the executor's event loop; a
/// slow link should buffer internally rather than stall the engine.
///
/// # Example
///
/// ```ignore
/// struct GattChannel { /* platform handle */ }
///
/// #[async_trait::async_trait]
/// impl Channel for GattChannel {
///     async fn write(&self, frame: &[u8]) -> bandsync_core::Result<()> {
///         self.write_characteristic(COMMAND_UUID, frame)
///             .await
///             .map_err(|e| bandsync_core::Error::channel(e.to_string()))
///     }
/// }
/// ```
#[async_trait]
pub trait Channel: Send + Sync {
    /// Write one assembled command frame to the device.
    async fn write(&self, frame: &[u8]) -> Result<()>;
}
