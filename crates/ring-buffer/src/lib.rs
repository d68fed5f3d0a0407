//! Captured Frame Ring Buffer
//!
//! Provides a fixed-capacity, overwrite-oldest store for CAN frames captured
//! from the bus. Accessed from a single cooperative context, so no locking.

mod buffer;

pub use buffer::{FrameRingBuffer, DEFAULT_CAPACITY};

use serde::{Deserialize, Serialize};

/// Maximum payload length of a classic CAN frame
pub const MAX_PAYLOAD: usize = 8;

/// Snapshot of one bus message as it was received
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedFrame {
    /// Identifier (11 or 29 bits)
    pub id: u32,
    /// Data length code as reported by the controller (0-8)
    pub dlc: u8,
    /// Payload storage; only the first `min(dlc, 8)` bytes are meaningful
    pub data: [u8; MAX_PAYLOAD],
    /// 29-bit extended identifier
    pub extended: bool,
    /// Remote transmission request
    pub rtr: bool,
    /// Monotonic capture time in milliseconds
    pub timestamp_ms: u64,
}

impl CapturedFrame {
    /// Build a frame, copying at most `min(dlc, 8)` bytes of `payload`
    pub fn new(id: u32, dlc: u8, payload: &[u8], extended: bool, rtr: bool, timestamp_ms: u64) -> Self {
        let mut data = [0u8; MAX_PAYLOAD];
        let len = (dlc as usize).min(MAX_PAYLOAD).min(payload.len());
        data[..len].copy_from_slice(&payload[..len]);

        Self {
            id,
            dlc,
            data,
            extended,
            rtr,
            timestamp_ms,
        }
    }

    /// Meaningful payload bytes
    pub fn payload(&self) -> &[u8] {
        &self.data[..(self.dlc as usize).min(MAX_PAYLOAD)]
    }
}
