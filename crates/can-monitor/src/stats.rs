//! Link Statistics

use serde::Serialize;

/// Counters accumulated since process start
///
/// Never reset on reconfiguration; counters saturate instead of wrapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeStats {
    /// Frames taken from the controller
    pub rx_frames: u32,
    /// Frames transmitted (always zero, no transmit path)
    pub tx_frames: u32,
    /// Error-passive and bus-error alerts
    pub bus_errors: u32,
    /// Controller RX queue overflow alerts
    pub queue_overruns: u32,
    /// Capture time of the newest frame
    pub last_frame_ms: Option<u64>,
}

impl RuntimeStats {
    pub(crate) fn record_frame(&mut self, now_ms: u64) {
        self.rx_frames = self.rx_frames.saturating_add(1);
        self.last_frame_ms = Some(now_ms);
    }

    pub(crate) fn record_bus_error(&mut self) {
        self.bus_errors = self.bus_errors.saturating_add(1);
    }

    pub(crate) fn record_queue_overrun(&mut self) {
        self.queue_overruns = self.queue_overruns.saturating_add(1);
    }

    /// Milliseconds since the last frame, if any was received
    pub fn ms_since_frame(&self, now_ms: u64) -> Option<u64> {
        self.last_frame_ms.map(|t| now_ms.saturating_sub(t))
    }
}
