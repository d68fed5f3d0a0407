//! Controller Abstraction
//!
//! The primitives a TWAI controller exposes to this crate. Reads are
//! zero-wait: "nothing pending" is a normal outcome, not an error.

use crate::error::ErrorCode;
use crate::filter::FilterConfig;
use crate::timing::TimingConfig;
use serde::{Deserialize, Serialize};

/// Smallest accepted RX queue depth
pub const MIN_RX_QUEUE_LEN: u16 = 8;

/// Largest accepted RX queue depth
pub const MAX_RX_QUEUE_LEN: u16 = 256;

/// Controller default TX queue depth
pub const DEFAULT_TX_QUEUE_LEN: u16 = 5;

/// Clamp a requested RX queue depth into the supported range
pub fn clamp_queue_len(value: u16) -> u16 {
    value.clamp(MIN_RX_QUEUE_LEN, MAX_RX_QUEUE_LEN)
}

/// Controller operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    /// Participates in the bus (acknowledges frames)
    Normal,
    /// Never drives the bus lines
    ListenOnly,
}

impl Mode {
    /// Human readable label
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Normal => "Normal",
            Mode::ListenOnly => "Listen-Only",
        }
    }
}

/// Alert flags reported by the controller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alerts(pub u32);

impl Alerts {
    pub const NONE: Alerts = Alerts(0);
    pub const RX_DATA: Alerts = Alerts(0x0000_0004);
    pub const BUS_ERROR: Alerts = Alerts(0x0000_0200);
    pub const RX_QUEUE_FULL: Alerts = Alerts(0x0000_0800);
    pub const ERR_PASS: Alerts = Alerts(0x0000_1000);
    pub const BUS_OFF: Alerts = Alerts(0x0000_2000);

    /// Alerts enabled at install time
    pub const MONITORED: Alerts = Alerts(
        Self::RX_DATA.0 | Self::ERR_PASS.0 | Self::BUS_ERROR.0 | Self::RX_QUEUE_FULL.0,
    );

    /// Whether every flag in `other` is set
    pub fn contains(&self, other: Alerts) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for Alerts {
    type Output = Alerts;

    fn bitor(self, rhs: Alerts) -> Alerts {
        Alerts(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for Alerts {
    fn bitor_assign(&mut self, rhs: Alerts) {
        self.0 |= rhs.0;
    }
}

impl std::ops::BitAnd for Alerts {
    type Output = Alerts;

    fn bitand(self, rhs: Alerts) -> Alerts {
        Alerts(self.0 & rhs.0)
    }
}

/// General controller configuration passed at install time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralConfig {
    pub mode: Mode,
    pub tx_pin: u8,
    pub rx_pin: u8,
    pub tx_queue_len: u16,
    pub rx_queue_len: u16,
    pub alerts_enabled: Alerts,
}

/// Message as delivered by the controller's receive queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RxMessage {
    pub identifier: u32,
    pub data_length_code: u8,
    pub data: [u8; 8],
    pub extd: bool,
    pub rtr: bool,
}

impl RxMessage {
    /// Data frame with the DLC taken from the payload length (max 8 bytes)
    pub fn data_frame(identifier: u32, extd: bool, payload: &[u8]) -> Self {
        let len = payload.len().min(8);
        let mut data = [0u8; 8];
        data[..len].copy_from_slice(&payload[..len]);
        Self {
            identifier,
            data_length_code: len as u8,
            data,
            extd,
            rtr: false,
        }
    }

    /// Remote request frame
    pub fn remote_frame(identifier: u32, extd: bool, dlc: u8) -> Self {
        Self {
            identifier,
            data_length_code: dlc,
            extd,
            rtr: true,
            ..Default::default()
        }
    }
}

/// Primitives of a TWAI (CAN) controller
///
/// `install` allocates driver resources and must be paired with `uninstall`.
/// `receive` and `read_alerts` never block.
pub trait TwaiHal {
    fn install(
        &mut self,
        general: &GeneralConfig,
        timing: &TimingConfig,
        filter: &FilterConfig,
    ) -> Result<(), ErrorCode>;

    fn start(&mut self) -> Result<(), ErrorCode>;

    fn stop(&mut self) -> Result<(), ErrorCode>;

    fn uninstall(&mut self) -> Result<(), ErrorCode>;

    /// Next queued message, if any
    fn receive(&mut self) -> Option<RxMessage>;

    /// Alerts raised since the last read, cleared on read
    fn read_alerts(&mut self) -> Alerts;
}
