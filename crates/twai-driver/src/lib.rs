//! TWAI (CAN) Controller Driver
//!
//! This crate wraps a TWAI controller behind the [`TwaiHal`] primitives and
//! manages its lifecycle: bit timing resolution, acceptance filter
//! construction, and leak-free install/start/stop sequencing.

mod driver;
mod error;
pub mod filter;
mod hal;
pub mod mock;
pub mod timing;

pub use driver::{BusConfig, TwaiDriver};
pub use error::{DriverError, ErrorCode};
pub use filter::{FilterConfig, EXT_ID_MASK, STD_ID_MASK};
pub use hal::{
    clamp_queue_len, Alerts, GeneralConfig, Mode, RxMessage, TwaiHal, DEFAULT_TX_QUEUE_LEN,
    MAX_RX_QUEUE_LEN, MIN_RX_QUEUE_LEN,
};
pub use mock::MockTwai;
pub use timing::{TimingConfig, TimingResolution};
