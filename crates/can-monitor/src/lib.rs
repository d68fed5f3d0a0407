//! CAN Bus Capture Monitor
//!
//! Captures traffic from a TWAI controller once per host tick, keeps a
//! bounded history of recent frames with link statistics, and reconciles the
//! controller with host-supplied settings without ever blocking the host.

mod clock;
mod module;
pub mod poller;
pub mod reconciler;
pub mod reporter;
pub mod settings;
mod stats;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use module::{wants_lite, CanMonitor, HostModule, INFO_KEY, LITE_FLAG, STATE_KEY};
pub use poller::PollSummary;
pub use reconciler::Outcome;
pub use reporter::{LinkStatus, RecentFrame, StateSnapshot, StatusSnapshot, RECENT_FRAMES};
pub use settings::{config_hints, PollRate, Settings, UiEffect, CONFIG_KEY};
pub use stats::RuntimeStats;

pub use ring_buffer::CapturedFrame;
