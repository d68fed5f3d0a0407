//! Host Snapshots
//!
//! Read-only views of the capture state for the host transport, and the
//! narrow set of runtime fields the host may write back.

use crate::settings::{PollRate, Settings, UiEffect};
use crate::stats::RuntimeStats;
use ring_buffer::{CapturedFrame, FrameRingBuffer};
use serde::Serialize;
use serde_json::Value;
use twai_driver::timing;

/// Frames included in a full state snapshot
pub const RECENT_FRAMES: usize = 20;

/// Overall link state shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LinkStatus {
    #[serde(rename = "Running")]
    Running,
    #[serde(rename = "Error - Failed to start")]
    StartFailed,
    #[serde(rename = "Disabled")]
    Disabled,
}

impl LinkStatus {
    pub fn label(&self) -> &'static str {
        match self {
            LinkStatus::Running => "Running",
            LinkStatus::StartFailed => "Error - Failed to start",
            LinkStatus::Disabled => "Disabled",
        }
    }
}

/// Everything a snapshot is built from
#[derive(Debug, Clone, Copy)]
pub struct LinkView<'a, const N: usize> {
    pub settings: &'a Settings,
    pub running: bool,
    pub start_failed: bool,
    pub stats: &'a RuntimeStats,
    pub ring: &'a FrameRingBuffer<N>,
    pub now_ms: u64,
}

impl<'a, const N: usize> LinkView<'a, N> {
    pub fn status(&self) -> LinkStatus {
        if self.running {
            LinkStatus::Running
        } else if self.start_failed {
            LinkStatus::StartFailed
        } else {
            LinkStatus::Disabled
        }
    }

    /// Ring-buffer overwrites plus controller queue overflows
    pub fn total_overruns(&self) -> u32 {
        self.ring.overruns().saturating_add(self.stats.queue_overruns)
    }
}

/// Summary for the host's info page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub status: LinkStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<&'static str>,
    /// Rate the controller runs at; unsupported settings show the fallback
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate_kbps: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rx_frames: Option<u32>,
    /// Only once a frame has been received
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secs_since_frame: Option<u64>,
    /// Only when non-zero
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bus_errors: Option<u32>,
    /// Only when non-zero
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overruns: Option<u32>,
}

impl StatusSnapshot {
    pub fn build<const N: usize>(view: &LinkView<'_, N>) -> Self {
        let status = view.status();
        if status != LinkStatus::Running {
            return Self {
                status,
                mode: None,
                bitrate_kbps: None,
                rx_frames: None,
                secs_since_frame: None,
                bus_errors: None,
                overruns: None,
            };
        }

        let overruns = view.total_overruns();
        Self {
            status,
            mode: Some(view.settings.bus_config().mode().label()),
            bitrate_kbps: Some(timing::resolve(view.settings.bitrate).timing.bitrate() / 1000),
            rx_frames: Some(view.stats.rx_frames),
            secs_since_frame: view.stats.ms_since_frame(view.now_ms).map(|ms| ms / 1000),
            bus_errors: (view.stats.bus_errors > 0).then_some(view.stats.bus_errors),
            overruns: (overruns > 0).then_some(overruns),
        }
    }
}

/// One frame as sent to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentFrame {
    pub id: u32,
    pub ext: bool,
    pub rtr: bool,
    pub dlc: u8,
    pub data: Vec<u8>,
    pub time: u64,
}

impl From<&CapturedFrame> for RecentFrame {
    fn from(frame: &CapturedFrame) -> Self {
        Self {
            id: frame.id,
            ext: frame.extended,
            rtr: frame.rtr,
            dlc: frame.dlc,
            data: frame.payload().to_vec(),
            time: frame.timestamp_ms,
        }
    }
}

/// Full state exchanged with the host UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    #[serde(flatten)]
    pub settings: Settings,
    pub started: bool,
    pub rx_count: u32,
    pub tx_count: u32,
    pub errors: u32,
    /// Sum of `buffer_overruns` and `queue_overruns`
    pub overruns: u32,
    pub buffer_overruns: u32,
    pub queue_overruns: u32,
    pub last_frame_ms: u64,
    pub ms_since_frame: u64,
    /// Most recent frames, oldest first; omitted in lite mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_frames: Option<Vec<RecentFrame>>,
}

impl StateSnapshot {
    pub fn build<const N: usize>(view: &LinkView<'_, N>, lite: bool) -> Self {
        let recent_frames = (!lite && view.running && !view.ring.is_empty()).then(|| {
            view.ring
                .snapshot(RECENT_FRAMES)
                .iter()
                .map(RecentFrame::from)
                .collect()
        });

        Self {
            settings: view.settings.clone(),
            started: view.running,
            rx_count: view.stats.rx_frames,
            tx_count: view.stats.tx_frames,
            errors: view.stats.bus_errors,
            overruns: view.total_overruns(),
            buffer_overruns: view.ring.overruns(),
            queue_overruns: view.stats.queue_overruns,
            last_frame_ms: view.stats.last_frame_ms.unwrap_or(0),
            ms_since_frame: view.stats.ms_since_frame(view.now_ms).unwrap_or(0),
            recent_frames,
        }
    }
}

/// Fields changed by [`apply_update`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Applied {
    pub effect: Option<UiEffect>,
    pub poll_rate: Option<PollRate>,
}

impl Applied {
    pub fn is_empty(&self) -> bool {
        self.effect.is_none() && self.poll_rate.is_none()
    }
}

fn selector(update: &Value, key: &str, current: u8) -> Option<u8> {
    let value = update.get(key)?.as_u64()?;
    (value < 3 && value != current as u64).then_some(value as u8)
}

/// Apply a partial update from the host
///
/// Only `uiEffect` and `uiPollRate` are writable, and only to a different
/// value below 3. Everything else in `update` is ignored.
pub fn apply_update(settings: &mut Settings, update: &Value) -> Applied {
    let mut applied = Applied::default();

    if let Some(effect) = selector(update, "uiEffect", settings.ui_effect) {
        settings.ui_effect = effect;
        applied.effect = UiEffect::from_u8(effect);
    }
    if let Some(rate) = selector(update, "uiPollRate", settings.ui_poll_rate) {
        settings.ui_poll_rate = rate;
        applied.poll_rate = PollRate::from_u8(rate);
    }

    applied
}
