//! Host Module Interface
//!
//! The host owns the scheduler and the JSON transport; it drives a module
//! through [`HostModule`]. [`CanMonitor`] is the CAN capture implementation,
//! constructed by the host's composition root.

use crate::clock::Clock;
use crate::poller::{self, PollSummary};
use crate::reconciler::{self, Outcome};
use crate::reporter::{self, LinkView, StateSnapshot, StatusSnapshot};
use crate::settings::{Settings, CONFIG_KEY};
use crate::stats::RuntimeStats;
use ring_buffer::{CapturedFrame, FrameRingBuffer};
use serde_json::{Map, Value};
use tracing::{error, info, warn};
use twai_driver::{DriverError, TwaiDriver, TwaiHal};

/// Object key used for this module in info and state documents
pub const STATE_KEY: &str = "can";

/// Key in the outbound state request asking for the lite snapshot
pub const LITE_FLAG: &str = "canLite";

/// Heading of this module on the host info page
pub const INFO_KEY: &str = "CAN Bus";

/// Operations a host invokes on a registered module
pub trait HostModule {
    /// Name used for registration and config persistence
    fn name(&self) -> &'static str;

    /// Called once at boot, after the initial config load
    fn setup(&mut self);

    /// Called once per scheduler iteration; must not block
    fn tick(&mut self);

    /// Called before the module is dropped
    fn teardown(&mut self);

    /// Add the status summary to the info document
    fn add_to_info(&self, info: &mut Map<String, Value>);

    /// Add the full (or lite) state to the state document
    fn add_to_state(&self, state: &mut Map<String, Value>, lite: bool);

    /// Apply a partial state update sent by the host
    fn read_from_state(&mut self, state: &Value);

    /// Persist settings into the config document
    fn add_to_config(&self, config: &mut Map<String, Value>);

    /// Load settings from the config document; false if any field was missing
    fn read_from_config(&mut self, config: &Value) -> bool;
}

/// CAN bus capture module
pub struct CanMonitor<H: TwaiHal, C: Clock> {
    settings: Settings,
    driver: TwaiDriver<H>,
    ring: FrameRingBuffer,
    stats: RuntimeStats,
    clock: C,
    init_done: bool,
    /// Error from the last bring-up attempt, cleared on the next reconfiguration
    last_error: Option<DriverError>,
}

impl<H: TwaiHal, C: Clock> CanMonitor<H, C> {
    /// Create a module with default settings
    pub fn new(hal: H, clock: C) -> Self {
        Self::with_settings(hal, clock, Settings::default())
    }

    /// Create a module with pre-loaded settings
    pub fn with_settings(hal: H, clock: C, mut settings: Settings) -> Self {
        settings.normalize();
        Self {
            settings,
            driver: TwaiDriver::new(hal),
            ring: FrameRingBuffer::new(),
            stats: RuntimeStats::default(),
            clock,
            init_done: false,
            last_error: None,
        }
    }

    /// Bring the controller up if enabled
    pub fn setup(&mut self) {
        info!("CAN: module setup");

        if self.settings.enabled {
            match self.driver.start(&self.settings.bus_config()) {
                Ok(()) => info!("CAN: initialization successful"),
                Err(e) => self.start_failed(e),
            }
        }

        self.init_done = true;
    }

    /// One polling pass
    pub fn tick(&mut self) -> PollSummary {
        if !self.settings.enabled {
            return PollSummary::default();
        }
        poller::poll_once(&mut self.driver, &mut self.ring, &mut self.stats, &self.clock)
    }

    /// Stop the controller and release it
    pub fn teardown(&mut self) {
        self.driver.stop();
    }

    /// Replace the settings, reprogramming the controller when needed
    ///
    /// Before `setup` the settings are only stored.
    pub fn apply_settings(&mut self, mut next: Settings) -> Outcome {
        next.normalize();
        let prev = std::mem::replace(&mut self.settings, next);
        if !self.init_done {
            return Outcome::Unchanged;
        }

        self.last_error = None;
        let outcome = reconciler::reconcile(&mut self.driver, &prev, &self.settings);
        if let Outcome::StartFailed(e) = &outcome {
            self.start_failed(e.clone());
        }
        outcome
    }

    /// Load settings from the host config document
    ///
    /// Returns whether every field was present. A missing section leaves the
    /// current settings untouched.
    pub fn load_config(&mut self, root: &Value) -> bool {
        let Some(section) = root.get(CONFIG_KEY) else {
            warn!("CAN: no {} section in config", CONFIG_KEY);
            return false;
        };

        let loaded = Settings::from_json(section);
        if !loaded.complete {
            warn!("CAN: config incomplete, defaults used for missing fields");
        }
        self.apply_settings(loaded.settings);
        loaded.complete
    }

    /// Apply a partial update from the host transport (`{"can": {...}}`)
    pub fn apply_update(&mut self, root: &Value) -> reporter::Applied {
        if !self.init_done {
            return reporter::Applied::default();
        }
        let Some(update) = root.get(STATE_KEY) else {
            return reporter::Applied::default();
        };

        let applied = reporter::apply_update(&mut self.settings, update);
        if let Some(effect) = applied.effect {
            info!("CAN: UI effect set to {}", effect.label());
        }
        if let Some(rate) = applied.poll_rate {
            info!("CAN: UI poll interval set to {:?}", rate.interval());
        }
        applied
    }

    /// Status summary for the info page
    pub fn status(&self) -> StatusSnapshot {
        StatusSnapshot::build(&self.view())
    }

    /// Full state, without recent frames when `lite`
    pub fn state(&self, lite: bool) -> StateSnapshot {
        StateSnapshot::build(&self.view(), lite)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn stats(&self) -> &RuntimeStats {
        &self.stats
    }

    /// Most recent frames, oldest first
    pub fn recent_frames(&self, max_count: usize) -> Vec<CapturedFrame> {
        self.ring.snapshot(max_count)
    }

    /// Frames overwritten in the ring buffer
    pub fn buffer_overruns(&self) -> u32 {
        self.ring.overruns()
    }

    pub fn is_running(&self) -> bool {
        self.driver.is_running()
    }

    pub fn last_error(&self) -> Option<&DriverError> {
        self.last_error.as_ref()
    }

    fn start_failed(&mut self, e: DriverError) {
        error!("CAN: initialization failed: {}", e);
        self.settings.enabled = false;
        self.last_error = Some(e);
    }

    fn view(&self) -> LinkView<'_, { ring_buffer::DEFAULT_CAPACITY }> {
        LinkView {
            settings: &self.settings,
            running: self.driver.is_running(),
            start_failed: self.last_error.is_some(),
            stats: &self.stats,
            ring: &self.ring,
            now_ms: self.clock.now_ms(),
        }
    }
}

fn to_value<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        error!("CAN: snapshot serialization failed: {}", e);
        Value::Null
    })
}

impl<H: TwaiHal, C: Clock> HostModule for CanMonitor<H, C> {
    fn name(&self) -> &'static str {
        CONFIG_KEY
    }

    fn setup(&mut self) {
        CanMonitor::setup(self);
    }

    fn tick(&mut self) {
        CanMonitor::tick(self);
    }

    fn teardown(&mut self) {
        CanMonitor::teardown(self);
    }

    fn add_to_info(&self, info: &mut Map<String, Value>) {
        info.insert(INFO_KEY.to_string(), to_value(&self.status()));
    }

    fn add_to_state(&self, state: &mut Map<String, Value>, lite: bool) {
        state.insert(STATE_KEY.to_string(), to_value(&self.state(lite)));
    }

    fn read_from_state(&mut self, state: &Value) {
        self.apply_update(state);
    }

    fn add_to_config(&self, config: &mut Map<String, Value>) {
        config.insert(CONFIG_KEY.to_string(), self.settings.to_json());
    }

    fn read_from_config(&mut self, config: &Value) -> bool {
        self.load_config(config)
    }
}

/// Whether an outbound state request asks for the lite snapshot
pub fn wants_lite(request: &Value) -> bool {
    request.get(LITE_FLAG).and_then(Value::as_bool).unwrap_or(false)
}
