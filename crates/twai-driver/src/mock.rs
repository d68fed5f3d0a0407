//! Simulated TWAI Controller
//!
//! Stands in for the hardware in tests and in the host simulator. Clones
//! share state, so a test can keep a handle while the driver owns another.

use crate::error::ErrorCode;
use crate::filter::FilterConfig;
use crate::hal::{Alerts, GeneralConfig, RxMessage, TwaiHal};
use crate::timing::TimingConfig;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Controller primitive invoked on the mock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalCall {
    Install,
    Start,
    Stop,
    Uninstall,
}

/// Configuration captured by the last successful install
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Installed {
    pub general: GeneralConfig,
    pub timing: TimingConfig,
    pub filter: FilterConfig,
}

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<HalCall>,
    installed: Option<Installed>,
    started: bool,
    rx_queue: VecDeque<RxMessage>,
    alerts: Alerts,
    fail_install: Option<ErrorCode>,
    fail_start: Option<ErrorCode>,
}

/// In-memory controller with a bounded RX queue and failure injection
#[derive(Debug, Clone, Default)]
pub struct MockTwai {
    state: Rc<RefCell<MockState>>,
}

impl MockTwai {
    /// Create a controller that accepts every call
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next installs fail with `code`
    pub fn fail_install(&self, code: Option<ErrorCode>) {
        self.state.borrow_mut().fail_install = code;
    }

    /// Make the next starts fail with `code`
    pub fn fail_start(&self, code: Option<ErrorCode>) {
        self.state.borrow_mut().fail_start = code;
    }

    /// Put a frame on the bus
    ///
    /// Returns true if it landed in the RX queue. Frames are lost when the
    /// controller is not started, rejected by the filter, or the queue is full
    /// (which raises the queue-full alert).
    pub fn inject(&self, msg: RxMessage) -> bool {
        let mut state = self.state.borrow_mut();
        let Some(installed) = state.installed else {
            return false;
        };
        if !state.started || !installed.filter.accepts(msg.identifier, msg.extd) {
            return false;
        }

        if state.rx_queue.len() >= installed.general.rx_queue_len as usize {
            state.alerts |= Alerts::RX_QUEUE_FULL & installed.general.alerts_enabled;
            return false;
        }

        state.rx_queue.push_back(msg);
        state.alerts |= Alerts::RX_DATA & installed.general.alerts_enabled;
        true
    }

    /// Raise alert flags (only enabled ones are latched)
    pub fn raise(&self, alerts: Alerts) {
        let mut state = self.state.borrow_mut();
        if let Some(installed) = state.installed {
            state.alerts |= alerts & installed.general.alerts_enabled;
        }
    }

    /// Controller calls made so far, in order
    pub fn calls(&self) -> Vec<HalCall> {
        self.state.borrow().calls.clone()
    }

    /// Configuration of the installed driver
    pub fn installed(&self) -> Option<Installed> {
        self.state.borrow().installed
    }

    pub fn is_installed(&self) -> bool {
        self.state.borrow().installed.is_some()
    }

    pub fn is_started(&self) -> bool {
        self.state.borrow().started
    }

    /// Messages waiting in the RX queue
    pub fn pending(&self) -> usize {
        self.state.borrow().rx_queue.len()
    }
}

impl TwaiHal for MockTwai {
    fn install(
        &mut self,
        general: &GeneralConfig,
        timing: &TimingConfig,
        filter: &FilterConfig,
    ) -> Result<(), ErrorCode> {
        let mut state = self.state.borrow_mut();
        state.calls.push(HalCall::Install);

        if state.installed.is_some() {
            return Err(ErrorCode::InvalidState);
        }
        if let Some(code) = state.fail_install {
            return Err(code);
        }

        state.installed = Some(Installed {
            general: *general,
            timing: *timing,
            filter: *filter,
        });
        state.rx_queue.clear();
        state.alerts = Alerts::NONE;
        Ok(())
    }

    fn start(&mut self) -> Result<(), ErrorCode> {
        let mut state = self.state.borrow_mut();
        state.calls.push(HalCall::Start);

        if state.installed.is_none() || state.started {
            return Err(ErrorCode::InvalidState);
        }
        if let Some(code) = state.fail_start {
            return Err(code);
        }

        state.started = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), ErrorCode> {
        let mut state = self.state.borrow_mut();
        state.calls.push(HalCall::Stop);

        if !state.started {
            return Err(ErrorCode::InvalidState);
        }
        state.started = false;
        Ok(())
    }

    fn uninstall(&mut self) -> Result<(), ErrorCode> {
        let mut state = self.state.borrow_mut();
        state.calls.push(HalCall::Uninstall);

        if state.installed.is_none() || state.started {
            return Err(ErrorCode::InvalidState);
        }
        state.installed = None;
        state.rx_queue.clear();
        Ok(())
    }

    fn receive(&mut self) -> Option<RxMessage> {
        let mut state = self.state.borrow_mut();
        if !state.started {
            return None;
        }
        state.rx_queue.pop_front()
    }

    fn read_alerts(&mut self) -> Alerts {
        std::mem::take(&mut self.state.borrow_mut().alerts)
    }
}
