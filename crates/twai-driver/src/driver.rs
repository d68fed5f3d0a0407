//! Driver Lifecycle
//!
//! Owns install/start/stop of the controller. Every failure path releases
//! whatever was acquired, so the controller is either fully running or fully
//! uninstalled.

use crate::error::DriverError;
use crate::filter::FilterConfig;
use crate::hal::{clamp_queue_len, Alerts, GeneralConfig, Mode, RxMessage, TwaiHal, DEFAULT_TX_QUEUE_LEN};
use crate::timing;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

/// Everything the controller needs to come up
///
/// Two configurations that compare equal produce identical hardware state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusConfig {
    /// RX GPIO, negative when unset
    pub rx_pin: i8,
    /// TX GPIO, negative when unset
    pub tx_pin: i8,
    /// Nominal bitrate in bit/s
    pub bitrate: u32,
    /// Receive-only operation
    pub listen_only: bool,
    /// Requested RX queue depth (clamped at start)
    pub rx_queue_len: u16,
    pub filter_enabled: bool,
    pub filter_ext: bool,
    pub filter_id: u32,
    pub filter_mask: u32,
}

impl BusConfig {
    /// Controller mode for this configuration
    pub fn mode(&self) -> Mode {
        if self.listen_only {
            Mode::ListenOnly
        } else {
            Mode::Normal
        }
    }

    /// Acceptance filter for this configuration
    pub fn filter(&self) -> FilterConfig {
        FilterConfig::build(self.filter_enabled, self.filter_ext, self.filter_id, self.filter_mask)
    }

    fn general(&self) -> Result<GeneralConfig, DriverError> {
        if self.rx_pin < 0 || self.tx_pin < 0 {
            return Err(DriverError::InvalidPins {
                rx: self.rx_pin,
                tx: self.tx_pin,
            });
        }

        Ok(GeneralConfig {
            mode: self.mode(),
            tx_pin: self.tx_pin as u8,
            rx_pin: self.rx_pin as u8,
            tx_queue_len: DEFAULT_TX_QUEUE_LEN,
            rx_queue_len: clamp_queue_len(self.rx_queue_len),
            alerts_enabled: Alerts::MONITORED,
        })
    }
}

/// Lifecycle owner for a TWAI controller
pub struct TwaiDriver<H: TwaiHal> {
    hal: H,
    /// Configuration the controller is currently running with
    active: Option<BusConfig>,
}

impl<H: TwaiHal> TwaiDriver<H> {
    /// Wrap a controller; nothing is installed yet
    pub fn new(hal: H) -> Self {
        Self { hal, active: None }
    }

    /// Install and start the controller, restarting it if already running
    ///
    /// Invalid pins are rejected before any controller call is made.
    pub fn start(&mut self, config: &BusConfig) -> Result<(), DriverError> {
        if self.is_running() {
            self.stop();
        }

        let general = config.general().map_err(|e| {
            error!("CAN: {}", e);
            e
        })?;

        let resolved = timing::resolve(config.bitrate);
        if resolved.fell_back {
            warn!(
                "CAN: Invalid bitrate {}, using {}kbps",
                config.bitrate,
                timing::FALLBACK_BITRATE / 1000
            );
        }
        let filter = config.filter();

        debug!(
            "CAN: installing driver mode={:?} rx_queue={} timing={:?} filter={:?}",
            general.mode, general.rx_queue_len, resolved.timing, filter
        );

        if let Err(code) = self.hal.install(&general, &resolved.timing, &filter) {
            let err = DriverError::Install(code);
            error!("CAN: {}", err);
            return Err(err);
        }

        if let Err(code) = self.hal.start() {
            let err = DriverError::Start(code);
            error!("CAN: {}", err);
            if let Err(code) = self.hal.uninstall() {
                warn!("CAN: uninstall after failed start returned {}", code);
            }
            return Err(err);
        }

        self.active = Some(*config);
        info!(
            "CAN: TWAI driver started ({} kbps, {})",
            resolved.timing.bitrate() / 1000,
            general.mode.label()
        );
        Ok(())
    }

    /// Halt the controller and release its resources. No-op when not running.
    pub fn stop(&mut self) {
        if self.active.take().is_none() {
            return;
        }

        if let Err(code) = self.hal.stop() {
            warn!("CAN: stop returned {}", code);
        }
        if let Err(code) = self.hal.uninstall() {
            warn!("CAN: uninstall returned {}", code);
        }
        info!("CAN: TWAI driver stopped");
    }

    /// Whether the controller is installed and started
    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Configuration of the running controller
    pub fn active_config(&self) -> Option<&BusConfig> {
        self.active.as_ref()
    }

    /// Read pending alerts (zero wait). Empty when not running.
    pub fn read_alerts(&mut self) -> Alerts {
        if !self.is_running() {
            return Alerts::NONE;
        }
        self.hal.read_alerts()
    }

    /// Receive one queued message (zero wait). `None` when not running.
    pub fn receive(&mut self) -> Option<RxMessage> {
        if !self.is_running() {
            return None;
        }
        self.hal.receive()
    }
}

impl<H: TwaiHal> Drop for TwaiDriver<H> {
    fn drop(&mut self) {
        self.stop();
    }
}
