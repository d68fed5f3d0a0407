//! Configuration Reconciliation
//!
//! Moves the controller from the previous settings to the incoming ones with
//! the fewest hardware transitions. UI-only fields never touch the hardware.

use crate::settings::Settings;
use tracing::{debug, info};
use twai_driver::{DriverError, TwaiDriver, TwaiHal};

/// Hardware transition performed by [`reconcile`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Controller left as it was
    Unchanged,
    /// Controller brought up from stopped
    Started,
    /// Controller stopped and brought up with the new configuration
    Restarted,
    /// Controller stopped
    Stopped,
    /// Bring-up failed; the controller is stopped
    StartFailed(DriverError),
}

/// Whether moving from `prev` to `next` requires reprogramming the controller
///
/// Both inputs are expected to be normalized.
pub fn needs_restart(prev: &Settings, next: &Settings) -> bool {
    prev.bus_config() != next.bus_config()
}

/// Apply `next` to the controller, given it was configured from `prev`
pub fn reconcile<H: TwaiHal>(driver: &mut TwaiDriver<H>, prev: &Settings, next: &Settings) -> Outcome {
    let restart = needs_restart(prev, next);
    let was_running = driver.is_running();
    debug!(
        "CAN: reconcile restart={} running={} enabled={}",
        restart, was_running, next.enabled
    );

    if restart && was_running {
        driver.stop();
    }

    if next.enabled && (!driver.is_running() || restart) {
        return match driver.start(&next.bus_config()) {
            Ok(()) if was_running => {
                info!("CAN: configuration changed, driver restarted");
                Outcome::Restarted
            }
            Ok(()) => Outcome::Started,
            Err(e) => Outcome::StartFailed(e),
        };
    }

    if !next.enabled && driver.is_running() {
        driver.stop();
        return Outcome::Stopped;
    }

    if was_running && !driver.is_running() {
        Outcome::Stopped
    } else {
        Outcome::Unchanged
    }
}
