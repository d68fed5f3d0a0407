//! Capture Settings
//!
//! Host-persisted configuration. Loading is field-by-field: anything missing
//! or mistyped falls back to its default and marks the load incomplete.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use twai_driver::{clamp_queue_len, filter::id_mask, BusConfig};

/// Object key the settings are persisted under
pub const CONFIG_KEY: &str = "CAN_TWAI";

/// How often the host UI refreshes its view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollRate {
    /// 1 Hz
    Slow = 0,
    /// 2 Hz
    Normal = 1,
    /// 5 Hz
    Fast = 2,
}

impl PollRate {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(PollRate::Slow),
            1 => Some(PollRate::Normal),
            2 => Some(PollRate::Fast),
            _ => None,
        }
    }

    /// Refresh interval for this class
    pub fn interval(&self) -> Duration {
        match self {
            PollRate::Slow => Duration::from_millis(1000),
            PollRate::Normal => Duration::from_millis(500),
            PollRate::Fast => Duration::from_millis(200),
        }
    }
}

/// Visual effect driven by bus data. Placeholder: no effect is wired up yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiEffect {
    None = 0,
    RpmPulse = 1,
    SpeedSweep = 2,
}

impl UiEffect {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(UiEffect::None),
            1 => Some(UiEffect::RpmPulse),
            2 => Some(UiEffect::SpeedSweep),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            UiEffect::None => "None",
            UiEffect::RpmPulse => "RPM Pulse",
            UiEffect::SpeedSweep => "Speed Sweep",
        }
    }
}

/// Capture configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub enabled: bool,
    /// Nominal bitrate in bit/s
    pub bitrate: u32,
    /// RX GPIO (connects to CRX on the transceiver), negative when unset
    pub rx_pin: i8,
    /// TX GPIO (connects to CTX on the transceiver), negative when unset
    pub tx_pin: i8,
    /// Receive only; never drives the bus
    pub listen_only: bool,
    /// Controller RX queue depth (8-256)
    pub rx_queue_len: u16,
    pub filter_enabled: bool,
    /// Filter matches 29-bit identifiers
    pub filter_ext: bool,
    pub filter_id: u32,
    /// Identifier bits that must match `filter_id`
    pub filter_mask: u32,
    /// UI refresh class, see [`PollRate`]
    pub ui_poll_rate: u8,
    /// UI effect selector, see [`UiEffect`]
    pub ui_effect: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: false,
            bitrate: 500_000,
            rx_pin: 4,
            tx_pin: 5,
            listen_only: true,
            rx_queue_len: 128,
            filter_enabled: false,
            filter_ext: false,
            filter_id: 0,
            filter_mask: 0x7FF,
            ui_poll_rate: PollRate::Fast as u8,
            ui_effect: UiEffect::None as u8,
        }
    }
}

/// Settings read from the host config store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loaded {
    pub settings: Settings,
    /// Every field was present and well-typed
    pub complete: bool,
}

fn field<T: DeserializeOwned>(section: &Value, key: &str, default: T, complete: &mut bool) -> T {
    match section.get(key).map(T::deserialize) {
        Some(Ok(value)) => value,
        _ => {
            *complete = false;
            default
        }
    }
}

impl Settings {
    /// Read settings from a persisted config section
    pub fn from_json(section: &Value) -> Loaded {
        let d = Settings::default();
        let mut complete = true;
        let c = &mut complete;

        let mut settings = Settings {
            enabled: field(section, "enabled", d.enabled, c),
            bitrate: field(section, "bitrate", d.bitrate, c),
            rx_pin: field(section, "rxPin", d.rx_pin, c),
            tx_pin: field(section, "txPin", d.tx_pin, c),
            listen_only: field(section, "listenOnly", d.listen_only, c),
            ui_poll_rate: field(section, "uiPollRate", d.ui_poll_rate, c),
            ui_effect: field(section, "uiEffect", d.ui_effect, c),
            rx_queue_len: field(section, "rxQueueLen", d.rx_queue_len, c),
            filter_enabled: field(section, "filterEnabled", d.filter_enabled, c),
            filter_ext: field(section, "filterExt", d.filter_ext, c),
            filter_id: field(section, "filterId", d.filter_id, c),
            filter_mask: field(section, "filterMask", d.filter_mask, c),
        };
        settings.normalize();

        Loaded { settings, complete }
    }

    /// Serialize for the host config store
    pub fn to_json(&self) -> Value {
        json!({
            "enabled": self.enabled,
            "bitrate": self.bitrate,
            "rxPin": self.rx_pin,
            "txPin": self.tx_pin,
            "listenOnly": self.listen_only,
            "uiPollRate": self.ui_poll_rate,
            "uiEffect": self.ui_effect,
            "rxQueueLen": self.rx_queue_len,
            "filterEnabled": self.filter_enabled,
            "filterExt": self.filter_ext,
            "filterId": self.filter_id,
            "filterMask": self.filter_mask,
        })
    }

    /// Bring values into their valid ranges
    ///
    /// Filter ID and mask are cut to the identifier width; an all-zero mask
    /// is widened to the full width.
    pub fn normalize(&mut self) {
        self.rx_queue_len = clamp_queue_len(self.rx_queue_len);

        let width = id_mask(self.filter_ext);
        self.filter_id &= width;
        self.filter_mask &= width;
        if self.filter_mask == 0 {
            self.filter_mask = width;
        }

        if PollRate::from_u8(self.ui_poll_rate).is_none() {
            self.ui_poll_rate = Settings::default().ui_poll_rate;
        }
        if UiEffect::from_u8(self.ui_effect).is_none() {
            self.ui_effect = Settings::default().ui_effect;
        }
    }

    /// Controller configuration; the fields a restart depends on
    pub fn bus_config(&self) -> BusConfig {
        BusConfig {
            rx_pin: self.rx_pin,
            tx_pin: self.tx_pin,
            bitrate: self.bitrate,
            listen_only: self.listen_only,
            rx_queue_len: self.rx_queue_len,
            filter_enabled: self.filter_enabled,
            filter_ext: self.filter_ext,
            filter_id: self.filter_id,
            filter_mask: self.filter_mask,
        }
    }

    pub fn poll_rate(&self) -> PollRate {
        PollRate::from_u8(self.ui_poll_rate).unwrap_or(PollRate::Fast)
    }
}

/// Help text shown next to fields on the host settings page
pub fn config_hints() -> &'static [(&'static str, &'static str)] {
    &[
        ("bitrate", "Common: 125k, 250k, 500k, 1000k"),
        ("rxPin", "RX pin connects to CRX on transceiver"),
        ("txPin", "TX pin connects to CTX on transceiver"),
        ("listenOnly", "Listen-only = receive only (safer)"),
        ("rxQueueLen", "RX queue length (8-256). Higher reduces overruns"),
        ("filterEnabled", "Enable ID filter to reduce bus load"),
        ("filterId", "Filter ID (decimal). Use with mask"),
        ("filterMask", "Filter mask (decimal). 0x7FF for full STD mask"),
        ("filterExt", "Filter for extended (29-bit) IDs"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_section_uses_defaults() {
        let loaded = Settings::from_json(&json!({}));
        assert!(!loaded.complete);
        assert_eq!(loaded.settings, Settings::default());
    }

    #[test]
    fn test_round_trip_is_complete() {
        let settings = Settings {
            enabled: true,
            bitrate: 250_000,
            filter_enabled: true,
            filter_id: 0x123,
            ..Default::default()
        };

        let loaded = Settings::from_json(&settings.to_json());
        assert!(loaded.complete);
        assert_eq!(loaded.settings, settings);
    }

    #[test]
    fn test_mistyped_field_falls_back() {
        let mut section = Settings::default().to_json();
        section["rxPin"] = json!(300);
        section["bitrate"] = json!("fast");

        let loaded = Settings::from_json(&section);
        assert!(!loaded.complete);
        assert_eq!(loaded.settings.rx_pin, 4);
        assert_eq!(loaded.settings.bitrate, 500_000);
    }

    #[test]
    fn test_zero_mask_widened_to_full_range() {
        let mut standard = Settings {
            filter_mask: 0x800, // outside 11 bits, masks to zero
            ..Default::default()
        };
        standard.normalize();
        assert_eq!(standard.filter_mask, 0x7FF);

        let mut extended = Settings {
            filter_ext: true,
            filter_mask: 0,
            filter_id: 0xFFFF_FFFF,
            ..Default::default()
        };
        extended.normalize();
        assert_eq!(extended.filter_mask, 0x1FFF_FFFF);
        assert_eq!(extended.filter_id, 0x1FFF_FFFF);
    }

    #[test]
    fn test_queue_len_clamped_on_load() {
        let loaded = Settings::from_json(&json!({ "rxQueueLen": 2 }));
        assert_eq!(loaded.settings.rx_queue_len, 8);
    }

    #[test]
    fn test_poll_rate_intervals() {
        assert_eq!(PollRate::Slow.interval(), Duration::from_secs(1));
        assert_eq!(Settings::default().poll_rate(), PollRate::Fast);
        assert_eq!(PollRate::from_u8(3), None);
    }

    #[test]
    fn test_serde_names_match_store_keys() {
        let value = serde_json::to_value(Settings::default()).unwrap();
        assert_eq!(value, Settings::default().to_json());
    }

    #[test]
    fn test_hints_cover_bus_fields() {
        let stored = Settings::default().to_json();
        let hints = config_hints();

        assert_eq!(hints.len(), 9);
        for (key, text) in hints {
            assert!(stored.get(key).is_some(), "{} is not a stored field", key);
            assert!(!text.is_empty());
        }
        assert!(hints.iter().any(|(key, _)| *key == "rxQueueLen"));
    }
}
