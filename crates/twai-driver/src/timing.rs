//! Bit Timing Resolution
//!
//! Maps a nominal bitrate to controller timing registers for an 80 MHz
//! source clock.

use serde::{Deserialize, Serialize};

/// Bitrate used when the requested one is not supported
pub const FALLBACK_BITRATE: u32 = 500_000;

/// Bitrates with a known timing configuration, fastest first
pub const SUPPORTED_BITRATES: [u32; 8] = [
    1_000_000, 800_000, 500_000, 250_000, 125_000, 100_000, 50_000, 25_000,
];

/// Controller bit timing parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Baud rate prescaler
    pub brp: u32,
    /// Time segment 1, in quanta
    pub tseg_1: u8,
    /// Time segment 2, in quanta
    pub tseg_2: u8,
    /// Synchronization jump width
    pub sjw: u8,
    /// Sample three times per bit
    pub triple_sampling: bool,
}

impl TimingConfig {
    const fn new(brp: u32, tseg_1: u8, tseg_2: u8) -> Self {
        Self {
            brp,
            tseg_1,
            tseg_2,
            sjw: 3,
            triple_sampling: false,
        }
    }

    /// Bitrate produced by these parameters with an 80 MHz clock
    pub fn bitrate(&self) -> u32 {
        let quanta = 1 + self.tseg_1 as u32 + self.tseg_2 as u32;
        80_000_000 / (self.brp * quanta)
    }
}

/// Result of resolving a bitrate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingResolution {
    /// Timing to program into the controller
    pub timing: TimingConfig,
    /// The requested bitrate was unknown and the 500 kbit/s set was used
    pub fell_back: bool,
}

/// Resolve timing parameters for a nominal bitrate. Never fails.
pub fn resolve(bitrate: u32) -> TimingResolution {
    let timing = match bitrate {
        1_000_000 => TimingConfig::new(4, 15, 4),
        800_000 => TimingConfig::new(4, 16, 8),
        500_000 => TimingConfig::new(8, 15, 4),
        250_000 => TimingConfig::new(16, 15, 4),
        125_000 => TimingConfig::new(32, 15, 4),
        100_000 => TimingConfig::new(40, 15, 4),
        50_000 => TimingConfig::new(80, 15, 4),
        25_000 => TimingConfig::new(128, 16, 8),
        _ => {
            return TimingResolution {
                timing: TimingConfig::new(8, 15, 4),
                fell_back: true,
            }
        }
    };

    TimingResolution {
        timing,
        fell_back: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_supported_bitrates_are_distinct_and_exact() {
        let mut seen = Vec::new();
        for rate in SUPPORTED_BITRATES {
            let resolved = resolve(rate);
            assert!(!resolved.fell_back, "{} should be supported", rate);
            assert_eq!(resolved.timing.bitrate(), rate);
            assert!(!seen.contains(&resolved.timing));
            seen.push(resolved.timing);
        }
    }

    #[test]
    fn test_unknown_bitrate_falls_back() {
        let resolved = resolve(333_333);
        assert!(resolved.fell_back);
        assert_eq!(resolved.timing, resolve(FALLBACK_BITRATE).timing);
        assert_eq!(resolve(0).timing.bitrate(), FALLBACK_BITRATE);
    }

    proptest! {
        #[test]
        fn prop_any_other_value_uses_fallback(rate in any::<u32>()) {
            prop_assume!(!SUPPORTED_BITRATES.contains(&rate));
            let resolved = resolve(rate);
            prop_assert!(resolved.fell_back);
            prop_assert_eq!(resolved.timing, resolve(FALLBACK_BITRATE).timing);
        }
    }
}
