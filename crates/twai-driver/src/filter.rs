//! Acceptance Filter Construction
//!
//! Single-filter mode only. The controller compares the left-aligned
//! identifier against `acceptance_code`; bits set in `acceptance_mask` are
//! "don't care", so the user-facing "bits that matter" mask is inverted.

use serde::{Deserialize, Serialize};

/// Valid bits of a standard (11-bit) identifier
pub const STD_ID_MASK: u32 = 0x7FF;

/// Valid bits of an extended (29-bit) identifier
pub const EXT_ID_MASK: u32 = 0x1FFF_FFFF;

const STD_ID_SHIFT: u32 = 21;
const EXT_ID_SHIFT: u32 = 3;

/// Identifier width mask for the given frame format
pub fn id_mask(extended: bool) -> u32 {
    if extended {
        EXT_ID_MASK
    } else {
        STD_ID_MASK
    }
}

fn id_shift(extended: bool) -> u32 {
    if extended {
        EXT_ID_SHIFT
    } else {
        STD_ID_SHIFT
    }
}

/// Controller acceptance filter registers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub acceptance_code: u32,
    pub acceptance_mask: u32,
    pub single_filter: bool,
}

impl FilterConfig {
    /// Filter that lets every frame through
    pub const fn accept_all() -> Self {
        Self {
            acceptance_code: 0,
            acceptance_mask: u32::MAX,
            single_filter: true,
        }
    }

    /// Build the filter for an ID/mask pair
    ///
    /// `mask` has 1 bits for identifier bits that must match `id`. Both are
    /// truncated to the identifier width before shifting.
    pub fn build(enabled: bool, extended: bool, id: u32, mask: u32) -> Self {
        if !enabled {
            return Self::accept_all();
        }

        let width = id_mask(extended);
        let shift = id_shift(extended);

        Self {
            acceptance_code: (id & width) << shift,
            acceptance_mask: !((mask & width) << shift),
            single_filter: true,
        }
    }

    /// Whether a frame with this identifier passes the filter
    pub fn accepts(&self, id: u32, extended: bool) -> bool {
        let aligned = (id & id_mask(extended)) << id_shift(extended);
        (aligned ^ self.acceptance_code) & !self.acceptance_mask == 0
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self::accept_all()
    }
}
