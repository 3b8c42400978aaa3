//! Maps `Box<dyn Error>` from trait boundaries to typed `PickError`.
//!
//! The traits in `clawpick_traits` use `Box<dyn Error + Send + Sync>` so any
//! backend can plug in; this module converts those to our typed error enum,
//! with an optional feature-gated path for `clawpick_hardware::HwError`.

use crate::error::PickError;

/// Map a trait-boundary error to a typed `PickError`.
///
/// Known hardware error types are downcast first, then string heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> PickError {
    if let Some(pe) = e.downcast_ref::<PickError>() {
        return pe.clone();
    }

    #[cfg(feature = "hardware-errors")]
    {
        use clawpick_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::NotOpen => PickError::LinkClosed,
                HwError::Io(io) => PickError::Io(io.to_string()),
                other => PickError::Hardware(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("not open") {
        PickError::LinkClosed
    } else {
        PickError::Hardware(s)
    }
}
