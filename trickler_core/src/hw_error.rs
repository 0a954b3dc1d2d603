//! Maps `Box<dyn Error>` from trait boundaries to typed `TricklerError`.
//!
//! The traits in `trickler_traits` use `Box<dyn Error + Send + Sync>`; this
//! module converts those to our typed error enum, with an optional
//! feature-gated path for `trickler_hardware::HwError` downcasting.

use crate::error::TricklerError;

/// Map a trait-boundary error to a typed `TricklerError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> TricklerError {
    #[cfg(feature = "hardware-errors")]
    {
        use trickler_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::SerialOpen { .. } => TricklerError::ScaleNotReady(hw.to_string()),
                HwError::Io(io) if io.kind() == std::io::ErrorKind::TimedOut => {
                    TricklerError::Timeout
                }
                other => TricklerError::HardwareFault(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timed out") || s.to_lowercase().contains("timeout") {
        TricklerError::Timeout
    } else {
        TricklerError::Hardware(s)
    }
}

/// Convert a boxed trait-boundary error into a report carrying the typed
/// error, so callers can `downcast_ref::<TricklerError>()`.
pub fn to_report(e: trickler_traits::BoxError) -> eyre::Report {
    eyre::Report::new(map_hw_error(&*e))
}
