//! Hardware backends for the pick controller.
//!
//! The simulated robot is always available; the UART link to the real
//! microcontroller is compiled in with the `hardware` feature.
pub mod error;
pub mod sim;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod uart;
pub mod util;

pub use sim::{RangingMode, SimObject, SimParams, SimWorld, VirtualClock};
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub use uart::UartLink;
