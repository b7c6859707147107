#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

mod config;
mod driver;
mod frame;
mod plugin;

#[cfg(test)]
mod testing;

use embassy_time::Duration;

/// Payload capacity of a classic CAN frame, in bytes.
pub const CAN_DATA_LENGTH: usize = 8;

/// Number of native frames the receive queue can hold before the driver starts
/// dropping them.
pub const RX_QUEUE_CAPACITY: usize = 10;

/// Upper bound on how long [`CanHardwarePlugin::read_frame`] blocks waiting for a
/// frame.
pub const RX_TIMEOUT: Duration = Duration::from_millis(100);

pub use config::*;
pub use driver::*;
pub use frame::*;
pub use plugin::*;

pub use embedded_can::{ExtendedId, Id, StandardId};
