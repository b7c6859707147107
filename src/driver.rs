//! The vendor side of the adapter: the driver's native frame layout and the
//! entry points the CAN controller driver exposes.
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel};
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::{CanSpeed, DeviceConfig, CAN_DATA_LENGTH, RX_QUEUE_CAPACITY};

/// Queue of received native frames. The driver's receive interrupt pushes into
/// it and the plugin pops from it; the plugin never buffers frames itself.
pub type RxQueue = Channel<CriticalSectionRawMutex, DriverFrame, RX_QUEUE_CAPACITY>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[num_enum(error_type(name = FrameConversionError, constructor = FrameConversionError::InvalidFrameFormat))]
#[repr(u8)]
pub enum FrameFormat {
    #[default]
    Standard = 0,
    Extended = 1,
}

/// The frame information register word (FIR) attached to every native frame.
///
/// | bits   | field                 |
/// |--------|-----------------------|
/// | 0..=3  | data length code      |
/// | 4..=5  | unused                |
/// | 6      | remote request (RTR)  |
/// | 7      | frame format          |
/// | 8..=31 | reserved              |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameInfo(u32);

impl FrameInfo {
    const DLC_MASK: u32 = 0x0F;
    const RTR_BIT: u32 = 1 << 6;
    const FORMAT_SHIFT: u32 = 7;

    pub fn new(format: FrameFormat, rtr: bool, dlc: u8) -> Self {
        let mut raw = (dlc as u32) & Self::DLC_MASK;

        if rtr {
            raw |= Self::RTR_BIT;
        }

        raw |= (u8::from(format) as u32) << Self::FORMAT_SHIFT;

        Self(raw)
    }

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    /// The declared data length code. Can be anything in 0..=15 since it comes
    /// straight off the wire.
    pub fn dlc(self) -> u8 {
        (self.0 & Self::DLC_MASK) as u8
    }

    pub fn is_remote(self) -> bool {
        self.0 & Self::RTR_BIT != 0
    }

    pub fn format(self) -> FrameFormat {
        // A single bit can only ever be 0 or 1
        if (self.0 >> Self::FORMAT_SHIFT) & 1 == 0 {
            FrameFormat::Standard
        } else {
            FrameFormat::Extended
        }
    }
}

/// A CAN frame as the vendor driver stores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DriverFrame {
    pub info: FrameInfo,
    /// Raw 11 or 29 bit message identifier
    pub msg_id: u32,
    pub data: [u8; CAN_DATA_LENGTH],
}

impl DriverFrame {
    /// Creates a data frame from raw parts. Only the first `dlc` bytes of
    /// `data` are meaningful to the controller.
    pub fn new(format: FrameFormat, msg_id: u32, dlc: u8, data: [u8; CAN_DATA_LENGTH]) -> Self {
        Self {
            info: FrameInfo::new(format, false, dlc),
            msg_id,
            data,
        }
    }

    pub fn new_remote(format: FrameFormat, msg_id: u32, dlc: u8) -> Self {
        Self {
            info: FrameInfo::new(format, true, dlc),
            msg_id,
            data: [0; CAN_DATA_LENGTH],
        }
    }
}

/// Settings handed to the driver's init entry point. Mirrors the device record
/// the vendor driver keeps: bus speed, the two controller pins and the queue
/// its receive path should fill.
#[derive(Clone, Copy)]
pub struct DriverConfig<'q> {
    pub speed: CanSpeed,
    pub tx_pin: u8,
    pub rx_pin: u8,
    pub rx_queue: &'q RxQueue,
}

impl<'q> DriverConfig<'q> {
    pub fn new(config: &DeviceConfig, rx_queue: &'q RxQueue) -> Self {
        Self {
            speed: config.speed,
            tx_pin: config.pins.tx_pin,
            rx_pin: config.pins.rx_pin,
            rx_queue,
        }
    }
}

impl core::fmt::Debug for DriverConfig<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DriverConfig")
            .field("speed", &self.speed)
            .field("tx_pin", &self.tx_pin)
            .field("rx_pin", &self.rx_pin)
            .finish_non_exhaustive()
    }
}

/// Entry points of the vendor CAN controller driver and the GPIO block the
/// transceiver hangs off.
///
/// Status codes follow the vendor convention: `0` is success, anything else is
/// a failure whose meaning is driver specific.
pub trait CanDriver<'q> {
    /// Switches `pin` to a push-pull output.
    fn set_pin_output(&mut self, pin: u8);

    fn disable_pin_pulldown(&mut self, pin: u8);

    /// Starts the controller. From here on the driver's receive path pushes
    /// every frame it takes off the bus into `config.rx_queue`.
    fn init(&mut self, config: &DriverConfig<'q>) -> i32;

    fn stop(&mut self) -> i32;

    /// Queues `frame` for transmission.
    fn write_frame(&mut self, frame: &DriverFrame) -> i32;
}

/// Non-zero status code reported by the vendor driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DriverStatus(pub i32);

impl DriverStatus {
    pub const OK: i32 = 0;

    pub fn check(code: i32) -> Result<(), Self> {
        if code == Self::OK {
            Ok(())
        } else {
            Err(Self(code))
        }
    }
}

impl core::fmt::Display for DriverStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "driver status {}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameConversionError {
    #[error("Tried to decode frame format but it was invalid ({0:?})")]
    InvalidFrameFormat(u8),
}
