use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Nominal bit rates supported by the transceiver's CAN controller. The
/// integer value is the rate in kbit/s, which is what the vendor driver
/// expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[num_enum(error_type(name = ConfigError, constructor = ConfigError::UnsupportedSpeed))]
#[repr(u16)]
pub enum CanSpeed {
    /// Transmits and receives at 100 Kbit/s
    Rate100Kbit = 100,
    /// Transmits and receives at 125 Kbit/s
    Rate125Kbit = 125,
    /// Transmits and receives at 200 Kbit/s
    Rate200Kbit = 200,
    /// Transmits and receives at 250 Kbit/s (ISOBUS / NMEA 2000 rate)
    #[default]
    Rate250Kbit = 250,
    /// Transmits and receives at 500 Kbit/s
    Rate500Kbit = 500,
    /// Transmits and receives at 800 Kbit/s
    Rate800Kbit = 800,
    /// Transmits and receives at 1 Mbit/s
    Rate1Mbit = 1000,
}

impl CanSpeed {
    pub fn kbps(self) -> u16 {
        self.into()
    }
}

/// GPIO numbers the transceiver board is wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinConfig {
    /// Drives the transceiver's mode select line. Held as a push-pull output
    /// with the pull-down disabled so the transceiver stays in normal mode.
    pub mode_pin: u8,
    /// CAN controller TX line
    pub tx_pin: u8,
    /// CAN controller RX line
    pub rx_pin: u8,
}

impl PinConfig {
    /// Wiring of the LilyGo T-CAN485 board.
    pub const T_CAN485: Self = Self {
        mode_pin: 23,
        tx_pin: 27,
        rx_pin: 26,
    };
}

impl Default for PinConfig {
    fn default() -> Self {
        Self::T_CAN485
    }
}

/// Construction-time settings for [`Tcan485Plugin`](crate::Tcan485Plugin).
/// Nothing here touches hardware until the plugin is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceConfig {
    pub speed: CanSpeed,
    pub pins: PinConfig,
}

impl DeviceConfig {
    pub fn new(speed: CanSpeed) -> Self {
        Self {
            speed,
            pins: PinConfig::default(),
        }
    }

    /// Consumes self and returns a new self with the supplied bus speed
    pub fn with_speed(mut self, speed: CanSpeed) -> Self {
        self.speed = speed;
        self
    }

    /// Consumes self and returns a new self with the supplied pin wiring
    pub fn with_pins(mut self, pins: PinConfig) -> Self {
        self.pins = pins;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    #[error("Bus speed of {0:?} kbit/s is not supported by the CAN controller")]
    UnsupportedSpeed(u16),
}
