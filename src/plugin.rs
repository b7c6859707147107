use embassy_time::Instant;

use crate::{
    CanDriver, CanMessageFrame, DeviceConfig, DriverConfig, DriverFrame, DriverStatus,
    FrameRejection, RxQueue, RX_TIMEOUT,
};

/// Capabilities the protocol stack expects from any CAN hardware plugin.
///
/// Every operation reports failure as a plain `false`; the cause only shows up
/// in the log.
pub trait CanHardwarePlugin {
    /// Whether the plugin is usable.
    fn is_valid(&self) -> bool;

    fn open(&mut self);

    fn close(&mut self);

    /// Reads one frame from the hardware (synchronous). Returns `true` and
    /// overwrites `frame` if a frame was read, otherwise returns `false` and
    /// leaves `frame` alone.
    fn read_frame(&mut self, frame: &mut CanMessageFrame) -> bool;

    /// Writes a frame to the bus (synchronous). Returns `true` if the frame was
    /// accepted by the hardware.
    fn write_frame(&mut self, frame: &CanMessageFrame) -> bool;
}

/// Plugin for the LilyGo T-CAN485 board: an ESP32 CAN controller behind a
/// transceiver whose mode select line must be driven to enter normal mode.
///
/// The plugin owns no frame buffer. Received frames sit in the borrowed
/// [`RxQueue`] until [`read_frame`](CanHardwarePlugin::read_frame) picks them
/// up.
///
/// Dropping the plugin stops the driver.
pub struct Tcan485Plugin<'q, D: CanDriver<'q>> {
    driver: D,
    rx_queue: &'q RxQueue,
    config: DeviceConfig,
    initialized: bool,
}

impl<'q, D: CanDriver<'q>> Tcan485Plugin<'q, D> {
    /// Creates a plugin with the default configuration (250 kbit/s, board
    /// wiring). Does not touch the hardware.
    pub fn new(driver: D, rx_queue: &'q RxQueue) -> Self {
        Self::with_config(driver, rx_queue, DeviceConfig::default())
    }

    /// Creates a plugin that will apply `config` when opened. Does not touch
    /// the hardware.
    pub fn with_config(driver: D, rx_queue: &'q RxQueue, config: DeviceConfig) -> Self {
        Self {
            driver,
            rx_queue,
            config,
            initialized: false,
        }
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Whether the last [`try_open`](Self::try_open) succeeded and the plugin
    /// has not been closed since.
    ///
    /// Unlike [`is_valid`](CanHardwarePlugin::is_valid) this reflects the
    /// actual driver state.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Puts the transceiver in normal mode and starts the CAN driver.
    ///
    /// Does nothing if the plugin is already initialized.
    pub fn try_open(&mut self) -> Result<(), OpenError> {
        if self.initialized {
            debug!("[TCAN485] Already open, skipping driver init");
            return Ok(());
        }

        let mode_pin = self.config.pins.mode_pin;
        self.driver.set_pin_output(mode_pin);
        self.driver.disable_pin_pulldown(mode_pin);

        // Frames left over from a previous session are stale
        while self.rx_queue.try_receive().is_ok() {}

        let driver_config = DriverConfig::new(&self.config, self.rx_queue);

        DriverStatus::check(self.driver.init(&driver_config)).map_err(|status| {
            error!("[TCAN485] Error initializing CAN driver: {}", status);
            OpenError::Driver(status)
        })?;

        self.initialized = true;

        debug!(
            "[TCAN485] Opened at {} kbit/s (tx: {}, rx: {})",
            self.config.speed.kbps(),
            driver_config.tx_pin,
            driver_config.rx_pin
        );

        Ok(())
    }

    /// Waits up to [`RX_TIMEOUT`] for a frame and translates it.
    ///
    /// Remote frames are rejected without being logged. Frames declaring more
    /// than 8 data bytes are rejected and logged.
    pub fn try_read_frame(&mut self) -> Result<CanMessageFrame, ReadError> {
        let native = self.receive_native().ok_or(ReadError::Timeout)?;

        CanMessageFrame::try_from(&native).map_err(|rejection| {
            if rejection != FrameRejection::RemoteFrame {
                error!("[TCAN485] Error receiving message: {}", rejection);
            }

            ReadError::Rejected(rejection)
        })
    }

    pub fn try_write_frame(&mut self, frame: &CanMessageFrame) -> Result<(), WriteError> {
        let native = DriverFrame::from(frame);

        DriverStatus::check(self.driver.write_frame(&native)).map_err(|status| {
            error!("[TCAN485] Error sending message: {}", status);
            WriteError::Driver(status)
        })
    }

    fn receive_native(&self) -> Option<DriverFrame> {
        let deadline = Instant::now() + RX_TIMEOUT;

        loop {
            if let Ok(frame) = self.rx_queue.try_receive() {
                return Some(frame);
            }

            if Instant::now() >= deadline {
                return None;
            }

            core::hint::spin_loop();
        }
    }
}

impl<'q, D: CanDriver<'q>> CanHardwarePlugin for Tcan485Plugin<'q, D> {
    /// Always `true`: a constructed plugin is considered valid whether or not
    /// the hardware came up. See [`Tcan485Plugin::is_initialized`].
    fn is_valid(&self) -> bool {
        true
    }

    /// Same as [`Tcan485Plugin::try_open`] with the error only logged.
    fn open(&mut self) {
        let _ = self.try_open();
    }

    fn close(&mut self) {
        if let Err(status) = DriverStatus::check(self.driver.stop()) {
            warn!("[TCAN485] Error stopping CAN driver: {}", status);
        }

        self.initialized = false;
    }

    fn read_frame(&mut self, frame: &mut CanMessageFrame) -> bool {
        match self.try_read_frame() {
            Ok(received) => {
                *frame = received;
                true
            }
            Err(_) => false,
        }
    }

    fn write_frame(&mut self, frame: &CanMessageFrame) -> bool {
        self.try_write_frame(frame).is_ok()
    }
}

impl<'q, D: CanDriver<'q>> Drop for Tcan485Plugin<'q, D> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<'q, D: CanDriver<'q>> embedded_can::blocking::Can for Tcan485Plugin<'q, D> {
    type Frame = CanMessageFrame;
    type Error = Error;

    fn transmit(&mut self, frame: &Self::Frame) -> Result<(), Self::Error> {
        Ok(self.try_write_frame(frame)?)
    }

    /// Blocks until a data frame arrives. Timeouts and remote frames are
    /// skipped; any other rejection is returned.
    fn receive(&mut self) -> Result<Self::Frame, Self::Error> {
        loop {
            match self.try_read_frame() {
                Ok(frame) => return Ok(frame),
                Err(ReadError::Timeout | ReadError::Rejected(FrameRejection::RemoteFrame)) => {}
                Err(err) => return Err(err.into()),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OpenError {
    #[error("CAN driver failed to initialize ({0})")]
    Driver(DriverStatus),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReadError {
    #[error("No frame was received before the timeout")]
    Timeout,
    #[error("Received frame was dropped")]
    Rejected(#[from] FrameRejection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WriteError {
    #[error("CAN driver refused the frame ({0})")]
    Driver(DriverStatus),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    #[error("Failed to open the plugin")]
    Open(#[from] OpenError),
    #[error("Failed to read a frame")]
    Read(#[from] ReadError),
    #[error("Failed to write a frame")]
    Write(#[from] WriteError),
}

impl embedded_can::Error for Error {
    fn kind(&self) -> embedded_can::ErrorKind {
        // The driver's status codes carry no bus error detail
        embedded_can::ErrorKind::Other
    }
}
