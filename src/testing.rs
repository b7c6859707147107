//! In-memory stand-in for the vendor CAN driver.
use std::{cell::RefCell, rc::Rc, vec::Vec};

use crate::{CanDriver, CanSpeed, DriverConfig, DriverFrame, RxQueue};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DriverCall {
    SetPinOutput(u8),
    DisablePinPulldown(u8),
    Init {
        speed: CanSpeed,
        tx_pin: u8,
        rx_pin: u8,
    },
    Stop,
    WriteFrame(DriverFrame),
}

/// Every call the plugin made into the driver, in order. Shared so it can
/// still be inspected after the plugin has been dropped.
pub(crate) type CallLog = Rc<RefCell<Vec<DriverCall>>>;

pub(crate) struct MockDriver<'q> {
    calls: CallLog,
    init_status: i32,
    stop_status: i32,
    write_status: i32,
    loopback: bool,
    rx_queue: Option<&'q RxQueue>,
}

impl<'q> MockDriver<'q> {
    pub(crate) fn new() -> (Self, CallLog) {
        let calls = CallLog::default();

        let driver = Self {
            calls: calls.clone(),
            init_status: 0,
            stop_status: 0,
            write_status: 0,
            loopback: false,
            rx_queue: None,
        };

        (driver, calls)
    }

    pub(crate) fn with_init_status(mut self, status: i32) -> Self {
        self.init_status = status;
        self
    }

    pub(crate) fn with_stop_status(mut self, status: i32) -> Self {
        self.stop_status = status;
        self
    }

    pub(crate) fn with_write_status(mut self, status: i32) -> Self {
        self.write_status = status;
        self
    }

    /// Successfully written frames are fed straight back into the receive
    /// queue, like the controller's self-reception mode.
    pub(crate) fn with_loopback(mut self) -> Self {
        self.loopback = true;
        self
    }

    fn record(&self, call: DriverCall) {
        self.calls.borrow_mut().push(call);
    }
}

impl<'q> CanDriver<'q> for MockDriver<'q> {
    fn set_pin_output(&mut self, pin: u8) {
        self.record(DriverCall::SetPinOutput(pin));
    }

    fn disable_pin_pulldown(&mut self, pin: u8) {
        self.record(DriverCall::DisablePinPulldown(pin));
    }

    fn init(&mut self, config: &DriverConfig<'q>) -> i32 {
        self.record(DriverCall::Init {
            speed: config.speed,
            tx_pin: config.tx_pin,
            rx_pin: config.rx_pin,
        });

        if self.init_status == 0 {
            self.rx_queue = Some(config.rx_queue);
        }

        self.init_status
    }

    fn stop(&mut self) -> i32 {
        self.record(DriverCall::Stop);
        self.rx_queue = None;
        self.stop_status
    }

    fn write_frame(&mut self, frame: &DriverFrame) -> i32 {
        self.record(DriverCall::WriteFrame(*frame));

        if self.write_status == 0 && self.loopback {
            if let Some(rx_queue) = self.rx_queue {
                // A full queue drops the frame, same as the hardware
                let _ = rx_queue.try_send(*frame);
            }
        }

        self.write_status
    }
}
