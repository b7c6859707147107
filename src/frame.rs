use embedded_can::{ExtendedId, Frame, Id, StandardId};

use crate::{DriverFrame, FrameFormat, CAN_DATA_LENGTH};

/// A classic CAN data frame as the protocol stack sees it.
///
/// The payload always lives in a fixed 8 byte buffer; bytes past
/// [`data_length`](Self::data_length) are zero for frames produced by this
/// crate.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CanMessageFrame {
    #[cfg_attr(feature = "defmt", defmt(Debug2Format))]
    id: Id,
    data_length: usize,
    data: [u8; CAN_DATA_LENGTH],
}

impl Default for CanMessageFrame {
    fn default() -> Self {
        Self {
            id: Id::Standard(StandardId::ZERO),
            data_length: 0,
            data: [0; CAN_DATA_LENGTH],
        }
    }
}

impl CanMessageFrame {
    /// Creates a new data frame. `data` must have a length in the range 0..=8
    /// or else `None` will be returned instead.
    pub fn new_data(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        if data.len() > CAN_DATA_LENGTH {
            return None;
        }

        let mut copy = [0u8; CAN_DATA_LENGTH];
        copy[..data.len()].copy_from_slice(data);

        Some(Self {
            id: id.into(),
            data_length: data.len(),
            data: copy,
        })
    }

    /// Gets the message ID of the frame
    pub fn id(&self) -> Id {
        self.id
    }

    /// The raw 11 or 29 bit identifier
    pub fn identifier(&self) -> u32 {
        match self.id {
            Id::Standard(id) => id.as_raw() as u32,
            Id::Extended(id) => id.as_raw(),
        }
    }

    pub fn is_extended_frame(&self) -> bool {
        matches!(self.id, Id::Extended(_))
    }

    /// Number of valid payload bytes (0..=8)
    pub fn data_length(&self) -> usize {
        self.data_length
    }

    /// Slice over the valid payload bytes
    pub fn data(&self) -> &[u8] {
        &self.data[..self.data_length]
    }

    /// The whole payload buffer, including bytes past the data length
    pub fn raw_data(&self) -> &[u8; CAN_DATA_LENGTH] {
        &self.data
    }
}

impl Frame for CanMessageFrame {
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        Self::new_data(id, data)
    }

    fn new_remote(_id: impl Into<Id>, _dlc: usize) -> Option<Self> {
        // Remote frames never reach the stack
        None
    }

    fn is_extended(&self) -> bool {
        self.is_extended_frame()
    }

    fn is_remote_frame(&self) -> bool {
        false
    }

    fn id(&self) -> Id {
        self.id
    }

    fn dlc(&self) -> usize {
        self.data_length
    }

    fn data(&self) -> &[u8] {
        CanMessageFrame::data(self)
    }
}

/// Reasons a native frame cannot be handed to the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameRejection {
    #[error("Received a remote transmission request frame")]
    RemoteFrame,
    #[error("Received a frame with a DLC ({0:?}) that was out of the valid range (0..=8)")]
    DataLengthExceeded(u8),
    #[error("Received a frame with an ID ({0:?}) that does not fit its frame format")]
    InvalidIdentifier(u32),
}

impl TryFrom<&DriverFrame> for CanMessageFrame {
    type Error = FrameRejection;

    fn try_from(native: &DriverFrame) -> Result<Self, Self::Error> {
        if native.info.is_remote() {
            return Err(FrameRejection::RemoteFrame);
        }

        let dlc = native.info.dlc();
        let data_length = dlc as usize;

        if data_length > CAN_DATA_LENGTH {
            return Err(FrameRejection::DataLengthExceeded(dlc));
        }

        let id = match native.info.format() {
            FrameFormat::Standard => u16::try_from(native.msg_id)
                .ok()
                .and_then(StandardId::new)
                .map(Id::Standard),
            FrameFormat::Extended => ExtendedId::new(native.msg_id).map(Id::Extended),
        }
        .ok_or(FrameRejection::InvalidIdentifier(native.msg_id))?;

        let mut data = [0u8; CAN_DATA_LENGTH];
        data[..data_length].copy_from_slice(&native.data[..data_length]);

        Ok(Self {
            id,
            data_length,
            data,
        })
    }
}

impl From<&CanMessageFrame> for DriverFrame {
    fn from(frame: &CanMessageFrame) -> Self {
        let format = if frame.is_extended_frame() {
            FrameFormat::Extended
        } else {
            FrameFormat::Standard
        };

        let mut data = [0u8; CAN_DATA_LENGTH];
        data[..frame.data_length].copy_from_slice(frame.data());

        DriverFrame::new(format, frame.identifier(), frame.data_length as u8, data)
    }
}
