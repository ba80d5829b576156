pub mod data;
pub mod decode;

pub use data::{Frame, FrameField, FrameGroup, Snapshot, now_epoch_ms};
pub use decode::{DecodeError, FrameDecoder};
