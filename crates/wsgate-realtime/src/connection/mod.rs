//! Live connections and the frames they carry.

pub mod frame;
pub mod handle;

pub use frame::{Frame, FrameType};
pub use handle::Connection;
