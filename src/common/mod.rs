pub mod frame;

pub use frame::{Frame, FrameLedger, Rotation};
