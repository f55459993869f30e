pub mod event;
pub mod sink;

pub use event::ScanEvent;
pub use sink::{deliver, dispatch, PresentationSink, ScanView};
