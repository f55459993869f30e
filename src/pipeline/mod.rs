pub mod analyzer;
pub mod gate;
pub mod scan_state;
pub mod stats;

pub use analyzer::ScanAnalyzer;
pub use gate::{BackpressureStrategy, FrameGate, FrameReceiver};
pub use scan_state::ScanState;
pub use stats::{PipelineStats, StatsSnapshot};
