use thiserror::Error;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration Error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Session Error: {0}")]
    Session(#[from] SessionError),
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Task Error: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("Serialization Error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// Raised while binding a scan session; fatal to that start attempt.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to bind camera '{device}': {source}")]
    Bind {
        device: String,
        #[source]
        source: CameraError,
    },
    #[error("Failed to spawn capture thread: {0}")]
    Spawn(std::io::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    #[error("Capture device unavailable: {0}")]
    Unavailable(String),
    #[error("Capture failed: {0}")]
    Capture(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Decoder failed: {0}")]
    Failed(String),
    #[error("Decoder is closed")]
    Closed,
    #[error("Decode task aborted: {0}")]
    Aborted(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Frame gate is closed")]
    GateClosed,
    #[error("Presentation channel closed")]
    PresentationClosed,
    #[error("Completion hook for frame {0} was dropped before settling")]
    SettlementLost(u64),
}
