use serde::{Deserialize, Serialize};

/// State changes handed from the scan worker to the presentation context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScanEvent {
    ScanUpdated { label: String, is_actionable: bool },
    ScanFailed { reason: String },
}
