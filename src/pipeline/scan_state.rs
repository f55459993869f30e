use crate::decoder::{DecodedCode, ValueType};
use crate::presentation::ScanEvent;

/// What the scanner currently shows. Owned by the scan worker; the presentation
/// layer only learns about it through [`ScanEvent`]s.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScanState {
    #[default]
    Empty,
    Holding { label: String, value_type: ValueType },
}

impl ScanState {
    pub fn label(&self) -> Option<&str> {
        match self {
            ScanState::Empty => None,
            ScanState::Holding { label, .. } => Some(label),
        }
    }

    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            ScanState::Empty => None,
            ScanState::Holding { value_type, .. } => Some(*value_type),
        }
    }

    /// Applies one decode result. Transitions only on a non-empty payload that
    /// differs from the current label, and returns the event describing it.
    pub fn observe(&mut self, code: &DecodedCode) -> Option<ScanEvent> {
        let payload = code.payload()?;
        if self.label() == Some(payload) {
            return None;
        }
        *self = ScanState::Holding {
            label: payload.to_string(),
            value_type: code.value_type,
        };
        Some(ScanEvent::ScanUpdated {
            label: payload.to_string(),
            is_actionable: code.value_type.is_actionable(),
        })
    }
}
