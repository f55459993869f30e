use tokio::sync::mpsc;
use tracing::debug;

use crate::presentation::ScanEvent;

/// Renders scan events. Implementations live on the presentation context and are
/// only ever driven from there.
pub trait PresentationSink {
    fn on_scan_updated(&mut self, label: &str, is_actionable: bool);
    fn on_scan_failed(&mut self, reason: &str);
}

pub fn dispatch<S: PresentationSink + ?Sized>(sink: &mut S, event: &ScanEvent) {
    match event {
        ScanEvent::ScanUpdated {
            label,
            is_actionable,
        } => sink.on_scan_updated(label, *is_actionable),
        ScanEvent::ScanFailed { reason } => sink.on_scan_failed(reason),
    }
}

/// Drains `events` into `sink` until the session drops its sender.
/// Returns the number of events delivered.
pub async fn deliver<S: PresentationSink + ?Sized>(
    mut events: mpsc::Receiver<ScanEvent>,
    sink: &mut S,
) -> usize {
    let mut delivered = 0;
    while let Some(event) = events.recv().await {
        debug!(?event, "Delivering scan event");
        dispatch(sink, &event);
        delivered += 1;
    }
    delivered
}

pub const NO_SCAN_YET: &str = "No code scanned yet";

/// Presentation model of the scanner screen: the latest result text, whether the
/// "open link" action is offered, and the last transient error notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanView {
    result_text: String,
    open_link_visible: bool,
    last_error: Option<String>,
}

impl Default for ScanView {
    fn default() -> Self {
        Self {
            result_text: NO_SCAN_YET.to_string(),
            open_link_visible: false,
            last_error: None,
        }
    }
}

impl ScanView {
    pub fn result_text(&self) -> &str {
        &self.result_text
    }

    pub fn open_link_visible(&self) -> bool {
        self.open_link_visible
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// The link an "open" action would navigate to, if one is on screen.
    pub fn pending_link(&self) -> Option<&str> {
        self.open_link_visible.then_some(self.result_text.as_str())
    }

    pub fn dismiss_error(&mut self) -> Option<String> {
        self.last_error.take()
    }
}

impl PresentationSink for ScanView {
    fn on_scan_updated(&mut self, label: &str, is_actionable: bool) {
        self.result_text = label.to_string();
        self.open_link_visible = is_actionable;
    }

    fn on_scan_failed(&mut self, reason: &str) {
        self.last_error = Some(reason.to_string());
    }
}
