use std::path::PathBuf;
use std::sync::Arc;

use qrscan::presentation::dispatch;
use qrscan::{AppError, Configuration, NullDecoder, PipelineSession, ScanView, SyntheticCamera};

fn init_logging(configuration: &Configuration) {
    tracing_subscriber::fmt()
        .with_max_level(configuration.max_log_level())
        .init();
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config_path = std::env::var_os("QRSCAN_CONFIG").map(PathBuf::from);
    let configuration = Configuration::load(config_path.as_deref())?;
    init_logging(&configuration);

    let (mut session, mut events) = PipelineSession::builder(configuration)
        .start(SyntheticCamera::new(640, 480), Arc::new(NullDecoder))?;
    let session_id = session.id();

    let presenter = tokio::spawn(async move {
        let mut view = ScanView::default();
        while let Some(event) = events.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => tracing::info!(event = %json, "Scan event"),
                Err(e) => tracing::warn!("Failed to serialize scan event: {}", e),
            }
            dispatch(&mut view, &event);
            match view.dismiss_error() {
                Some(notice) => tracing::warn!(session = %session_id, "Scan failed: {}", notice),
                None => {
                    if let Some(link) = view.pending_link() {
                        tracing::info!(session = %session_id, link, "Link ready to open");
                    }
                }
            }
        }
        view
    });

    tokio::signal::ctrl_c().await?;
    session.stop().await;

    let view = presenter.await?;
    tracing::info!(
        session = %session_id,
        result = view.result_text(),
        stats = %serde_json::to_string(&session.stats())?,
        "Scanner shut down"
    );
    Ok(())
}
