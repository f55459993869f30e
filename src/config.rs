use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::Level;

use crate::decoder::BarcodeFormat;
use crate::pipeline::BackpressureStrategy;

pub const ENV_PREFIX: &str = "QRSCAN";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub frame_interval_ms: u64,
    pub backpressure: BackpressureStrategy,
    pub format: BarcodeFormat,
    pub event_buffer_size: usize,
    pub teardown_grace_ms: u64,
    pub log_level: String,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            frame_interval_ms: 33,
            backpressure: BackpressureStrategy::KeepOnlyLatest,
            format: BarcodeFormat::QrCode,
            event_buffer_size: 16,
            teardown_grace_ms: 500,
            log_level: "info".to_string(),
        }
    }
}

impl Configuration {
    /// Layers an optional config file and `QRSCAN_*` environment variables over
    /// the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        let configuration: Self = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;
        configuration.validate()?;
        Ok(configuration)
    }

    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.frame_interval_ms == 0 {
            return Err(config::ConfigError::Message(
                "frame_interval_ms must be at least 1".to_string(),
            ));
        }
        if self.log_level.parse::<Level>().is_err() {
            return Err(config::ConfigError::Message(format!(
                "unknown log_level '{}'",
                self.log_level
            )));
        }
        Ok(())
    }

    /// Never shorter than one millisecond, so the capture loop cannot spin.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }

    pub fn teardown_grace(&self) -> Duration {
        Duration::from_millis(self.teardown_grace_ms)
    }

    pub fn max_log_level(&self) -> Level {
        self.log_level.parse().unwrap_or(Level::INFO)
    }
}
