//! Installs `tracing_subscriber::fmt`, text or JSON per [`LogConfig::format`]
//! (§4.15), matching the teacher's `apps/skit` logging setup without its
//! OpenTelemetry export layer (out of scope here).

use crate::config::{LogConfig, LogFormat};
use tracing_subscriber::EnvFilter;

pub fn init(log_config: &LogConfig) {
    let level: tracing::Level = log_config.level.into();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    match log_config.format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Text => subscriber.init(),
    }
}
