//! Layered configuration (§4.14): defaults, then an optional TOML file,
//! then `DCSYNC_`-prefixed environment variables, in that order.
//!
//! Grounded on the teacher's `apps/skit/src/config.rs` `Figment` layering,
//! trimmed to the fields this server actually needs.

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Log level for filtering messages.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

/// Log output format. `Json` is heavier but machine-parseable; `Text` is
/// the default, matching the teacher's console-first convention.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct LogConfig {
    #[serde(default)]
    pub level: LogLevel,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: LogLevel::default(), format: LogFormat::default() }
    }
}

const fn default_sample_rate() -> u32 {
    48_000
}

fn default_dcs_address() -> String {
    // Port 4170 is the IANA-assigned DCS control port (§6).
    "0.0.0.0:4170".to_string()
}

fn default_aux_data_address() -> String {
    "0.0.0.0:8080".to_string()
}

/// One descriptor file handed to the in-memory show builder (§4.12); CPL
/// and ASSETMAP XML parsing is an external collaborator, so these point
/// at already-structured JSON rather than `CompositionPlaylist.xml`.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct ShowConfig {
    /// Paths to show-descriptor JSON files, appended to the timeline in order.
    #[serde(default)]
    pub cpl_descriptors: Vec<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Config {
    /// Address the DCS TCP control channel listens on.
    #[serde(default = "default_dcs_address")]
    pub dcs_address: String,
    /// Address the aux-data HTTP responder binds to.
    #[serde(default = "default_aux_data_address")]
    pub aux_data_address: String,
    /// PCM sample rate shared by the emitter's sync-packet modulation and
    /// the real-time ring sizing (§6: 48 000 or 96 000).
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default)]
    pub show: ShowConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dcs_address: default_dcs_address(),
            aux_data_address: default_aux_data_address(),
            sample_rate: default_sample_rate(),
            show: ShowConfig::default(),
            log: LogConfig::default(),
        }
    }
}

pub struct ConfigLoadResult {
    pub config: Config,
    pub file_missing: Option<String>,
}

/// # Errors
/// Returns an error if the config file contains invalid TOML, or an
/// environment variable holds a value that doesn't fit its field's type.
pub fn load(config_path: &str) -> Result<ConfigLoadResult, Box<figment::Error>> {
    let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

    let mut file_missing = None;
    if std::path::Path::new(config_path).exists() {
        figment = figment.merge(Toml::file(config_path));
    } else {
        file_missing = Some(config_path.to_string());
    }

    let config: Config = figment.merge(Env::prefixed("DCSYNC_").split("__")).extract().map_err(Box::new)?;
    Ok(ConfigLoadResult { config, file_missing })
}

/// Pretty-prints the default configuration as TOML, for `--print-default-config`.
///
/// # Errors
/// Returns an error if the default configuration cannot be serialized,
/// which would indicate a programming error in `Config`'s field types.
pub fn generate_default() -> Result<String, toml::ser::Error> {
    toml::to_string_pretty(&Config::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_roundtrip_through_toml() {
        let toml_string = generate_default().unwrap();
        let parsed: Config = toml::from_str(&toml_string).unwrap();
        assert_eq!(parsed.dcs_address, default_dcs_address());
        assert_eq!(parsed.sample_rate, default_sample_rate());
    }

    #[test]
    fn missing_file_is_reported_but_not_fatal() {
        let result = load("/nonexistent/dcsync-server.toml").unwrap();
        assert!(result.file_missing.is_some());
        assert_eq!(result.config.sample_rate, default_sample_rate());
    }
}
