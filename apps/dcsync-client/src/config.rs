//! Layered configuration (§4.14), the client-side counterpart of
//! `dcsync-server`'s `config.rs`: DCS dial address, audio input
//! parameters, and the three prefetcher tunables from §4.8.

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

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

/// Whether to request plaintext or encrypted aux-data essence (§4.8);
/// this process never decrypts anything, it only passes the tag through.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AcceptModeConfig {
    #[default]
    Plaintext,
    Encrypted,
}

impl From<AcceptModeConfig> for dcsync_aux::AcceptMode {
    fn from(mode: AcceptModeConfig) -> Self {
        match mode {
            AcceptModeConfig::Plaintext => Self::Plaintext,
            AcceptModeConfig::Encrypted => Self::Encrypted,
        }
    }
}

const fn default_sample_rate() -> u32 {
    48_000
}

fn default_dcs_server_address() -> String {
    "127.0.0.1:4170".to_string()
}

const fn default_edit_units_per_request() -> u32 {
    240
}

const fn default_edit_units_ahead_to_request() -> u32 {
    480
}

const fn default_edit_units_ahead_to_initiate_request() -> u32 {
    48
}

fn default_coding_ul() -> String {
    "00000000000000000000000000000000".to_string()
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct PrefetcherConfig {
    #[serde(default = "default_edit_units_per_request")]
    pub edit_units_per_request: u32,
    #[serde(default = "default_edit_units_ahead_to_request")]
    pub edit_units_ahead_to_request: u32,
    #[serde(default = "default_edit_units_ahead_to_initiate_request")]
    pub edit_units_ahead_to_initiate_request: u32,
    #[serde(default)]
    pub accept: AcceptModeConfig,
    /// Source-data-essence-coding UL to request, as a bare 32-hex-char
    /// string; which aux-data track this processor cares about is a
    /// deployment-time choice, not something DCS hands over (§4.10).
    #[serde(default = "default_coding_ul")]
    pub coding_ul: String,
}

impl Default for PrefetcherConfig {
    fn default() -> Self {
        Self {
            edit_units_per_request: default_edit_units_per_request(),
            edit_units_ahead_to_request: default_edit_units_ahead_to_request(),
            edit_units_ahead_to_initiate_request: default_edit_units_ahead_to_initiate_request(),
            accept: AcceptModeConfig::default(),
            coding_ul: default_coding_ul(),
        }
    }
}

impl From<&PrefetcherConfig> for dcsync_aux::PrefetcherConfig {
    fn from(c: &PrefetcherConfig) -> Self {
        Self {
            edit_units_per_request: c.edit_units_per_request,
            edit_units_ahead_of_current_edit_unit_to_request: c.edit_units_ahead_to_request,
            edit_units_ahead_of_current_edit_unit_to_initiate_request: c.edit_units_ahead_to_initiate_request,
        }
    }
}

/// Audio input device parameters; the device itself is out of scope (§1),
/// these only size the real-time ring and sync-packet modulation.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct AudioConfig {
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self { sample_rate: default_sample_rate() }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Config {
    /// DCS control-channel address to dial.
    #[serde(default = "default_dcs_server_address")]
    pub dcs_server_address: String,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub prefetcher: PrefetcherConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dcs_server_address: default_dcs_server_address(),
            audio: AudioConfig::default(),
            prefetcher: PrefetcherConfig::default(),
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
        assert_eq!(parsed.dcs_server_address, default_dcs_server_address());
        assert_eq!(parsed.prefetcher.edit_units_per_request, default_edit_units_per_request());
    }

    #[test]
    fn missing_file_is_reported_but_not_fatal() {
        let result = load("/nonexistent/dcsync-client.toml").unwrap();
        assert!(result.file_missing.is_some());
        assert_eq!(result.config.audio.sample_rate, default_sample_rate());
    }
}
