//! Deployment configuration.
//!
//! Every field has a default, so an empty YAML or JSON document is a valid
//! configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::error::{DeployError, DeployResult};
use crate::tables::PtpTime;

/// Default values for deployment configuration.
pub mod defaults {
    /// First FRER stream handle handed out.
    pub const FIRST_STREAM_HANDLE: u32 = 1;

    /// Vector recovery history length at merge points.
    pub const HISTORY_LENGTH: u8 = 32;

    /// Smallest history length the vector algorithm accepts.
    pub const MIN_HISTORY_LENGTH: u8 = 2;

    /// Largest history length switches are known to accept.
    pub const MAX_HISTORY_LENGTH: u8 = 64;

    /// Sequence recovery reset timeout in milliseconds.
    pub const RESET_TIMEOUT_MS: u32 = 100;
}

/// Top-level configuration of a deployment cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeployConfig {
    /// 802.1Qbv options.
    pub gcl: GclConfig,
    /// 802.1CB options.
    pub frer: FrerConfig,
    /// Emit empty/disabled tables for capable devices without generated
    /// tables, so appliers can reset them to factory defaults.
    pub fill_placeholders: bool,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            gcl: GclConfig::default(),
            frer: FrerConfig::default(),
            fill_placeholders: true,
        }
    }
}

/// Gate control list options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GclConfig {
    /// Admin base time written into every generated schedule.
    pub admin_base_time: PtpTime,
}

/// FRER options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FrerConfig {
    pub first_stream_handle: u32,
    pub history_length: u8,
    pub reset_timeout_ms: u32,
}

impl Default for FrerConfig {
    fn default() -> Self {
        Self {
            first_stream_handle: defaults::FIRST_STREAM_HANDLE,
            history_length: defaults::HISTORY_LENGTH,
            reset_timeout_ms: defaults::RESET_TIMEOUT_MS,
        }
    }
}

impl DeployConfig {
    /// Parses and validates a YAML document.
    pub fn from_yaml_str(text: &str) -> DeployResult<Self> {
        let config: DeployConfig =
            serde_yaml::from_str(text).map_err(|e| DeployError::parse("YAML config", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a JSON document.
    pub fn from_json_str(text: &str) -> DeployResult<Self> {
        let config: DeployConfig =
            serde_json::from_str(text).map_err(|e| DeployError::parse("JSON config", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a config file; `.json` files are parsed as JSON, anything else
    /// as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> DeployResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| DeployError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let config = if is_json {
            Self::from_json_str(&text)
        } else {
            Self::from_yaml_str(&text)
        }?;

        info!("Loaded deployment config from {}", path.display());
        Ok(config)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> DeployResult<()> {
        let history = self.frer.history_length;
        if !(defaults::MIN_HISTORY_LENGTH..=defaults::MAX_HISTORY_LENGTH).contains(&history) {
            return Err(DeployError::invalid_config(
                "frer.history_length",
                format!(
                    "{} is outside {}..={}",
                    history,
                    defaults::MIN_HISTORY_LENGTH,
                    defaults::MAX_HISTORY_LENGTH
                ),
            ));
        }

        if !self.gcl.admin_base_time.is_normalized() {
            return Err(DeployError::invalid_config(
                "gcl.admin_base_time.nanoseconds",
                "must be below one second",
            ));
        }

        Ok(())
    }
}
