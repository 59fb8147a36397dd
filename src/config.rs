//! Board and plotting configuration, read from a JSON file.
//!
//! Every field has a default matching the HAT as built (ADC at 0x40 on
//! I2C bus 1, RESET' on GPIO12, DRDY' on GPIO16, 5 V supply reference,
//! 20 SPS, one reading per second), so a missing file runs the stock board.
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use crate::drivers::ads112c04::{full_scale_range, DataRate, Gain, InputMux, Reference};
use crate::reader::ConverterSettings;
use crate::types::{Channel, ChannelId, ConnectionMode};

/// Environment variable naming the config file when no argument is given.
pub const CONFIG_ENV: &str = "TURBOPLOT_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("0x{0:02x} is not a 7-bit I2C address")]
    InvalidAddress(u8),
    #[error("reference voltage must be positive, got {0}")]
    InvalidReference(f64),
    #[error("unsupported data rate {0} SPS (use 20, 45, 90, 175, 330, 600 or 1000)")]
    UnsupportedDataRate(u16),
    #[error("{channel:?}: unsupported gain {gain} (use a power of two up to 128)")]
    UnsupportedGain { channel: ChannelId, gain: u8 },
    #[error("{channel:?}: the PGA cannot be bypassed at gain {gain}")]
    BypassNotAllowed { channel: ChannelId, gain: u8 },
    #[error("{0:?}: scale and offset must be finite")]
    InvalidCalibration(ChannelId),
    #[error("{0:?} is configured more than once")]
    DuplicateChannel(ChannelId),
    #[error("no channels configured")]
    NoChannels,
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// One input of the converter and how to turn it into volts or amps.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub id: ChannelId,
    pub input: InputMux,
    #[serde(default = "default_gain")]
    pub gain: u8,
    #[serde(default)]
    pub pga_bypass: bool,
    /// Divider ratio or sensor factor, physical units per ADC volt.
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub offset: f64,
}

fn default_gain() -> u8 {
    1
}

fn default_scale() -> f64 {
    1.0
}

impl ChannelConfig {
    fn stock(id: ChannelId, input: InputMux) -> Self {
        Self {
            id,
            input,
            gain: default_gain(),
            pga_bypass: false,
            scale: default_scale(),
            offset: 0.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurboConfig {
    pub mode: ConnectionMode,
    /// N in /dev/i2c-N
    pub bus: u8,
    pub address: u8,
    /// BCM numbers
    pub reset_pin: u8,
    pub drdy_pin: Option<u8>,
    pub reference: Reference,
    pub data_rate_sps: u16,
    pub turbo: bool,
    pub sample_period_ms: u64,
    pub buffer_capacity: usize,
    pub max_ready_polls: u32,
    pub ready_poll_interval_ms: u64,
    pub failure_report_threshold: u32,
    /// Where Save Data / Save Plots write their files
    pub export_dir: PathBuf,
    pub channels: Vec<ChannelConfig>,
}

impl Default for TurboConfig {
    fn default() -> Self {
        Self {
            mode: ConnectionMode::default(),
            bus: 1,
            address: 0x40,
            reset_pin: 12,
            drdy_pin: Some(16),
            reference: Reference::Supply(5.0),
            data_rate_sps: 20,
            turbo: false,
            sample_period_ms: 1000,
            buffer_capacity: 300,
            max_ready_polls: 50,
            ready_poll_interval_ms: 10,
            failure_report_threshold: 10,
            export_dir: PathBuf::from("."),
            // voltages on AIN0/AIN1, current sensors on AIN2/AIN3
            channels: vec![
                ChannelConfig::stock(ChannelId::Turbine1Voltage, InputMux::Ain0),
                ChannelConfig::stock(ChannelId::Turbine1Current, InputMux::Ain2),
                ChannelConfig::stock(ChannelId::Turbine2Voltage, InputMux::Ain1),
                ChannelConfig::stock(ChannelId::Turbine2Current, InputMux::Ain3),
            ],
        }
    }
}

impl TurboConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Load `path` if given, otherwise use the stock board settings.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Config file named by the first argument, else by `TURBOPLOT_CONFIG`.
    pub fn locate(mut args: impl Iterator<Item = String>, env: Option<String>) -> Option<PathBuf> {
        args.next().or(env).filter(|s| !s.is_empty()).map(PathBuf::from)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.address > 0x7F {
            return Err(ConfigError::InvalidAddress(self.address));
        }
        let vref = self.reference.volts();
        if !vref.is_finite() || vref <= 0.0 {
            return Err(ConfigError::InvalidReference(vref));
        }
        DataRate::from_sps(self.data_rate_sps)
            .ok_or(ConfigError::UnsupportedDataRate(self.data_rate_sps))?;
        if self.sample_period_ms == 0 {
            return Err(ConfigError::Zero("sample_period_ms"));
        }
        if self.buffer_capacity == 0 {
            return Err(ConfigError::Zero("buffer_capacity"));
        }
        if self.max_ready_polls == 0 {
            return Err(ConfigError::Zero("max_ready_polls"));
        }
        if self.failure_report_threshold == 0 {
            return Err(ConfigError::Zero("failure_report_threshold"));
        }
        if self.channels.is_empty() {
            return Err(ConfigError::NoChannels);
        }
        let mut seen = HashSet::new();
        for channel in &self.channels {
            if !seen.insert(channel.id) {
                return Err(ConfigError::DuplicateChannel(channel.id));
            }
            let gain = Gain::from_factor(channel.gain).ok_or(ConfigError::UnsupportedGain {
                channel: channel.id,
                gain: channel.gain,
            })?;
            if channel.pga_bypass && !gain.allows_bypass() {
                return Err(ConfigError::BypassNotAllowed {
                    channel: channel.id,
                    gain: channel.gain,
                });
            }
            if !channel.scale.is_finite() || !channel.offset.is_finite() {
                return Err(ConfigError::InvalidCalibration(channel.id));
            }
        }
        Ok(())
    }

    pub fn converter_settings(&self) -> Result<ConverterSettings, ConfigError> {
        let data_rate = DataRate::from_sps(self.data_rate_sps)
            .ok_or(ConfigError::UnsupportedDataRate(self.data_rate_sps))?;
        Ok(ConverterSettings {
            reference: self.reference,
            data_rate,
            turbo: self.turbo,
            max_ready_polls: self.max_ready_polls,
            ready_poll_interval: Duration::from_millis(self.ready_poll_interval_ms),
        })
    }

    /// Runtime channel table, with full-scale ranges resolved.
    pub fn channels(&self) -> Result<Vec<Channel>, ConfigError> {
        self.validate()?;
        self.channels
            .iter()
            .map(|c| {
                let gain = Gain::from_factor(c.gain).ok_or(ConfigError::UnsupportedGain {
                    channel: c.id,
                    gain: c.gain,
                })?;
                Ok(Channel {
                    id: c.id,
                    input: c.input,
                    gain,
                    pga_bypass: c.pga_bypass,
                    full_scale_range: full_scale_range(self.reference, gain),
                    scale: c.scale,
                    offset: c.offset,
                })
            })
            .collect()
    }

    pub fn sample_period(&self) -> Duration {
        Duration::from_millis(self.sample_period_ms)
    }
}
