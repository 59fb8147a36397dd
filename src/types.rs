// src/types.rs
use serde::{Deserialize, Serialize};
use crate::drivers::ads112c04::{raw_to_physical, Gain, InputMux};

/// Where samples come from
#[derive(PartialEq, Eq, Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionMode {
    Simulation,
    Hardware,
}

impl Default for ConnectionMode {
    fn default() -> Self {
        if cfg!(target_os = "linux") {
            ConnectionMode::Hardware
        } else {
            ConnectionMode::Simulation
        }
    }
}

/// Buttons in the window, dispatched once per frame by the control loop
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiCommand {
    Clear,
    SavePlots,
    SaveData,
    Exit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Turbine {
    One,
    Two,
}

impl Turbine {
    pub const ALL: [Turbine; 2] = [Turbine::One, Turbine::Two];

    pub fn number(&self) -> u8 {
        match self {
            Turbine::One => 1,
            Turbine::Two => 2,
        }
    }

    pub fn label(&self) -> String {
        format!("Turbine {}", self.number())
    }

    pub fn power_label(&self) -> String {
        format!("Turbine {} Power", self.number())
    }

    pub fn voltage_channel(&self) -> ChannelId {
        match self {
            Turbine::One => ChannelId::Turbine1Voltage,
            Turbine::Two => ChannelId::Turbine2Voltage,
        }
    }

    pub fn current_channel(&self) -> ChannelId {
        match self {
            Turbine::One => ChannelId::Turbine1Current,
            Turbine::Two => ChannelId::Turbine2Current,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quantity {
    Voltage,
    Current,
}

impl Quantity {
    pub fn name(&self) -> &'static str {
        match self {
            Quantity::Voltage => "Voltage",
            Quantity::Current => "Current",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Quantity::Voltage => "V",
            Quantity::Current => "A",
        }
    }
}

/// The four measured signals on the board
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelId {
    Turbine1Voltage,
    Turbine1Current,
    Turbine2Voltage,
    Turbine2Current,
}

impl ChannelId {
    pub fn turbine(&self) -> Turbine {
        match self {
            ChannelId::Turbine1Voltage | ChannelId::Turbine1Current => Turbine::One,
            ChannelId::Turbine2Voltage | ChannelId::Turbine2Current => Turbine::Two,
        }
    }

    pub fn quantity(&self) -> Quantity {
        match self {
            ChannelId::Turbine1Voltage | ChannelId::Turbine2Voltage => Quantity::Voltage,
            ChannelId::Turbine1Current | ChannelId::Turbine2Current => Quantity::Current,
        }
    }

    pub fn label(&self) -> String {
        format!("{} {}", self.turbine().label(), self.quantity().name())
    }
}

/// Static per-channel setup, fixed at startup
#[derive(Clone, Debug, PartialEq)]
pub struct Channel {
    pub id: ChannelId,
    pub input: InputMux,
    pub gain: Gain,
    pub pga_bypass: bool,
    /// Input span of the converter at this gain, in volts
    pub full_scale_range: f64,
    /// Divider ratio or sensor transfer factor (units per ADC volt)
    pub scale: f64,
    pub offset: f64,
}

impl Channel {
    pub fn convert(&self, raw: i16) -> f64 {
        raw_to_physical(raw, self.full_scale_range, self.scale) + self.offset
    }

    pub fn unit(&self) -> &'static str {
        self.id.quantity().unit()
    }
}

/// One conversion result as the chip returned it
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    pub channel: ChannelId,
    pub raw: i16,
    /// Seconds since acquisition started
    pub timestamp: f64,
}

/// A sample in volts or amps
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reading {
    pub channel: ChannelId,
    pub raw: i16,
    pub timestamp: f64,
    pub value: f64,
}

impl Reading {
    pub fn from_sample(sample: Sample, channel: &Channel) -> Self {
        Self {
            channel: sample.channel,
            raw: sample.raw,
            timestamp: sample.timestamp,
            value: channel.convert(sample.raw),
        }
    }

    pub fn point(&self) -> [f64; 2] {
        [self.timestamp, self.value]
    }
}
