//! TI ADS112C04 16-bit delta-sigma ADC: command set, register layout and
//! code-to-volts conversion.
//!
//! The chip has four configuration registers and no register pointer; every
//! transaction starts with a command byte. Configuration register 0 selects
//! the input multiplexer and gain, register 1 the data rate, conversion mode
//! and voltage reference, and bit 7 of register 2 is the data-ready flag.
use serde::{Deserialize, Serialize};
use std::time::Duration;
pub const CMD_RESET: u8 = 0x06;
pub const CMD_START_SYNC: u8 = 0x08;
pub const CMD_POWERDOWN: u8 = 0x02;
pub const CMD_RDATA: u8 = 0x10;
pub const CMD_RREG: u8 = 0x20;
pub const CMD_WREG: u8 = 0x40;
pub const REG_CONFIG0: u8 = 0x00;
pub const REG_CONFIG1: u8 = 0x01;
pub const REG_CONFIG2: u8 = 0x02;
pub const REG_CONFIG3: u8 = 0x03;
/// Data-ready flag in configuration register 2.
pub const CONFIG2_DRDY: u8 = 0x80;
/// Largest positive output code; a code of this size reads as full scale.
pub const HALF_MAX_CODE: i16 = i16::MAX;
/// Internal reference voltage.
pub const INTERNAL_REFERENCE_VOLTS: f64 = 2.048;
/// Time the chip needs after a RESET command before it accepts commands.
pub const RESET_SETTLE: Duration = Duration::from_micros(500);
/// RREG/WREG carry the register address in bits 3:2.
pub fn rreg(register: u8) -> u8 {
    CMD_RREG | ((register & 0x03) << 2)
}
pub fn wreg(register: u8) -> u8 {
    CMD_WREG | ((register & 0x03) << 2)
}
/// Input multiplexer selection (AINp, AINn). Single-ended inputs measure
/// against AVSS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMux {
    Ain0Ain1 = 0b0000,
    Ain0Ain2 = 0b0001,
    Ain0Ain3 = 0b0010,
    Ain1Ain0 = 0b0011,
    Ain1Ain2 = 0b0100,
    Ain1Ain3 = 0b0101,
    Ain2Ain3 = 0b0110,
    Ain3Ain2 = 0b0111,
    Ain0 = 0b1000,
    Ain1 = 0b1001,
    Ain2 = 0b1010,
    Ain3 = 0b1011,
}
impl InputMux {
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code & 0x0F {
            0b0000 => InputMux::Ain0Ain1,
            0b0001 => InputMux::Ain0Ain2,
            0b0010 => InputMux::Ain0Ain3,
            0b0011 => InputMux::Ain1Ain0,
            0b0100 => InputMux::Ain1Ain2,
            0b0101 => InputMux::Ain1Ain3,
            0b0110 => InputMux::Ain2Ain3,
            0b0111 => InputMux::Ain3Ain2,
            0b1000 => InputMux::Ain0,
            0b1001 => InputMux::Ain1,
            0b1010 => InputMux::Ain2,
            0b1011 => InputMux::Ain3,
            _ => return None,
        })
    }
    /// Positive and negative input pins; `None` for the negative side means AVSS.
    pub fn pins(&self) -> (usize, Option<usize>) {
        match self {
            InputMux::Ain0Ain1 => (0, Some(1)),
            InputMux::Ain0Ain2 => (0, Some(2)),
            InputMux::Ain0Ain3 => (0, Some(3)),
            InputMux::Ain1Ain0 => (1, Some(0)),
            InputMux::Ain1Ain2 => (1, Some(2)),
            InputMux::Ain1Ain3 => (1, Some(3)),
            InputMux::Ain2Ain3 => (2, Some(3)),
            InputMux::Ain3Ain2 => (3, Some(2)),
            InputMux::Ain0 => (0, None),
            InputMux::Ain1 => (1, None),
            InputMux::Ain2 => (2, None),
            InputMux::Ain3 => (3, None),
        }
    }
}
/// Programmable gain amplifier setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gain {
    G1 = 0b000,
    G2 = 0b001,
    G4 = 0b010,
    G8 = 0b011,
    G16 = 0b100,
    G32 = 0b101,
    G64 = 0b110,
    G128 = 0b111,
}
impl Gain {
    pub fn from_code(code: u8) -> Self {
        match code & 0x07 {
            0b000 => Gain::G1,
            0b001 => Gain::G2,
            0b010 => Gain::G4,
            0b011 => Gain::G8,
            0b100 => Gain::G16,
            0b101 => Gain::G32,
            0b110 => Gain::G64,
            _ => Gain::G128,
        }
    }
    pub fn from_factor(factor: u8) -> Option<Self> {
        match factor {
            1 => Some(Gain::G1),
            2 => Some(Gain::G2),
            4 => Some(Gain::G4),
            8 => Some(Gain::G8),
            16 => Some(Gain::G16),
            32 => Some(Gain::G32),
            64 => Some(Gain::G64),
            128 => Some(Gain::G128),
            _ => None,
        }
    }
    pub fn factor(&self) -> u8 {
        1 << (*self as u8)
    }
    /// The PGA can only be bypassed at gains 1, 2 and 4.
    pub fn allows_bypass(&self) -> bool {
        matches!(self, Gain::G1 | Gain::G2 | Gain::G4)
    }
}
/// Output data rate in normal mode; turbo mode doubles it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataRate {
    Sps20 = 0b000,
    Sps45 = 0b001,
    Sps90 = 0b010,
    Sps175 = 0b011,
    Sps330 = 0b100,
    Sps600 = 0b101,
    Sps1000 = 0b110,
}
impl DataRate {
    pub fn from_sps(sps: u16) -> Option<Self> {
        match sps {
            20 => Some(DataRate::Sps20),
            45 => Some(DataRate::Sps45),
            90 => Some(DataRate::Sps90),
            175 => Some(DataRate::Sps175),
            330 => Some(DataRate::Sps330),
            600 => Some(DataRate::Sps600),
            1000 => Some(DataRate::Sps1000),
            _ => None,
        }
    }
    pub fn samples_per_second(&self) -> u16 {
        match self {
            DataRate::Sps20 => 20,
            DataRate::Sps45 => 45,
            DataRate::Sps90 => 90,
            DataRate::Sps175 => 175,
            DataRate::Sps330 => 330,
            DataRate::Sps600 => 600,
            DataRate::Sps1000 => 1000,
        }
    }
    /// Nominal time for one single-shot conversion.
    pub fn conversion_time(&self, turbo: bool) -> Duration {
        let sps = u64::from(self.samples_per_second()) * if turbo { 2 } else { 1 };
        Duration::from_micros(1_000_000 / sps)
    }
}
/// Voltage reference selection. The internal reference is fixed; the other
/// two depend on the board and carry their value in volts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reference {
    Internal,
    External(f64),
    Supply(f64),
}
impl Reference {
    pub fn volts(&self) -> f64 {
        match self {
            Reference::Internal => INTERNAL_REFERENCE_VOLTS,
            Reference::External(v) | Reference::Supply(v) => *v,
        }
    }
    fn code(&self) -> u8 {
        match self {
            Reference::Internal => 0b00,
            Reference::External(_) => 0b01,
            Reference::Supply(_) => 0b10,
        }
    }
}
/// Configuration register 0: MUX[7:4] GAIN[3:1] PGA_BYPASS[0].
pub fn config0(input: InputMux, gain: Gain, pga_bypass: bool) -> u8 {
    ((input as u8) << 4) | ((gain as u8) << 1) | u8::from(pga_bypass)
}
/// Configuration register 1: DR[7:5] MODE[4] CM[3] VREF[2:1] TS[0].
/// Conversions are always single-shot and the temperature sensor is off.
pub fn config1(data_rate: DataRate, turbo: bool, reference: Reference) -> u8 {
    ((data_rate as u8) << 5) | (u8::from(turbo) << 4) | (reference.code() << 1)
}
/// Reference voltage selected by a configuration register 1 value, using
/// `board_volts` for the external and supply settings.
pub fn reference_volts(config1: u8, board_volts: f64) -> f64 {
    match (config1 >> 1) & 0x03 {
        0b00 => INTERNAL_REFERENCE_VOLTS,
        _ => board_volts,
    }
}
/// Input span represented by the full positive code range.
pub fn full_scale_range(reference: Reference, gain: Gain) -> f64 {
    reference.volts() / f64::from(gain.factor())
}
/// Linear code-to-units conversion: code 0 is 0, `HALF_MAX_CODE` is
/// `full_scale_range`, all multiplied by the board's divider/sensor scale.
pub fn raw_to_physical(raw: i16, full_scale_range: f64, hardware_scale: f64) -> f64 {
    f64::from(raw) * (full_scale_range / f64::from(HALF_MAX_CODE)) * hardware_scale
}
/// RDATA returns the conversion result MSB first.
pub fn decode_result(bytes: &[u8]) -> Option<i16> {
    match bytes {
        [msb, lsb, ..] => Some(i16::from_be_bytes([*msb, *lsb])),
        _ => None,
    }
}
