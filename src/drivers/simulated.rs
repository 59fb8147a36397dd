//! In-process stand-in for the ADS112C04 on the HAT.
//!
//! It answers the same commands the real converter does, so the whole read
//! path runs unchanged without a Raspberry Pi. Input pins are driven by
//! simple models: a fixed voltage, or a gusting turbine output with noise.
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;
use crate::drivers::ads112c04::{
    reference_volts, Gain, InputMux, CMD_POWERDOWN, CMD_RDATA, CMD_RESET, CMD_RREG,
    CMD_START_SYNC, CMD_WREG, CONFIG2_DRDY, REG_CONFIG0, REG_CONFIG1, REG_CONFIG2,
};
use crate::drivers::bus::I2cBus;
use crate::drivers::error::BusError;
/// What drives one analog input of the simulated chip.
#[derive(Clone, Debug)]
pub enum InputModel {
    Constant(f64),
    /// `mean + swing * sin(2πt / period)` plus uniform noise of +/- `noise`.
    Gusting {
        mean: f64,
        swing: f64,
        period_secs: f64,
        noise: f64,
    },
}
impl InputModel {
    fn volts(&self, t: f64, rng: &mut StdRng) -> f64 {
        match self {
            InputModel::Constant(v) => *v,
            InputModel::Gusting {
                mean,
                swing,
                period_secs,
                noise,
            } => {
                let phase = 2.0 * std::f64::consts::PI * t / period_secs.max(1e-3);
                let jitter = if *noise > 0.0 {
                    rng.gen_range(-*noise..=*noise)
                } else {
                    0.0
                };
                mean + swing * phase.sin() + jitter
            }
        }
    }
}
pub struct SimulatedAds112 {
    address: u8,
    board_reference_volts: f64,
    inputs: [InputModel; 4],
    registers: [u8; 4],
    /// Register-2 polls still needed before the pending result is ready.
    pending_polls: Option<u32>,
    polls_per_conversion: u32,
    result: i16,
    powered: bool,
    started_at: Instant,
    rng: StdRng,
}
impl SimulatedAds112 {
    /// A chip whose inputs hold fixed voltages and whose conversions are
    /// ready on the first poll.
    pub fn with_levels(address: u8, board_reference_volts: f64, volts: [f64; 4]) -> Self {
        Self {
            address,
            board_reference_volts,
            inputs: volts.map(InputModel::Constant),
            registers: [0; 4],
            pending_polls: None,
            polls_per_conversion: 1,
            result: 0,
            powered: true,
            started_at: Instant::now(),
            rng: StdRng::seed_from_u64(0x7572_626f),
        }
    }
    /// Two turbines in moving air, wired the way the HAT is: voltages on
    /// AIN0/AIN1 and current-sensor outputs on AIN2/AIN3.
    pub fn wind_farm(address: u8, board_reference_volts: f64) -> Self {
        let mut chip = Self::with_levels(address, board_reference_volts, [0.0; 4]);
        chip.inputs = [
            InputModel::Gusting { mean: 1.6, swing: 0.9, period_secs: 23.0, noise: 0.05 },
            InputModel::Gusting { mean: 1.2, swing: 0.7, period_secs: 31.0, noise: 0.05 },
            InputModel::Gusting { mean: 0.8, swing: 0.5, period_secs: 23.0, noise: 0.03 },
            InputModel::Gusting { mean: 0.6, swing: 0.4, period_secs: 31.0, noise: 0.03 },
        ];
        chip.rng = StdRng::from_entropy();
        chip
    }
    /// Number of register-2 polls a conversion takes; `u32::MAX` never
    /// completes.
    pub fn with_polls_per_conversion(mut self, polls: u32) -> Self {
        self.polls_per_conversion = polls;
        self
    }
    pub fn set_input(&mut self, pin: usize, model: InputModel) {
        if let Some(slot) = self.inputs.get_mut(pin) {
            *slot = model;
        }
    }
    pub fn registers(&self) -> [u8; 4] {
        self.registers
    }
    pub fn is_powered(&self) -> bool {
        self.powered
    }
    fn start_conversion(&mut self) {
        let t = self.started_at.elapsed().as_secs_f64();
        let config0 = self.registers[REG_CONFIG0 as usize];
        let gain = f64::from(Gain::from_code(config0 >> 1).factor());
        let vref = reference_volts(self.registers[REG_CONFIG1 as usize], self.board_reference_volts);
        let differential = match InputMux::from_code(config0 >> 4) {
            Some(mux) => {
                let (positive, negative) = mux.pins();
                let p = self.inputs[positive].volts(t, &mut self.rng);
                let n = match negative {
                    Some(pin) => self.inputs[pin].volts(t, &mut self.rng),
                    None => 0.0,
                };
                p - n
            }
            // reserved mux codes select internal monitors; read as zero
            None => 0.0,
        };
        let code = (differential * gain / vref * 32768.0).round();
        self.result = code.clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16;
        self.pending_polls = Some(self.polls_per_conversion);
        self.powered = true;
        debug!("simulated conversion: cfg0=0x{config0:02x} code={}", self.result);
    }
    fn check(&self, address: u8) -> Result<(), BusError> {
        if address == self.address {
            Ok(())
        } else {
            Err(BusError::NoAck(address))
        }
    }
}
impl I2cBus for SimulatedAds112 {
    fn write(&mut self, address: u8, register: u8, bytes: &[u8]) -> Result<(), BusError> {
        self.check(address)?;
        match register {
            CMD_RESET => {
                self.registers = [0; 4];
                self.pending_polls = None;
                self.powered = true;
            }
            CMD_START_SYNC => self.start_conversion(),
            CMD_POWERDOWN => self.powered = false,
            cmd if cmd & 0xF0 == CMD_WREG => {
                let value = bytes
                    .first()
                    .copied()
                    .ok_or_else(|| BusError::Io("WREG without a data byte".into()))?;
                let reg = usize::from((cmd >> 2) & 0x03);
                // DRDY is read-only
                self.registers[reg] = if reg == REG_CONFIG2 as usize {
                    value & !CONFIG2_DRDY
                } else {
                    value
                };
            }
            other => return Err(BusError::Io(format!("unsupported command 0x{other:02x}"))),
        }
        Ok(())
    }
    fn read(&mut self, address: u8, register: u8, length: usize) -> Result<Vec<u8>, BusError> {
        self.check(address)?;
        let bytes = match register {
            CMD_RDATA => {
                self.pending_polls = None;
                self.result.to_be_bytes().to_vec()
            }
            cmd if cmd & 0xF0 == CMD_RREG => {
                let reg = usize::from((cmd >> 2) & 0x03);
                let mut value = self.registers[reg];
                if reg == REG_CONFIG2 as usize {
                    if let Some(remaining) = self.pending_polls.as_mut() {
                        *remaining = remaining.saturating_sub(1);
                        if *remaining == 0 {
                            value |= CONFIG2_DRDY;
                        }
                    }
                }
                vec![value]
            }
            other => return Err(BusError::Io(format!("unsupported command 0x{other:02x}"))),
        };
        if bytes.len() < length {
            return Err(BusError::ShortRead {
                address,
                expected: length,
                actual: bytes.len(),
            });
        }
        Ok(bytes.into_iter().take(length).collect())
    }
}
