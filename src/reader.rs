//! `read(channel) -> Reading` on top of the ADS112C04 command protocol.
//!
//! Every read is a single-shot conversion: select the input, START/SYNC,
//! wait for data-ready, RDATA. Failures are returned to the caller as-is;
//! nothing here retries.
use log::{debug, info, warn};
use std::thread;
use std::time::Duration;
use crate::drivers::ads112c04::{
    config0, config1, decode_result, rreg, wreg, DataRate, Reference, CMD_POWERDOWN, CMD_RDATA,
    CMD_RESET, CMD_START_SYNC, CONFIG2_DRDY, REG_CONFIG0, REG_CONFIG1, REG_CONFIG2, RESET_SETTLE,
};
use crate::drivers::{AdcError, BusError};
use crate::hat::HatContext;
use crate::types::{Channel, Reading, Sample};

/// Converter-wide settings shared by every channel.
#[derive(Clone, Debug, PartialEq)]
pub struct ConverterSettings {
    pub reference: Reference,
    pub data_rate: DataRate,
    pub turbo: bool,
    /// Upper bound on data-ready checks per conversion.
    pub max_ready_polls: u32,
    pub ready_poll_interval: Duration,
}

pub struct AdcReader {
    hat: HatContext,
    settings: ConverterSettings,
}

impl AdcReader {
    pub fn new(hat: HatContext, settings: ConverterSettings) -> Self {
        Self { hat, settings }
    }

    pub fn settings(&self) -> &ConverterSettings {
        &self.settings
    }

    pub fn hat(&self) -> &HatContext {
        &self.hat
    }

    /// Reset the converter and load the data rate / reference register.
    pub fn init(&mut self) -> Result<(), AdcError> {
        self.command(CMD_RESET)?;
        thread::sleep(RESET_SETTLE);
        self.write_config1()?;
        info!(
            "ADS112C04 at 0x{:02x} reset: {} SPS{}, reference {:.3} V",
            self.hat.address(),
            self.settings.data_rate.samples_per_second(),
            if self.settings.turbo { " (turbo)" } else { "" },
            self.settings.reference.volts()
        );
        Ok(())
    }

    /// Select the channel's input pair and gain, then the data rate,
    /// reference and single-shot mode. Both registers are written on every
    /// call since the chip may have reset since the last read.
    pub fn configure(&mut self, channel: &Channel) -> Result<(), AdcError> {
        let cfg0 = config0(channel.input, channel.gain, channel.pga_bypass);
        self.write_register(REG_CONFIG0, cfg0)?;
        self.write_config1()
    }

    /// One raw conversion of `channel`, stamped with `timestamp`.
    pub fn sample(&mut self, channel: &Channel, timestamp: f64) -> Result<Sample, AdcError> {
        self.configure(channel)?;
        self.command(CMD_START_SYNC)?;
        self.wait_ready()?;
        let address = self.hat.address();
        let bytes = self.hat.bus()?.read(address, CMD_RDATA, 2)?;
        let raw = decode_result(&bytes).ok_or(BusError::ShortRead {
            address,
            expected: 2,
            actual: bytes.len(),
        })?;
        debug!("{:?}: raw {raw}", channel.id);
        Ok(Sample {
            channel: channel.id,
            raw,
            timestamp,
        })
    }

    /// Convert one channel and return it in physical units.
    pub fn read(&mut self, channel: &Channel, timestamp: f64) -> Result<Reading, AdcError> {
        let sample = self.sample(channel, timestamp)?;
        Ok(Reading::from_sample(sample, channel))
    }

    /// Contents of configuration registers 0..=3.
    pub fn dump_registers(&mut self) -> Result<[u8; 4], AdcError> {
        let address = self.hat.address();
        let mut registers = [0u8; 4];
        for (reg, slot) in registers.iter_mut().enumerate() {
            let bytes = self.hat.bus()?.read(address, rreg(reg as u8), 1)?;
            *slot = bytes.first().copied().ok_or(BusError::ShortRead {
                address,
                expected: 1,
                actual: 0,
            })?;
        }
        Ok(registers)
    }

    pub fn power_down(&mut self) -> Result<(), AdcError> {
        self.command(CMD_POWERDOWN)?;
        Ok(())
    }

    /// Power the converter down and release the HAT. Safe to call twice.
    pub fn shutdown(&mut self) {
        if !self.hat.is_open() {
            return;
        }
        if let Err(e) = self.power_down() {
            warn!("could not power down ADC: {e}");
        }
        self.hat.close();
    }

    fn wait_ready(&mut self) -> Result<(), AdcError> {
        let polls = self.settings.max_ready_polls;
        let interval = self.settings.ready_poll_interval;
        let address = self.hat.address();
        for _ in 0..polls {
            let ready = match self.hat.ready_line() {
                Some(line) => line.is_ready()?,
                None => {
                    let cfg2 = self.hat.bus()?.read(address, rreg(REG_CONFIG2), 1)?;
                    cfg2.first().map_or(false, |v| v & CONFIG2_DRDY != 0)
                }
            };
            if ready {
                return Ok(());
            }
            if !interval.is_zero() {
                thread::sleep(interval);
            }
        }
        Err(AdcError::Timeout { polls })
    }

    fn expected_config1(&self) -> u8 {
        config1(self.settings.data_rate, self.settings.turbo, self.settings.reference)
    }

    fn write_config1(&mut self) -> Result<(), AdcError> {
        let value = self.expected_config1();
        self.write_register(REG_CONFIG1, value)
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<(), AdcError> {
        let address = self.hat.address();
        debug!("WREG {register} <- 0x{value:02x}");
        self.hat.bus()?.write(address, wreg(register), &[value])?;
        Ok(())
    }

    fn command(&mut self, command: u8) -> Result<(), AdcError> {
        let address = self.hat.address();
        self.hat.bus()?.write(address, command, &[])?;
        Ok(())
    }
}

impl Drop for AdcReader {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::drivers::ads112c04::{Gain, InputMux};
    use crate::drivers::{I2cBus, ReadyLine, SimulatedAds112};
    use crate::types::ChannelId;
    use std::cell::RefCell;
    use std::rc::Rc;

    pub(crate) fn settings(max_ready_polls: u32) -> ConverterSettings {
        ConverterSettings {
            reference: Reference::Supply(5.0),
            data_rate: DataRate::Sps20,
            turbo: false,
            max_ready_polls,
            ready_poll_interval: Duration::ZERO,
        }
    }

    pub(crate) fn channel(id: ChannelId, input: InputMux, scale: f64) -> Channel {
        Channel {
            id,
            input,
            gain: Gain::G1,
            pga_bypass: false,
            full_scale_range: 5.0,
            scale,
            offset: 0.0,
        }
    }

    /// Records every transaction and forwards it to a simulated chip.
    struct Tap {
        chip: SimulatedAds112,
        log: Rc<RefCell<Vec<(u8, Vec<u8>)>>>,
    }

    impl I2cBus for Tap {
        fn write(&mut self, address: u8, register: u8, bytes: &[u8]) -> Result<(), BusError> {
            self.log.borrow_mut().push((register, bytes.to_vec()));
            self.chip.write(address, register, bytes)
        }
        fn read(&mut self, address: u8, register: u8, length: usize) -> Result<Vec<u8>, BusError> {
            self.chip.read(address, register, length)
        }
    }

    struct Pin(bool);

    impl ReadyLine for Pin {
        fn is_ready(&mut self) -> Result<bool, BusError> {
            Ok(self.0)
        }
    }

    fn reader(chip: SimulatedAds112, polls: u32) -> AdcReader {
        AdcReader::new(HatContext::from_parts(Box::new(chip), 0x40, None), settings(polls))
    }

    #[test]
    fn reads_and_converts_selected_input() {
        let chip = SimulatedAds112::with_levels(0x40, 5.0, [1.25, 0.0, 2.5, 0.0]);
        let mut adc = reader(chip, 50);
        adc.init().unwrap();
        let ch = channel(ChannelId::Turbine1Current, InputMux::Ain2, 4.0);
        let reading = adc.read(&ch, 1.5).unwrap();
        assert_eq!(reading.raw, 16384);
        assert_eq!(reading.timestamp, 1.5);
        assert!((reading.value - 10.0).abs() < 1e-3);
        let volts = adc.read(&channel(ChannelId::Turbine1Voltage, InputMux::Ain0, 1.0), 2.0).unwrap();
        assert!((volts.value - 1.25).abs() < 1e-3);
    }

    #[test]
    fn configure_writes_mux_and_rate_every_time() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let tap = Tap {
            chip: SimulatedAds112::with_levels(0x40, 5.0, [0.0; 4]),
            log: Rc::clone(&log),
        };
        let mut adc = AdcReader::new(HatContext::from_parts(Box::new(tap), 0x40, None), settings(5));
        let ch = channel(ChannelId::Turbine1Current, InputMux::Ain2, 1.0);
        adc.configure(&ch).unwrap();
        adc.configure(&ch).unwrap();
        let writes = log.borrow().clone();
        assert_eq!(
            writes,
            vec![
                (0x40, vec![0xA0]),
                (0x44, vec![0x04]),
                (0x40, vec![0xA0]),
                (0x44, vec![0x04]),
            ]
        );
    }

    /// Resets the wrapped chip once, just ahead of the next write.
    struct Brownout {
        chip: SimulatedAds112,
        pending: Rc<RefCell<bool>>,
    }

    impl I2cBus for Brownout {
        fn write(&mut self, address: u8, register: u8, bytes: &[u8]) -> Result<(), BusError> {
            if register == CMD_RESET || !self.pending.replace(false) {
                return self.chip.write(address, register, bytes);
            }
            self.chip.write(address, CMD_RESET, &[])?;
            self.chip.write(address, register, bytes)
        }
        fn read(&mut self, address: u8, register: u8, length: usize) -> Result<Vec<u8>, BusError> {
            self.chip.read(address, register, length)
        }
    }

    #[test]
    fn chip_reset_between_reads_is_reconfigured() {
        let pending = Rc::new(RefCell::new(false));
        let bus = Brownout {
            chip: SimulatedAds112::with_levels(0x40, 5.0, [1.0, 0.0, 0.0, 0.0]),
            pending: Rc::clone(&pending),
        };
        let mut adc = AdcReader::new(HatContext::from_parts(Box::new(bus), 0x40, None), settings(5));
        adc.init().unwrap();
        let ch = channel(ChannelId::Turbine1Voltage, InputMux::Ain0, 1.0);
        let before = adc.read(&ch, 1.0).unwrap();
        assert!((before.value - 1.0).abs() < 1e-3);

        // the chip drops back to power-on defaults (internal 2.048 V reference)
        // before the next read's first register write
        *pending.borrow_mut() = true;
        let after = adc.read(&ch, 2.0).unwrap();
        assert!((after.value - 1.0).abs() < 1e-3, "got {}", after.value);
        assert_eq!(adc.dump_registers().unwrap()[1], 0x04);
    }

    #[test]
    fn never_ready_times_out() {
        let chip = SimulatedAds112::with_levels(0x40, 5.0, [1.0; 4]).with_polls_per_conversion(u32::MAX);
        let mut adc = reader(chip, 50);
        let err = adc
            .read(&channel(ChannelId::Turbine2Voltage, InputMux::Ain1, 1.0), 0.0)
            .unwrap_err();
        assert!(matches!(err, AdcError::Timeout { polls: 50 }));
        assert!(err.is_timeout());
    }

    #[test]
    fn slow_conversion_within_limit_succeeds() {
        let chip = SimulatedAds112::with_levels(0x40, 5.0, [1.0; 4]).with_polls_per_conversion(7);
        let mut adc = reader(chip, 10);
        assert!(adc.read(&channel(ChannelId::Turbine2Voltage, InputMux::Ain1, 1.0), 0.0).is_ok());
    }

    #[test]
    fn ready_pin_replaces_register_polling() {
        let chip = SimulatedAds112::with_levels(0x40, 5.0, [1.0; 4]).with_polls_per_conversion(u32::MAX);
        let hat = HatContext::from_parts(Box::new(chip), 0x40, Some(Box::new(Pin(true))));
        let mut adc = AdcReader::new(hat, settings(3));
        assert!(adc.read(&channel(ChannelId::Turbine1Voltage, InputMux::Ain0, 1.0), 0.0).is_ok());

        let chip = SimulatedAds112::with_levels(0x40, 5.0, [1.0; 4]);
        let hat = HatContext::from_parts(Box::new(chip), 0x40, Some(Box::new(Pin(false))));
        let mut adc = AdcReader::new(hat, settings(3));
        assert!(matches!(
            adc.read(&channel(ChannelId::Turbine1Voltage, InputMux::Ain0, 1.0), 0.0),
            Err(AdcError::Timeout { polls: 3 })
        ));
    }

    #[test]
    fn missing_device_is_a_bus_error() {
        let chip = SimulatedAds112::with_levels(0x48, 5.0, [0.0; 4]);
        let mut adc = reader(chip, 5);
        assert!(matches!(adc.init(), Err(AdcError::Bus(BusError::NoAck(0x40)))));
    }

    #[test]
    fn dumps_registers_after_init() {
        let chip = SimulatedAds112::with_levels(0x40, 5.0, [0.0; 4]);
        let mut adc = reader(chip, 5);
        adc.init().unwrap();
        adc.configure(&channel(ChannelId::Turbine2Current, InputMux::Ain3, 1.0)).unwrap();
        assert_eq!(adc.dump_registers().unwrap(), [0xB0, 0x04, 0x00, 0x00]);
    }

    #[test]
    fn shutdown_releases_hat() {
        let chip = SimulatedAds112::with_levels(0x40, 5.0, [0.0; 4]);
        let mut adc = reader(chip, 5);
        adc.shutdown();
        assert!(!adc.hat().is_open());
        assert!(matches!(adc.init(), Err(AdcError::Bus(BusError::Closed))));
        adc.shutdown();
    }
}
