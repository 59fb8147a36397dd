//! The process-owned handle on the HAT: the I2C bus plus the converter's
//! RESET' and DRDY' lines. `main` opens it, hands it to the ADC reader, and
//! it is released through `close` (or on drop).
use log::info;
use crate::config::TurboConfig;
use crate::drivers::{BusError, I2cBus, ReadyLine, SimulatedAds112};
use crate::types::ConnectionMode;

pub struct HatContext {
    bus: Option<Box<dyn I2cBus>>,
    address: u8,
    ready_line: Option<Box<dyn ReadyLine>>,
    #[cfg(target_os = "linux")]
    reset_pin: Option<crate::drivers::bus::ResetPin>,
    mode: ConnectionMode,
}

impl HatContext {
    /// Open the transport selected by `config.mode`.
    pub fn open(config: &TurboConfig) -> Result<Self, BusError> {
        match config.mode {
            ConnectionMode::Simulation => {
                info!("using simulated ADS112C04 at 0x{:02x}", config.address);
                let chip = SimulatedAds112::wind_farm(config.address, config.reference.volts());
                Ok(Self::from_parts(Box::new(chip), config.address, None))
            }
            ConnectionMode::Hardware => Self::open_hardware(config),
        }
    }

    #[cfg(target_os = "linux")]
    fn open_hardware(config: &TurboConfig) -> Result<Self, BusError> {
        use crate::drivers::bus::{DrdyPin, PiI2cBus, ResetPin};
        use rppal::gpio::Gpio;
        let gpio = Gpio::new().map_err(|e| BusError::Gpio(e.to_string()))?;
        // RESET' low holds the converter in reset
        let reset_pin = ResetPin::hold_high(&gpio, config.reset_pin)?;
        let ready_line: Option<Box<dyn ReadyLine>> = match config.drdy_pin {
            Some(pin) => Some(Box::new(DrdyPin::open(&gpio, pin)?)),
            None => None,
        };
        let bus = PiI2cBus::open(config.bus)?;
        info!(
            "opened /dev/i2c-{} for ADS112C04 at 0x{:02x} (RESET' GPIO{}, DRDY' {})",
            config.bus,
            config.address,
            config.reset_pin,
            config
                .drdy_pin
                .map(|p| format!("GPIO{p}"))
                .unwrap_or_else(|| "polled via register 2".into())
        );
        let mut hat = Self::from_parts(Box::new(bus), config.address, ready_line);
        hat.reset_pin = Some(reset_pin);
        hat.mode = ConnectionMode::Hardware;
        Ok(hat)
    }

    #[cfg(not(target_os = "linux"))]
    fn open_hardware(_config: &TurboConfig) -> Result<Self, BusError> {
        Err(BusError::Io(
            "the HAT can only be reached from Linux; use simulation mode".into(),
        ))
    }

    /// Assemble a context around any bus, e.g. a simulated chip.
    pub fn from_parts(
        bus: Box<dyn I2cBus>,
        address: u8,
        ready_line: Option<Box<dyn ReadyLine>>,
    ) -> Self {
        Self {
            bus: Some(bus),
            address,
            ready_line,
            #[cfg(target_os = "linux")]
            reset_pin: None,
            mode: ConnectionMode::Simulation,
        }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn mode(&self) -> ConnectionMode {
        self.mode
    }

    pub fn is_open(&self) -> bool {
        self.bus.is_some()
    }

    pub fn bus(&mut self) -> Result<&mut (dyn I2cBus + 'static), BusError> {
        match self.bus.as_mut() {
            Some(bus) => Ok(bus.as_mut()),
            None => Err(BusError::Closed),
        }
    }

    pub fn ready_line(&mut self) -> Option<&mut (dyn ReadyLine + 'static)> {
        self.ready_line.as_deref_mut()
    }

    /// Release the bus and the GPIO lines. Safe to call more than once.
    pub fn close(&mut self) {
        if self.bus.take().is_some() {
            self.ready_line = None;
            #[cfg(target_os = "linux")]
            {
                self.reset_pin = None;
            }
            info!("HAT released");
        }
    }
}

impl Drop for HatContext {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::ads112c04::CMD_RESET;

    #[test]
    fn simulation_mode_opens_without_hardware() {
        let config = TurboConfig {
            mode: ConnectionMode::Simulation,
            ..TurboConfig::default()
        };
        let mut hat = HatContext::open(&config).unwrap();
        assert!(hat.is_open());
        assert_eq!(hat.mode(), ConnectionMode::Simulation);
        let address = hat.address();
        hat.bus().unwrap().write(address, CMD_RESET, &[]).unwrap();
    }

    #[test]
    fn closed_context_refuses_bus_access() {
        let chip = SimulatedAds112::with_levels(0x40, 5.0, [0.0; 4]);
        let mut hat = HatContext::from_parts(Box::new(chip), 0x40, None);
        hat.close();
        hat.close();
        assert!(!hat.is_open());
        assert!(matches!(hat.bus(), Err(BusError::Closed)));
    }
}
