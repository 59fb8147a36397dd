//! Register-oriented two-wire bus abstraction and the Raspberry Pi backend.
//!
//! The converter is driven with one-byte commands, optionally followed by a
//! payload, and answers reads that follow a command byte. `write` with an
//! empty payload sends the bare command.
use crate::drivers::error::BusError;
/// Byte-oriented register access to devices on a 7-bit addressed bus.
pub trait I2cBus {
    /// Send `register` followed by `bytes` to the device at `address`.
    fn write(&mut self, address: u8, register: u8, bytes: &[u8]) -> Result<(), BusError>;
    /// Send `register`, then read `length` bytes back (repeated start).
    fn read(&mut self, address: u8, register: u8, length: usize) -> Result<Vec<u8>, BusError>;
}
/// A conversion-ready indicator external to the register map (the DRDY' pin).
pub trait ReadyLine {
    fn is_ready(&mut self) -> Result<bool, BusError>;
}
#[cfg(target_os = "linux")]
pub use self::linux::{DrdyPin, PiI2cBus, ResetPin};
#[cfg(target_os = "linux")]
mod linux {
    use log::debug;
    use rppal::gpio::{Gpio, InputPin, OutputPin};
    use rppal::i2c::I2c;
    use super::{I2cBus, ReadyLine};
    use crate::drivers::error::BusError;
    // errno values the kernel reports when nothing acknowledges the address
    const ENXIO: i32 = 6;
    const EREMOTEIO: i32 = 121;
    /// `/dev/i2c-N` on the Pi, through rppal.
    pub struct PiI2cBus {
        i2c: I2c,
        selected: Option<u8>,
    }
    impl PiI2cBus {
        pub fn open(bus: u8) -> Result<Self, BusError> {
            let i2c = I2c::with_bus(bus).map_err(|e| BusError::Io(format!("/dev/i2c-{bus}: {e}")))?;
            debug!("opened /dev/i2c-{bus}");
            Ok(Self { i2c, selected: None })
        }
        fn select(&mut self, address: u8) -> Result<(), BusError> {
            if self.selected != Some(address) {
                self.i2c
                    .set_slave_address(u16::from(address))
                    .map_err(|e| map_i2c_error(address, e))?;
                self.selected = Some(address);
            }
            Ok(())
        }
    }
    impl I2cBus for PiI2cBus {
        fn write(&mut self, address: u8, register: u8, bytes: &[u8]) -> Result<(), BusError> {
            self.select(address)?;
            let mut frame = Vec::with_capacity(bytes.len() + 1);
            frame.push(register);
            frame.extend_from_slice(bytes);
            let written = self
                .i2c
                .write(&frame)
                .map_err(|e| map_i2c_error(address, e))?;
            if written != frame.len() {
                return Err(BusError::Io(format!(
                    "wrote {written} of {} bytes to 0x{address:02x}",
                    frame.len()
                )));
            }
            Ok(())
        }
        fn read(&mut self, address: u8, register: u8, length: usize) -> Result<Vec<u8>, BusError> {
            self.select(address)?;
            let mut buffer = vec![0u8; length];
            self.i2c
                .write_read(&[register], &mut buffer)
                .map_err(|e| map_i2c_error(address, e))?;
            Ok(buffer)
        }
    }
    fn map_i2c_error(address: u8, error: rppal::i2c::Error) -> BusError {
        match error {
            rppal::i2c::Error::Io(io) => match io.raw_os_error() {
                Some(ENXIO) | Some(EREMOTEIO) => BusError::NoAck(address),
                _ => BusError::Io(io.to_string()),
            },
            other => BusError::Io(other.to_string()),
        }
    }
    /// DRDY' input; the converter pulls it low when a result is waiting.
    pub struct DrdyPin {
        pin: InputPin,
    }
    impl DrdyPin {
        pub fn open(gpio: &Gpio, bcm: u8) -> Result<Self, BusError> {
            let pin = gpio
                .get(bcm)
                .map_err(|e| BusError::Gpio(format!("DRDY' on GPIO{bcm}: {e}")))?
                .into_input_pullup();
            Ok(Self { pin })
        }
    }
    impl ReadyLine for DrdyPin {
        fn is_ready(&mut self) -> Result<bool, BusError> {
            Ok(self.pin.is_low())
        }
    }
    /// RESET' output, held high while the converter runs. rppal returns the
    /// pin to its previous mode when this is dropped.
    pub struct ResetPin {
        _pin: OutputPin,
    }
    impl ResetPin {
        pub fn hold_high(gpio: &Gpio, bcm: u8) -> Result<Self, BusError> {
            let mut pin = gpio
                .get(bcm)
                .map_err(|e| BusError::Gpio(format!("RESET' on GPIO{bcm}: {e}")))?
                .into_output();
            pin.set_high();
            Ok(Self { _pin: pin })
        }
    }
}
