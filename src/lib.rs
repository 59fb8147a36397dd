//! Live voltage, current and power plots for the wind turbine measurement
//! HAT: an ADS112C04 converter on the Raspberry Pi's I2C bus.
pub mod config;
pub mod drivers;
pub mod gui;
pub mod hat;
pub mod plotter;
pub mod reader;
pub mod recorder;
pub mod surface;
pub mod types;
