// src/drivers/mod.rs
pub mod ads112c04;
pub mod buffer;
pub mod bus;
pub mod error;
pub mod plot;
pub mod simulated;
pub use buffer::RollingBuffer;
pub use bus::{I2cBus, ReadyLine};
pub use error::{AdcError, BufferError, BusError, ExportError};
pub use plot::{render_time_series_png, PlotSeries, PlotStyle};
pub use simulated::{InputModel, SimulatedAds112};
