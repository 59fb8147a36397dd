use thiserror::Error;
/// Failures of the two-wire bus or of the board's GPIO lines.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("no acknowledgment from device at address 0x{0:02x}")]
    NoAck(u8),
    #[error("short read from 0x{address:02x}: expected {expected} bytes, got {actual}")]
    ShortRead {
        address: u8,
        expected: usize,
        actual: usize,
    },
    #[error("i2c transfer failed: {0}")]
    Io(String),
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("bus already closed")]
    Closed,
}
/// Failures of a single conversion. Both are recoverable per poll.
#[derive(Debug, Error)]
pub enum AdcError {
    #[error(transparent)]
    Bus(#[from] BusError),
    #[error("conversion not ready after {polls} polls")]
    Timeout { polls: u32 },
}
impl AdcError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, AdcError::Timeout { .. })
    }
}
#[derive(Debug, Error, PartialEq)]
pub enum BufferError {
    #[error("buffer capacity must be greater than zero")]
    ZeroCapacity,
    #[error("reading at {actual:.3}s is not newer than the last one at {last:.3}s")]
    NonMonotonic { last: f64, actual: f64 },
}
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("nothing to export yet; wait for the first sample")]
    Empty,
    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to render plot: {0}")]
    Plot(String),
}
impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for ExportError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        ExportError::Plot(format!("{value:?}"))
    }
}
impl From<image::ImageError> for ExportError {
    fn from(value: image::ImageError) -> Self {
        ExportError::Plot(value.to_string())
    }
}
