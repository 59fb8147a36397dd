//! Poll-and-plot loop: one `tick` reads every configured channel, one
//! `render` pushes the buffers (and the derived power lines) to a display
//! surface. Ticks and renders alternate; a read failure skips that channel
//! for the tick and never stops the loop.
use log::{debug, error, info, warn};
use std::time::Instant;
use crate::drivers::{AdcError, BufferError, RollingBuffer};
use crate::reader::AdcReader;
use crate::recorder::DataWindow;
use crate::surface::DisplaySurface;
use crate::types::{Channel, ChannelId, Reading, Turbine};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlotterState {
    Idle,
    Polling,
    Rendering,
}

#[derive(Debug)]
pub struct ChannelFailure {
    pub channel: ChannelId,
    pub error: AdcError,
}

#[derive(Debug, Default)]
pub struct TickReport {
    pub timestamp: f64,
    pub appended: usize,
    pub failures: Vec<ChannelFailure>,
    /// The previous tick was never rendered, so nothing was read.
    pub deferred: bool,
}

struct ChannelTrace {
    channel: Channel,
    buffer: RollingBuffer,
    consecutive_failures: u32,
}

impl ChannelTrace {
    fn note_success(&mut self) {
        if self.consecutive_failures > 0 {
            debug!(
                "{}: read ok after {} failures",
                self.channel.id.label(),
                self.consecutive_failures
            );
        }
        self.consecutive_failures = 0;
    }

    fn note_failure(&mut self, threshold: u32, err: &AdcError) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        let label = self.channel.id.label();
        if self.consecutive_failures == threshold {
            error!(
                "{label}: {threshold} reads in a row failed ({err}); check the HAT wiring, address and reference setup"
            );
        } else {
            warn!("{label}: skipped this tick: {err}");
        }
    }
}

pub struct Plotter {
    reader: AdcReader,
    traces: Vec<ChannelTrace>,
    state: PlotterState,
    started_at: Instant,
    failure_report_threshold: u32,
}

impl Plotter {
    pub fn new(
        reader: AdcReader,
        channels: Vec<Channel>,
        capacity: usize,
        failure_report_threshold: u32,
    ) -> Result<Self, BufferError> {
        let traces = channels
            .into_iter()
            .map(|channel| -> Result<ChannelTrace, BufferError> {
                Ok(ChannelTrace {
                    channel,
                    buffer: RollingBuffer::with_capacity(capacity)?,
                    consecutive_failures: 0,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        info!("plotting {} channels, {capacity} points each", traces.len());
        Ok(Self {
            reader,
            traces,
            state: PlotterState::Idle,
            started_at: Instant::now(),
            failure_report_threshold: failure_report_threshold.max(1),
        })
    }

    pub fn state(&self) -> PlotterState {
        self.state
    }

    /// Seconds since the plotter was created.
    pub fn elapsed(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }

    pub fn hat_open(&self) -> bool {
        self.reader.hat().is_open()
    }

    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.traces.iter().map(|t| &t.channel)
    }

    pub fn buffer(&self, id: ChannelId) -> Option<&RollingBuffer> {
        self.trace(id).map(|t| &t.buffer)
    }

    pub fn latest(&self, id: ChannelId) -> Option<Reading> {
        self.buffer(id).and_then(|b| b.latest().copied())
    }

    /// Turbines with at least one configured channel.
    pub fn measured_turbines(&self) -> Vec<Turbine> {
        Turbine::ALL
            .into_iter()
            .filter(|t| self.trace(t.voltage_channel()).is_some() || self.trace(t.current_channel()).is_some())
            .collect()
    }

    /// Turbines with both their voltage and current channel configured.
    pub fn turbines(&self) -> Vec<Turbine> {
        Turbine::ALL
            .into_iter()
            .filter(|t| self.trace(t.voltage_channel()).is_some() && self.trace(t.current_channel()).is_some())
            .collect()
    }

    pub fn tick(&mut self) -> TickReport {
        let now = self.elapsed();
        self.tick_at(now)
    }

    /// Read every channel once, all stamped with `timestamp`.
    pub fn tick_at(&mut self, timestamp: f64) -> TickReport {
        let mut report = TickReport {
            timestamp,
            ..TickReport::default()
        };
        if self.state == PlotterState::Rendering {
            debug!("tick at {timestamp:.3}s deferred: previous tick not rendered yet");
            report.deferred = true;
            return report;
        }
        self.state = PlotterState::Polling;
        let threshold = self.failure_report_threshold;
        for trace in &mut self.traces {
            match self.reader.read(&trace.channel, timestamp) {
                Ok(reading) => match trace.buffer.push(reading) {
                    Ok(()) => {
                        trace.note_success();
                        report.appended += 1;
                    }
                    Err(e) => warn!("{}: reading dropped: {e}", trace.channel.id.label()),
                },
                Err(err) => {
                    trace.note_failure(threshold, &err);
                    report.failures.push(ChannelFailure {
                        channel: trace.channel.id,
                        error: err,
                    });
                }
            }
        }
        self.state = PlotterState::Rendering;
        report
    }

    /// Redraw one line per channel and one power line per turbine.
    pub fn render(&mut self, surface: &mut dyn DisplaySurface) {
        for trace in &self.traces {
            surface.upsert_series(&trace.channel.id.label(), trace.buffer.points());
        }
        for turbine in self.turbines() {
            surface.upsert_series(&turbine.power_label(), self.power_series(turbine));
        }
        surface.refresh();
        self.state = PlotterState::Idle;
    }

    /// One full timer period: tick, then render.
    pub fn step(&mut self, surface: &mut dyn DisplaySurface) -> TickReport {
        let report = self.tick();
        self.render(surface);
        report
    }

    /// Instantaneous power (V * I) at every timestamp where both the
    /// turbine's voltage and current were read.
    pub fn power_series(&self, turbine: Turbine) -> Vec<[f64; 2]> {
        let (Some(voltage), Some(current)) = (
            self.buffer(turbine.voltage_channel()),
            self.buffer(turbine.current_channel()),
        ) else {
            return Vec::new();
        };
        voltage
            .iter()
            .filter_map(|v| current.at(v.timestamp).map(|i| [v.timestamp, v.value * i.value]))
            .collect()
    }

    /// Power from the most recent co-timestamped voltage/current pair.
    pub fn latest_power(&self, turbine: Turbine) -> Option<f64> {
        self.power_series(turbine).last().map(|p| p[1])
    }

    /// Forget everything except the newest point of each channel.
    pub fn clear(&mut self) {
        for trace in &mut self.traces {
            trace.buffer.retain_latest();
        }
        info!("plot history cleared");
    }

    /// The visible window as a table, one row per tick timestamp.
    pub fn window(&self) -> DataWindow {
        let mut timestamps: Vec<f64> = self
            .traces
            .iter()
            .flat_map(|t| t.buffer.iter().map(|r| r.timestamp))
            .collect();
        timestamps.sort_by(f64::total_cmp);
        timestamps.dedup();

        let turbines = self.turbines();
        let powers: Vec<Vec<[f64; 2]>> = turbines.iter().map(|t| self.power_series(*t)).collect();
        let mut columns: Vec<String> = self
            .traces
            .iter()
            .map(|t| format!("{} ({})", t.channel.id.label(), t.channel.unit()))
            .collect();
        columns.extend(turbines.iter().map(|t| format!("{} (W)", t.power_label())));

        let rows = timestamps
            .into_iter()
            .map(|ts| {
                let mut values: Vec<Option<f64>> = self
                    .traces
                    .iter()
                    .map(|t| t.buffer.at(ts).map(|r| r.value))
                    .collect();
                values.extend(
                    powers
                        .iter()
                        .map(|series| series.iter().find(|p| p[0] == ts).map(|p| p[1])),
                );
                (ts, values)
            })
            .collect();
        DataWindow { columns, rows }
    }

    /// Power the converter down and release the HAT.
    pub fn shutdown(&mut self) {
        self.reader.shutdown();
    }

    fn trace(&self, id: ChannelId) -> Option<&ChannelTrace> {
        self.traces.iter().find(|t| t.channel.id == id)
    }
}
