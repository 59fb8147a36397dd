// src/gui.rs
use eframe::egui;
use egui::Color32;
use egui_plot::{Legend, Line, Plot, PlotPoints};
use log::{error, info};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use crate::drivers::PlotStyle;
use crate::plotter::Plotter;
use crate::recorder;
use crate::surface::ChartSurface;
use crate::types::{ChannelId, ConnectionMode, Quantity, Turbine, UiCommand};

const LOG_LINES: usize = 8;
const VOLTAGE_COLOR: Color32 = Color32::from_rgb(0, 255, 255);
const CURRENT_COLOR: Color32 = Color32::YELLOW;
const POWER_COLOR: Color32 = Color32::from_rgb(255, 0, 255);

pub struct TurboPlotApp {
    plotter: Plotter,
    surface: ChartSurface,
    mode: ConnectionMode,
    sample_period: Duration,
    next_tick: Instant,
    export_dir: PathBuf,
    plot_style: PlotStyle,
    last_tick_failed: bool,
    closing: bool,
    log_messages: Vec<String>,
}

impl TurboPlotApp {
    pub fn new(plotter: Plotter, mode: ConnectionMode, sample_period: Duration, export_dir: PathBuf) -> Self {
        let mut app = Self {
            plotter,
            surface: ChartSurface::default(),
            mode,
            sample_period,
            next_tick: Instant::now(),
            export_dir,
            plot_style: PlotStyle::default(),
            last_tick_failed: false,
            closing: false,
            log_messages: Vec::new(),
        };
        let source = match mode {
            ConnectionMode::Simulation => "simulated HAT",
            ConnectionMode::Hardware => "turbine HAT",
        };
        app.log(&format!("Reading {source} every {} ms", sample_period.as_millis()));
        app
    }

    pub fn plotter(&self) -> &Plotter {
        &self.plotter
    }

    pub fn surface(&self) -> &ChartSurface {
        &self.surface
    }

    pub fn log_messages(&self) -> &[String] {
        &self.log_messages
    }

    pub fn is_closing(&self) -> bool {
        self.closing
    }

    fn log(&mut self, msg: &str) {
        self.log_messages.push(format!("> {msg}"));
        if self.log_messages.len() > LOG_LINES {
            self.log_messages.remove(0);
        }
    }

    /// Run a tick and redraw if the sample timer has expired. Returns how
    /// long until the next one is due.
    pub fn poll(&mut self, now: Instant) -> Duration {
        if self.closing {
            return self.sample_period;
        }
        if now >= self.next_tick {
            let report = self.plotter.step(&mut self.surface);
            let failed = !report.failures.is_empty();
            if failed && !self.last_tick_failed {
                let names: Vec<String> = report.failures.iter().map(|f| f.channel.label()).collect();
                self.log(&format!("Read failed: {}", names.join(", ")));
            } else if !failed && self.last_tick_failed {
                self.log("Readings back");
            }
            self.last_tick_failed = failed;
            self.next_tick += self.sample_period;
            if self.next_tick <= now {
                // fell behind (slow bus, window dragged); skip the missed ticks
                self.next_tick = now + self.sample_period;
            }
        }
        self.next_tick.saturating_duration_since(now)
    }

    /// Handle one button press. Returns true once the window should close.
    pub fn apply(&mut self, command: UiCommand) -> bool {
        match command {
            UiCommand::Clear => {
                self.plotter.clear();
                self.plotter.render(&mut self.surface);
                self.log("Cleared");
            }
            UiCommand::SavePlots => {
                match recorder::save_plots(&self.export_dir, &self.plotter, &self.plot_style) {
                    Ok(paths) => {
                        let names: Vec<String> = paths
                            .iter()
                            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
                            .collect();
                        self.log(&format!("Saved {}", names.join(", ")));
                    }
                    Err(e) => {
                        error!("save plots: {e}");
                        self.log(&format!("Save Plots failed: {e}"));
                    }
                }
            }
            UiCommand::SaveData => match recorder::save_csv(&self.export_dir, &self.plotter.window()) {
                Ok(path) => {
                    let name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    self.log(&format!("Saved {name}"));
                }
                Err(e) => {
                    error!("save data: {e}");
                    self.log(&format!("Save Data failed: {e}"));
                }
            },
            UiCommand::Exit => {
                info!("exit requested");
                self.plotter.shutdown();
                self.closing = true;
            }
        }
        self.closing
    }

    fn readouts(&self, ui: &mut egui::Ui) {
        egui::Grid::new("readouts").num_columns(2).striped(true).show(ui, |ui| {
            for channel in self.plotter.channels() {
                ui.label(channel.id.label());
                let text = match self.plotter.latest(channel.id) {
                    Some(r) => format!("{:.3} {}", r.value, channel.unit()),
                    None => "--".to_string(),
                };
                ui.monospace(text);
                ui.end_row();
            }
            for turbine in self.plotter.turbines() {
                ui.label(turbine.power_label());
                let text = match self.plotter.latest_power(turbine) {
                    Some(w) => format!("{w:.3} W"),
                    None => "--".to_string(),
                };
                ui.monospace(text);
                ui.end_row();
            }
        });
    }

    /// Lines of a turbine's voltage/current plot, one per configured channel.
    pub fn channel_lines(&self, turbine: Turbine) -> Vec<(ChannelId, &[[f64; 2]])> {
        [turbine.voltage_channel(), turbine.current_channel()]
            .into_iter()
            .filter_map(|id| self.surface.series(&id.label()).map(|points| (id, points)))
            .collect()
    }

    /// The power line; only turbines with both channels have one.
    pub fn power_line(&self, turbine: Turbine) -> Option<&[[f64; 2]]> {
        if !self.plotter.turbines().contains(&turbine) {
            return None;
        }
        self.surface.series(&turbine.power_label())
    }

    fn turbine_plots(&self, ui: &mut egui::Ui, turbine: Turbine, height: f32) {
        let n = turbine.number();
        ui.heading(turbine.label());
        let lines = self.channel_lines(turbine);
        Plot::new(format!("turbine_{n}_vi"))
            .height(height)
            .legend(Legend::default())
            .x_axis_label("Time (s)")
            .show(ui, |plot_ui| {
                for (id, points) in lines {
                    let color = match id.quantity() {
                        Quantity::Voltage => VOLTAGE_COLOR,
                        Quantity::Current => CURRENT_COLOR,
                    };
                    plot_ui.line(
                        Line::new(PlotPoints::new(points.to_vec()))
                            .name(format!("{} ({})", id.quantity().name(), id.quantity().unit()))
                            .color(color),
                    );
                }
            });
        let Some(points) = self.power_line(turbine) else {
            return;
        };
        Plot::new(format!("turbine_{n}_power"))
            .height(height)
            .legend(Legend::default())
            .x_axis_label("Time (s)")
            .include_y(0.0)
            .show(ui, |plot_ui| {
                plot_ui.line(
                    Line::new(PlotPoints::new(points.to_vec()))
                        .name("Power (W)")
                        .color(POWER_COLOR),
                );
            });
    }
}

impl eframe::App for TurboPlotApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let wait = self.poll(Instant::now());

        let mut visuals = egui::Visuals::dark();
        visuals.widgets.noninteractive.bg_fill = Color32::from_rgb(10, 10, 15);
        ctx.set_visuals(visuals);

        let mut commands = Vec::new();
        egui::SidePanel::left("controls").min_width(280.0).show(ctx, |ui| {
            ui.add_space(10.0);
            ui.heading("Wind Turbine Monitor");
            let mode = match self.mode {
                ConnectionMode::Simulation => "Simulated HAT",
                ConnectionMode::Hardware => "ADS112C04 HAT",
            };
            ui.label(mode);
            ui.separator();

            self.readouts(ui);
            ui.add_space(10.0);

            ui.horizontal(|ui| {
                if ui.button("Clear").clicked() {
                    commands.push(UiCommand::Clear);
                }
                if ui.button("Save Plots").clicked() {
                    commands.push(UiCommand::SavePlots);
                }
            });
            ui.horizontal(|ui| {
                if ui.button("Save Data").clicked() {
                    commands.push(UiCommand::SaveData);
                }
                if ui.button("Exit").clicked() {
                    commands.push(UiCommand::Exit);
                }
            });

            ui.add_space(10.0);
            ui.separator();
            egui::ScrollArea::vertical().max_height(140.0).show(ui, |ui| {
                for m in &self.log_messages {
                    ui.monospace(m);
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let turbines = self.plotter.measured_turbines();
            if turbines.is_empty() {
                ui.label("No channels configured.");
                return;
            }
            let height = (ui.available_height() / 2.0 - 30.0).max(120.0);
            ui.columns(turbines.len(), |columns| {
                for (column, turbine) in columns.iter_mut().zip(turbines.iter()) {
                    self.turbine_plots(column, *turbine, height);
                }
            });
        });

        for command in commands {
            if self.apply(command) {
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                break;
            }
        }
        ctx.request_repaint_after(wait);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::ads112c04::InputMux;
    use crate::drivers::SimulatedAds112;
    use crate::hat::HatContext;
    use crate::reader::tests::{channel, settings};
    use crate::reader::AdcReader;

    fn app_with(channels: Vec<crate::types::Channel>) -> TurboPlotApp {
        let chip = SimulatedAds112::with_levels(0x40, 5.0, [1.0, 0.0, 0.5, 0.0]);
        let reader = AdcReader::new(HatContext::from_parts(Box::new(chip), 0x40, None), settings(5));
        let plotter = Plotter::new(reader, channels, 10, 3).unwrap();
        let dir = std::env::temp_dir().join(format!("turboplot-gui-{}", std::process::id()));
        TurboPlotApp::new(plotter, ConnectionMode::Simulation, Duration::from_millis(1000), dir)
    }

    fn app() -> TurboPlotApp {
        app_with(vec![
            channel(ChannelId::Turbine1Voltage, InputMux::Ain0, 10.0),
            channel(ChannelId::Turbine1Current, InputMux::Ain2, 2.0),
        ])
    }

    #[test]
    fn poll_ticks_only_when_due() {
        let mut app = app();
        let start = Instant::now();
        let wait = app.poll(start);
        assert!(wait <= Duration::from_millis(1000));
        assert_eq!(app.surface().generation(), 1);
        app.poll(start);
        assert_eq!(app.surface().generation(), 1);
        assert_eq!(
            app.surface().series("Turbine 1 Voltage").map(|s| s.len()),
            Some(1)
        );
        assert!(app.surface().series("Turbine 1 Power").is_some());
    }

    #[test]
    fn lone_channel_is_drawn_without_power() {
        let mut app = app_with(vec![channel(ChannelId::Turbine1Voltage, InputMux::Ain0, 10.0)]);
        app.poll(Instant::now());
        assert_eq!(app.plotter().measured_turbines(), vec![Turbine::One]);
        let lines = app.channel_lines(Turbine::One);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].0, ChannelId::Turbine1Voltage);
        assert_eq!(lines[0].1, app.surface().series("Turbine 1 Voltage").unwrap());
        assert_eq!(lines[0].1.len(), 1);
        assert!(app.power_line(Turbine::One).is_none());
        assert!(app.channel_lines(Turbine::Two).is_empty());
    }

    #[test]
    fn paired_channels_get_a_power_line() {
        let mut app = app();
        app.poll(Instant::now());
        assert_eq!(app.channel_lines(Turbine::One).len(), 2);
        assert_eq!(app.power_line(Turbine::One).map(|p| p.len()), Some(1));
    }

    #[test]
    fn clear_and_exit() {
        let mut app = app();
        app.poll(Instant::now());
        assert!(!app.apply(UiCommand::Clear));
        assert_eq!(app.plotter().buffer(ChannelId::Turbine1Voltage).map(|b| b.len()), Some(1));
        assert!(app.apply(UiCommand::Exit));
        assert!(app.is_closing());
        assert!(!app.plotter().hat_open());
    }

    #[test]
    fn on_screen_log_keeps_last_lines() {
        let mut app = app();
        for _ in 0..20 {
            app.apply(UiCommand::Clear);
        }
        assert_eq!(app.log_messages().len(), LOG_LINES);
        assert!(app.log_messages().iter().all(|m| m == "> Cleared"));
    }

    #[test]
    fn saving_before_first_sample_reports_failure() {
        let mut app = app();
        app.apply(UiCommand::SaveData);
        let last = app.log_messages().last().cloned().unwrap_or_default();
        assert!(last.starts_with("> Save Data failed"));
    }
}
