// src/main.rs
use anyhow::{anyhow, Context};
use eframe::egui;
use log::{info, warn};
use turboplot::config::{TurboConfig, CONFIG_ENV};
use turboplot::gui::TurboPlotApp;
use turboplot::hat::HatContext;
use turboplot::plotter::Plotter;
use turboplot::reader::AdcReader;

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let path = TurboConfig::locate(std::env::args().skip(1), std::env::var(CONFIG_ENV).ok());
    let config = TurboConfig::load_or_default(path.as_deref()).context("loading configuration")?;
    if let Some(path) = &path {
        info!("configuration from {}", path.display());
    }
    let channels = config.channels()?;
    let settings = config.converter_settings()?;

    let hat = HatContext::open(&config)
        .with_context(|| format!("opening the HAT on /dev/i2c-{} at 0x{:02x}", config.bus, config.address))?;
    let mut reader = AdcReader::new(hat, settings);
    if let Err(e) = reader.init() {
        // every read reconfigures the chip, so a late-powered board still comes up
        warn!("ADC did not answer the reset: {e}");
    }
    let plotter = Plotter::new(reader, channels, config.buffer_capacity, config.failure_report_threshold)?;
    let app = TurboPlotApp::new(plotter, config.mode, config.sample_period(), config.export_dir.clone());

    let viewport = egui::ViewportBuilder::default()
        .with_inner_size([1280.0, 800.0])
        .with_min_inner_size([900.0, 600.0])
        .with_title("Wind Turbine Monitor");
    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };
    eframe::run_native("turboplot", options, Box::new(move |_cc| Box::new(app)))
        .map_err(|e| anyhow!("window error: {e}"))
}
