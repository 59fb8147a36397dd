//! "Save Data" and "Save Plots": dump whatever the live window currently
//! holds. Nothing is recorded in the background.
use log::info;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use crate::drivers::{render_time_series_png, ExportError, PlotSeries, PlotStyle};
use crate::plotter::Plotter;
use crate::types::Turbine;

/// The plotted window as a table: one row per tick, one column per line.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataWindow {
    pub columns: Vec<String>,
    /// `(time_s, values)`; `None` where a channel was skipped that tick.
    pub rows: Vec<(f64, Vec<Option<f64>>)>,
}

impl DataWindow {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

pub fn write_csv<W: Write>(window: &DataWindow, out: W) -> Result<(), ExportError> {
    let mut w = BufWriter::new(out);
    write!(w, "time_s")?;
    for column in &window.columns {
        write!(w, ",{column}")?;
    }
    writeln!(w)?;
    for (timestamp, values) in &window.rows {
        write!(w, "{timestamp:.3}")?;
        for value in values {
            match value {
                Some(v) => write!(w, ",{v:.4}")?,
                None => write!(w, ",")?,
            }
        }
        writeln!(w)?;
    }
    w.flush()?;
    Ok(())
}

/// Write `turbine_data_<unix-seconds>.csv` into `dir`.
pub fn save_csv(dir: &Path, window: &DataWindow) -> Result<PathBuf, ExportError> {
    if window.is_empty() {
        return Err(ExportError::Empty);
    }
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("turbine_data_{}.csv", unix_seconds()));
    write_csv(window, File::create(&path)?)?;
    info!("saved {} rows to {}", window.rows.len(), path.display());
    Ok(path)
}

/// Render one PNG per turbine (voltage, current and power against time)
/// as `turbine_<n>_<unix-seconds>.png`. Turbines with no data are skipped.
pub fn save_plots(dir: &Path, plotter: &Plotter, style: &PlotStyle) -> Result<Vec<PathBuf>, ExportError> {
    let stamp = unix_seconds();
    let mut saved = Vec::new();
    for turbine in Turbine::ALL {
        let lines = turbine_lines(plotter, turbine);
        if lines.iter().all(|(_, points)| points.is_empty()) {
            continue;
        }
        let series: Vec<PlotSeries<'_>> = lines
            .iter()
            .map(|(label, points)| PlotSeries {
                label: label.as_str(),
                points: points.as_slice(),
            })
            .collect();
        let png = render_time_series_png(&turbine.label(), &series, style)?;
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("turbine_{}_{stamp}.png", turbine.number()));
        fs::write(&path, png)?;
        info!("saved {}", path.display());
        saved.push(path);
    }
    if saved.is_empty() {
        return Err(ExportError::Empty);
    }
    Ok(saved)
}

fn turbine_lines(plotter: &Plotter, turbine: Turbine) -> Vec<(String, Vec<[f64; 2]>)> {
    let mut lines = Vec::new();
    for id in [turbine.voltage_channel(), turbine.current_channel()] {
        if let Some(buffer) = plotter.buffer(id) {
            lines.push((format!("{} ({})", id.quantity().name(), id.quantity().unit()), buffer.points()));
        }
    }
    lines.push(("Power (W)".to_string(), plotter.power_series(turbine)));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::ads112c04::InputMux;
    use crate::drivers::SimulatedAds112;
    use crate::surface::ChartSurface;
    use crate::hat::HatContext;
    use crate::reader::tests::{channel, settings};
    use crate::reader::AdcReader;
    use crate::types::ChannelId;

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("turboplot-{name}-{}", std::process::id()))
    }

    fn window() -> DataWindow {
        DataWindow {
            columns: vec!["Turbine 1 Voltage (V)".into(), "Turbine 1 Current (A)".into()],
            rows: vec![(1.0, vec![Some(12.5), Some(0.25)]), (2.0, vec![Some(12.0), None])],
        }
    }

    #[test]
    fn csv_has_header_and_blank_missing_cells() {
        let mut out = Vec::new();
        write_csv(&window(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "time_s,Turbine 1 Voltage (V),Turbine 1 Current (A)");
        assert_eq!(lines[1], "1.000,12.5000,0.2500");
        assert_eq!(lines[2], "2.000,12.0000,");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn save_csv_names_file_by_time() {
        let dir = scratch_dir("csv");
        let path = save_csv(&dir, &window()).unwrap();
        let name = path.file_name().and_then(|n| n.to_str()).unwrap().to_string();
        assert!(name.starts_with("turbine_data_") && name.ends_with(".csv"));
        assert!(fs::read_to_string(&path).unwrap().starts_with("time_s,"));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn save_plots_writes_one_png_per_turbine() {
        let chip = SimulatedAds112::with_levels(0x40, 5.0, [1.0, 0.0, 0.5, 0.0]);
        let reader = AdcReader::new(HatContext::from_parts(Box::new(chip), 0x40, None), settings(5));
        let channels = vec![
            channel(ChannelId::Turbine1Voltage, InputMux::Ain0, 10.0),
            channel(ChannelId::Turbine1Current, InputMux::Ain2, 2.0),
        ];
        let mut plotter = Plotter::new(reader, channels, 5, 3).unwrap();
        let mut surface = ChartSurface::default();
        for t in [1.0, 2.0] {
            plotter.tick_at(t);
            plotter.render(&mut surface);
        }
        let dir = scratch_dir("png");
        match save_plots(&dir, &plotter, &PlotStyle::default()) {
            Ok(paths) => {
                assert_eq!(paths.len(), 1);
                let name = paths[0].file_name().and_then(|n| n.to_str()).unwrap().to_string();
                assert!(name.starts_with("turbine_1_") && name.ends_with(".png"));
                assert_eq!(&fs::read(&paths[0]).unwrap()[..4], b"\x89PNG");
            }
            // headless hosts without any system font cannot draw labels
            Err(ExportError::Plot(msg)) if msg.to_lowercase().contains("font") => {
                eprintln!("skipped: {msg}")
            }
            Err(e) => panic!("save failed: {e}"),
        }
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn nothing_to_save_is_reported() {
        let dir = scratch_dir("empty");
        assert!(matches!(save_csv(&dir, &DataWindow::default()), Err(ExportError::Empty)));

        let chip = SimulatedAds112::with_levels(0x40, 5.0, [0.0; 4]);
        let reader = AdcReader::new(HatContext::from_parts(Box::new(chip), 0x40, None), settings(5));
        let channels = vec![channel(ChannelId::Turbine1Voltage, InputMux::Ain0, 1.0)];
        let plotter = Plotter::new(reader, channels, 5, 3).unwrap();
        assert!(matches!(
            save_plots(&dir, &plotter, &PlotStyle::default()),
            Err(ExportError::Empty)
        ));
    }
}
