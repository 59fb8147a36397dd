use std::io::Cursor;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use plotters::prelude::LineSeries;
use plotters::prelude::*;
use crate::drivers::error::ExportError;
#[derive(Clone, Debug)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub background: RGBColor,
    pub palette: Vec<RGBColor>,
}
impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 500,
            height: 400,
            background: RGBColor(10, 10, 10),
            palette: vec![CYAN, YELLOW, MAGENTA, GREEN, RED, BLUE, WHITE],
        }
    }
}
/// One named line of (time, value) points.
pub struct PlotSeries<'a> {
    pub label: &'a str,
    pub points: &'a [[f64; 2]],
}
/// Draw the series against time on one chart and encode it as PNG.
pub fn render_time_series_png(
    title: &str,
    series: &[PlotSeries<'_>],
    style: &PlotStyle,
) -> Result<Vec<u8>, ExportError> {
    if series.iter().all(|s| s.points.is_empty()) {
        return Err(ExportError::Empty);
    }
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let all_points = || series.iter().flat_map(|s| s.points.iter());
        let (x_min, x_max) = all_points().fold((f64::MAX, f64::MIN), |(lo, hi), p| {
            (lo.min(p[0]), hi.max(p[0]))
        });
        let y_min = all_points().fold(0.0f64, |acc, p| acc.min(p[1]));
        let y_max = all_points().fold(0.0f64, |acc, p| acc.max(p[1]));
        let x_bounds = if (x_max - x_min).abs() < f64::EPSILON {
            (x_min - 0.5, x_max + 0.5)
        } else {
            (x_min, x_max)
        };
        let y_bounds = if (y_max - y_min).abs() < f64::EPSILON {
            (-1.0, 1.0)
        } else {
            (y_min, y_max * 1.05)
        };
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption(title, ("sans-serif", 20).into_font().color(&WHITE))
            .set_label_area_size(LabelAreaPosition::Left, 45)
            .set_label_area_size(LabelAreaPosition::Bottom, 40)
            .build_cartesian_2d(x_bounds.0..x_bounds.1, y_bounds.0..y_bounds.1)?;
        chart
            .configure_mesh()
            .x_desc("Time (s)")
            .label_style(("sans-serif", 12).into_font().color(&WHITE))
            .axis_desc_style(("sans-serif", 14).into_font().color(&WHITE))
            .light_line_style(&WHITE.mix(0.1))
            .draw()?;
        for (idx, line) in series.iter().enumerate() {
            let color = style.palette[idx % style.palette.len()];
            let points = line.points.iter().map(|p| (p[0], p[1]));
            chart
                .draw_series(LineSeries::new(points, &color))?
                .label(line.label)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
        }
        chart
            .configure_series_labels()
            .label_font(("sans-serif", 12).into_font().color(&WHITE))
            .border_style(&WHITE.mix(0.2))
            .background_style(&style.background)
            .draw()?;
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}
fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>, ExportError> {
    let image = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buffer.to_vec())
        .ok_or_else(|| ExportError::Plot("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    let dynamic = DynamicImage::ImageRgb8(image);
    dynamic.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn encodes_raw_pixels_as_png() {
        let pixels = vec![0u8; 4 * 3 * 3];
        let png = encode_png(&pixels, 4, 3).unwrap();
        assert_eq!(&png[1..4], b"PNG");
    }
    #[test]
    fn wrong_pixel_count_is_rejected() {
        assert!(matches!(encode_png(&[0u8; 5], 4, 3), Err(ExportError::Plot(_))));
    }
    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

    #[test]
    fn renders_lines_to_png() {
        let voltage = [[0.0, 11.8], [1.0, 12.4]];
        let current = [[0.0, 0.3], [1.0, 0.35]];
        let result = render_time_series_png(
            "Turbine 1",
            &[
                PlotSeries { label: "Voltage (V)", points: &voltage },
                PlotSeries { label: "Current (A)", points: &current },
            ],
            &PlotStyle::default(),
        );
        match result {
            Ok(png) => assert_eq!(&png[..8], PNG_MAGIC),
            // headless hosts without any system font cannot draw labels
            Err(ExportError::Plot(msg)) if msg.to_lowercase().contains("font") => {
                eprintln!("skipped: {msg}")
            }
            Err(e) => panic!("render failed: {e}"),
        }
    }

    #[test]
    fn empty_series_is_an_error() {
        let result = render_time_series_png(
            "Turbine 1",
            &[PlotSeries { label: "Voltage", points: &[] }],
            &PlotStyle::default(),
        );
        assert!(matches!(result, Err(ExportError::Empty)));
    }
}
