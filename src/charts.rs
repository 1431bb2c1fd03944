// ChartSpec rasterization with plotters.
//
// Renders into an RGB8 buffer at a fixed resolution; the Excel path
// re-encodes it as PNG and the PDF path embeds the raw pixels. A spec
// without drawable data fails fast so the exporters can substitute
// their placeholder without touching the drawing backend.
use crate::error::{ReportError, Result};
use crate::report::{ChartKind, ChartSpec};
use plotters::prelude::*;

pub const CHART_WIDTH: u32 = 1200;
pub const CHART_HEIGHT: u32 = 600;

const PALETTE: [RGBColor; 6] = [
    RGBColor(0xFF, 0xA5, 0x00), // day orange
    RGBColor(0x1E, 0x3A, 0x5F), // night blue
    RGBColor(0x28, 0xA7, 0x45),
    RGBColor(0xDC, 0x35, 0x45),
    RGBColor(0x6F, 0x42, 0xC1),
    RGBColor(0x33, 0x66, 0xCC),
];

/// A rendered chart: packed RGB rows, top to bottom.
#[derive(Debug, Clone)]
pub struct RasterChart {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

impl RasterChart {
    /// PNG encoding for the spreadsheet embedding path.
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, self.width, self.height);
            encoder.set_color(png::ColorType::Rgb);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder
                .write_header()
                .map_err(|e| ReportError::Chart(e.to_string()))?;
            writer
                .write_image_data(&self.rgb)
                .map_err(|e| ReportError::Chart(e.to_string()))?;
        }
        Ok(out)
    }
}

/// Rasterize a chart specification at the fixed export resolution.
pub fn render(spec: &ChartSpec) -> Result<RasterChart> {
    validate(spec)?;
    let mut buf = vec![255u8; (CHART_WIDTH * CHART_HEIGHT * 3) as usize];
    {
        let root =
            BitMapBackend::with_buffer(&mut buf, (CHART_WIDTH, CHART_HEIGHT)).into_drawing_area();
        draw(spec, &root).map_err(|e| ReportError::Chart(e.to_string()))?;
        root.present()
            .map_err(|e| ReportError::Chart(e.to_string()))?;
    }
    Ok(RasterChart {
        width: CHART_WIDTH,
        height: CHART_HEIGHT,
        rgb: buf,
    })
}

fn validate(spec: &ChartSpec) -> Result<()> {
    if spec.series.is_empty() || spec.series.iter().all(|s| s.points.is_empty()) {
        return Err(ReportError::Chart(format!(
            "aucune donnée pour « {} »",
            spec.title
        )));
    }
    if spec.kind == ChartKind::Pie {
        let total: f64 = spec.series[0].points.iter().map(|(_, v)| v).sum();
        if total <= 0.0 {
            return Err(ReportError::Chart(format!(
                "total nul pour « {} »",
                spec.title
            )));
        }
    }
    Ok(())
}

type Root<'a> = DrawingArea<BitMapBackend<'a>, plotters::coord::Shift>;

fn draw(spec: &ChartSpec, root: &Root<'_>) -> std::result::Result<(), Box<dyn std::error::Error>> {
    root.fill(&WHITE)?;
    match spec.kind {
        ChartKind::Bar { horizontal: false } => draw_bars(spec, root, false),
        ChartKind::Bar { horizontal: true } => draw_bars(spec, root, true),
        ChartKind::GroupedBar => draw_grouped(spec, root),
        ChartKind::Pie => draw_pie(spec, root),
    }
}

fn axis_max(values: impl Iterator<Item = f64>) -> f64 {
    let max = values.fold(0.0f64, f64::max);
    if max <= 0.0 {
        1.0
    } else {
        max * 1.1
    }
}

fn short_label(labels: &[String], pos: f64) -> String {
    let idx = pos.floor() as usize;
    match labels.get(idx) {
        Some(l) if l.chars().count() > 14 => {
            let cut: String = l.chars().take(13).collect();
            format!("{}…", cut)
        }
        Some(l) => l.clone(),
        None => String::new(),
    }
}

fn draw_bars(
    spec: &ChartSpec,
    root: &Root<'_>,
    horizontal: bool,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let points = &spec.series[0].points;
    let labels: Vec<String> = points.iter().map(|(l, _)| l.clone()).collect();
    let n = points.len() as f64;
    let max = axis_max(points.iter().map(|(_, v)| *v));
    let color = PALETTE[5];

    if horizontal {
        let mut chart = ChartBuilder::on(root)
            .caption(&spec.title, ("sans-serif", 28))
            .margin(12)
            .x_label_area_size(50)
            .y_label_area_size(150)
            .build_cartesian_2d(0.0..max, 0.0..n)?;
        chart
            .configure_mesh()
            .disable_y_mesh()
            .y_labels(points.len())
            .y_label_formatter(&|y| short_label(&labels, *y))
            .draw()?;
        chart.draw_series(points.iter().enumerate().map(|(i, (_, v))| {
            Rectangle::new([(0.0, i as f64 + 0.15), (*v, i as f64 + 0.85)], color.filled())
        }))?;
    } else {
        let mut chart = ChartBuilder::on(root)
            .caption(&spec.title, ("sans-serif", 28))
            .margin(12)
            .x_label_area_size(110)
            .y_label_area_size(70)
            .build_cartesian_2d(0.0..n, 0.0..max)?;
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(points.len())
            .x_label_formatter(&|x| short_label(&labels, *x))
            .draw()?;
        chart.draw_series(points.iter().enumerate().map(|(i, (_, v))| {
            Rectangle::new([(i as f64 + 0.15, 0.0), (i as f64 + 0.85, *v)], color.filled())
        }))?;
    }
    Ok(())
}

fn draw_grouped(
    spec: &ChartSpec,
    root: &Root<'_>,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Category labels come from the first series; every series is keyed
    // on the same label sequence by the page generators.
    let labels: Vec<String> = spec.series[0].points.iter().map(|(l, _)| l.clone()).collect();
    let n = labels.len() as f64;
    let groups = spec.series.len();
    let max = axis_max(
        spec.series
            .iter()
            .flat_map(|s| s.points.iter().map(|(_, v)| *v)),
    );

    let mut chart = ChartBuilder::on(root)
        .caption(&spec.title, ("sans-serif", 28))
        .margin(12)
        .x_label_area_size(110)
        .y_label_area_size(70)
        .build_cartesian_2d(0.0..n, 0.0..max)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(labels.len())
        .x_label_formatter(&|x| short_label(&labels, *x))
        .draw()?;

    let band = 0.8 / groups as f64;
    for (s_idx, series) in spec.series.iter().enumerate() {
        let color = PALETTE[s_idx % PALETTE.len()];
        let offset = 0.1 + band * s_idx as f64;
        chart
            .draw_series(series.points.iter().enumerate().map(move |(i, (_, v))| {
                let left = i as f64 + offset;
                Rectangle::new([(left, 0.0), (left + band - 0.02, *v)], color.filled())
            }))?
            .label(series.label.clone())
            .legend(move |(x, y)| {
                Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.filled())
            });
    }
    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    Ok(())
}

fn draw_pie(
    spec: &ChartSpec,
    root: &Root<'_>,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let points = &spec.series[0].points;
    let sizes: Vec<f64> = points.iter().map(|(_, v)| *v).collect();
    let labels: Vec<String> = points.iter().map(|(l, _)| l.clone()).collect();
    let colors: Vec<RGBColor> = (0..points.len())
        .map(|i| PALETTE[i % PALETTE.len()])
        .collect();

    let titled = root.titled(&spec.title, ("sans-serif", 28))?;
    let (w, h) = titled.dim_in_pixel();
    let center = (w as i32 / 2, h as i32 / 2);
    let radius = (w.min(h) as f64) * 0.35;
    let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
    pie.label_style(("sans-serif", 20).into_font());
    titled.draw(&pie)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ChartSpec;

    // Rendering real charts needs fonts from the host; tests stick to
    // the validation path the exporters rely on for their placeholders.

    #[test]
    fn empty_spec_fails_before_drawing() {
        let spec = ChartSpec::bar("Vide", vec![]);
        let err = render(&spec).unwrap_err();
        assert!(err.to_string().contains("Vide"));
    }

    #[test]
    fn zero_total_pie_fails() {
        let spec = ChartSpec::pie("Nul", vec![("a".into(), 0.0), ("b".into(), 0.0)]);
        assert!(render(&spec).is_err());
    }

    #[test]
    fn png_encoding_of_a_raw_buffer() {
        let chart = RasterChart {
            width: 2,
            height: 2,
            rgb: vec![255; 12],
        };
        let png = chart.to_png().unwrap();
        assert_eq!(&png[1..4], b"PNG");
    }
}
