//! PNG chart rendering with `plotters`.
//!
//! Text is rasterised with the bundled DejaVu Sans through `ab_glyph`, so no
//! system font libraries are needed.
//!
//! Charts use a numeric x axis (`0..n` over the table index) and map tick
//! positions back to the index labels, so day, week and source axes share
//! the same drawing code.

use std::f64::consts::TAU;
use std::path::Path;
use std::sync::OnceLock;

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::{register_font, FontStyle};

use crate::error::{AppError, Result};
use crate::models::Sentiment;

use super::frame::Series;

const WIDE: (u32, u32) = (1200, 600);
const SQUARE: (u32, u32) = (640, 640);
const FONT: &str = "sans-serif";
static FONT_DATA: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

const PALETTE: [RGBColor; 10] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
    RGBColor(188, 189, 34),
    RGBColor(23, 190, 207),
];

pub fn category_color(i: usize) -> RGBColor {
    PALETTE[i % PALETTE.len()]
}

pub fn sentiment_color(sentiment: Sentiment) -> RGBColor {
    match sentiment {
        Sentiment::Positive => RGBColor(44, 160, 44),
        Sentiment::Negative => RGBColor(214, 39, 40),
        Sentiment::Neutral => RGBColor(127, 127, 127),
    }
}

fn chart_err<E: std::fmt::Display>(e: E) -> AppError {
    AppError::Chart(e.to_string())
}

fn register_fonts() -> Result<()> {
    static REGISTERED: OnceLock<bool> = OnceLock::new();
    let ok = *REGISTERED.get_or_init(|| register_font(FONT, FontStyle::Normal, FONT_DATA).is_ok());
    if ok {
        Ok(())
    } else {
        Err(AppError::Chart("bundled font could not be loaded".to_string()))
    }
}

/// White PNG canvas written to `path` on `present()`.
fn canvas(path: &Path, size: (u32, u32)) -> Result<DrawingArea<BitMapBackend<'_>, Shift>> {
    register_fonts()?;
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;
    Ok(root)
}

/// Label for a tick at `x`, blank between index positions.
fn label_at(labels: &[String], x: f64) -> String {
    let i = x.round();
    if (x - i).abs() > 1e-6 || i < 0.0 {
        return String::new();
    }
    labels.get(i as usize).cloned().unwrap_or_default()
}

fn axis_max(max: f64) -> f64 {
    (max * 1.1).max(1.0)
}

fn index_range(n: usize) -> std::ops::Range<f64> {
    -0.5..(n as f64 - 0.5)
}

pub struct Line {
    pub label: String,
    pub color: RGBAColor,
    pub width: u32,
    pub values: Vec<Option<f64>>,
}

pub fn line_chart(
    path: &Path,
    title: &str,
    y_desc: &str,
    x_labels: &[String],
    lines: &[Line],
) -> Result<()> {
    let max = lines
        .iter()
        .flat_map(|l| l.values.iter().flatten().copied())
        .fold(0.0, f64::max);

    let root = canvas(path, WIDE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, (FONT, 24))
        .margin(16)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(index_range(x_labels.len()), 0f64..axis_max(max))
        .map_err(chart_err)?;

    chart
        .configure_mesh()
        .x_labels(x_labels.len().min(12))
        .x_label_formatter(&|x| label_at(x_labels, *x))
        .y_desc(y_desc)
        .draw()
        .map_err(chart_err)?;

    for line in lines {
        let color = line.color;
        let width = line.width;
        let points = line
            .values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.map(|v| (i as f64, v)));

        chart
            .draw_series(LineSeries::new(points, color.stroke_width(width)))
            .map_err(chart_err)?
            .label(line.label.as_str())
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(width))
            });
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .position(SeriesLabelPosition::UpperLeft)
        .draw()
        .map_err(chart_err)?;

    root.present().map_err(chart_err)?;
    Ok(())
}

/// Layers stacked bottom-up in `series` order.
pub fn stacked_area(path: &Path, title: &str, x_labels: &[String], series: &[Series]) -> Result<()> {
    let n = x_labels.len();
    let mut tops: Vec<Vec<f64>> = Vec::with_capacity(series.len());
    let mut running = vec![0.0; n];
    for s in series {
        for (acc, v) in running.iter_mut().zip(&s.values) {
            *acc += v;
        }
        tops.push(running.clone());
    }
    let max = running.iter().copied().fold(0.0, f64::max);

    let root = canvas(path, WIDE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, (FONT, 24))
        .margin(16)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(index_range(n), 0f64..axis_max(max))
        .map_err(chart_err)?;

    chart
        .configure_mesh()
        .x_labels(n.min(12))
        .x_label_formatter(&|x| label_at(x_labels, *x))
        .y_desc("Mentions")
        .draw()
        .map_err(chart_err)?;

    // Tallest layer first so lower layers paint over it.
    for (i, (s, top)) in series.iter().zip(&tops).enumerate().rev() {
        let color = category_color(i);
        let points = top.iter().enumerate().map(|(x, y)| (x as f64, *y));
        chart
            .draw_series(AreaSeries::new(points, 0.0, color.mix(0.6)).border_style(color))
            .map_err(chart_err)?
            .label(s.label.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 15, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .position(SeriesLabelPosition::UpperLeft)
        .draw()
        .map_err(chart_err)?;

    root.present().map_err(chart_err)?;
    Ok(())
}

/// Side-by-side bars per index position, one color per series.
pub fn grouped_bars(
    path: &Path,
    title: &str,
    x_desc: &str,
    x_labels: &[String],
    series: &[Series],
    colors: &[RGBColor],
) -> Result<()> {
    let n = x_labels.len();
    let max = series
        .iter()
        .flat_map(|s| s.values.iter().copied())
        .fold(0.0, f64::max);
    let width = 0.8 / series.len().max(1) as f64;

    let root = canvas(path, WIDE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, (FONT, 24))
        .margin(16)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(index_range(n), 0f64..axis_max(max))
        .map_err(chart_err)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n.min(24))
        .x_label_formatter(&|x| label_at(x_labels, *x))
        .x_desc(x_desc)
        .y_desc("Mentions")
        .draw()
        .map_err(chart_err)?;

    for (j, s) in series.iter().enumerate() {
        let color = colors.get(j).copied().unwrap_or_else(|| category_color(j));
        let offset = -0.4 + j as f64 * width;
        chart
            .draw_series(s.values.iter().enumerate().map(move |(i, v)| {
                let x0 = i as f64 + offset;
                Rectangle::new([(x0, 0.0), (x0 + width, *v)], color.filled())
            }))
            .map_err(chart_err)?
            .label(s.label.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 15, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(chart_err)?;

    root.present().map_err(chart_err)?;
    Ok(())
}

/// Horizontal stacked bars, first label at the top.
pub fn stacked_hbars(
    path: &Path,
    title: &str,
    y_labels: &[String],
    series: &[Series],
    colors: &[RGBColor],
) -> Result<()> {
    let n = y_labels.len();
    let totals: Vec<f64> = (0..n)
        .map(|i| series.iter().map(|s| s.values[i]).sum())
        .collect();
    let max = totals.iter().copied().fold(0.0, f64::max);
    // rows are drawn bottom-up, so reverse the labels for the axis
    let axis_labels: Vec<String> = y_labels.iter().rev().cloned().collect();

    let root = canvas(path, (1200, 200 + 30 * n as u32))?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, (FONT, 24))
        .margin(16)
        .x_label_area_size(40)
        .y_label_area_size(220)
        .build_cartesian_2d(0f64..axis_max(max), index_range(n))
        .map_err(chart_err)?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(n)
        .y_label_formatter(&|y| label_at(&axis_labels, *y))
        .x_desc("Articles")
        .draw()
        .map_err(chart_err)?;

    let mut left = vec![0.0; n];
    for (j, s) in series.iter().enumerate() {
        let color = colors.get(j).copied().unwrap_or_else(|| category_color(j));
        let bars: Vec<_> = s
            .values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let y = (n - 1 - i) as f64;
                let bar = Rectangle::new([(left[i], y - 0.4), (left[i] + v, y + 0.4)], color.filled());
                left[i] += v;
                bar
            })
            .collect();

        chart
            .draw_series(bars)
            .map_err(chart_err)?
            .label(s.label.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 15, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .position(SeriesLabelPosition::LowerRight)
        .draw()
        .map_err(chart_err)?;

    root.present().map_err(chart_err)?;
    Ok(())
}

pub struct Slice {
    pub label: String,
    pub value: f64,
    pub color: RGBColor,
}

/// Pie chart drawn as polygon wedges, starting at twelve o'clock and
/// running clockwise.
pub fn pie(path: &Path, title: &str, slices: &[Slice]) -> Result<()> {
    let total: f64 = slices.iter().map(|s| s.value).sum();
    if total <= 0.0 {
        return Err(AppError::Chart(format!("{title}: nothing to plot")));
    }

    let root = canvas(path, SQUARE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, (FONT, 24))
        .margin(16)
        .build_cartesian_2d(-1.3f64..1.3, -1.3f64..1.3)
        .map_err(chart_err)?;

    let mut start = 0.0;
    for slice in slices.iter().filter(|s| s.value > 0.0) {
        let sweep = slice.value / total * TAU;
        let steps = ((sweep / TAU) * 120.0).ceil().max(2.0) as usize;
        let point = |angle: f64, r: f64| (r * angle.sin(), r * angle.cos());

        let mut wedge = vec![(0.0, 0.0)];
        wedge.extend((0..=steps).map(|k| point(start + sweep * k as f64 / steps as f64, 1.0)));

        let color = slice.color;
        chart
            .draw_series(std::iter::once(Polygon::new(wedge, color.filled())))
            .map_err(chart_err)?
            .label(slice.label.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 15, y + 5)], color.filled()));

        let (lx, ly) = point(start + sweep / 2.0, 0.65);
        let share = format!("{:.1}%", slice.value / total * 100.0);
        chart
            .draw_series(std::iter::once(Text::new(
                share,
                (lx - 0.1, ly + 0.05),
                (FONT, 16).into_font().color(&WHITE),
            )))
            .map_err(chart_err)?;

        start += sweep;
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .position(SeriesLabelPosition::LowerRight)
        .draw()
        .map_err(chart_err)?;

    root.present().map_err(chart_err)?;
    Ok(())
}

/// Grid of cells shaded from white (zero) to red (the table maximum).
pub fn heatmap(path: &Path, title: &str, x_labels: &[String], series: &[Series]) -> Result<()> {
    let n = x_labels.len();
    let rows = series.len();
    let max = series
        .iter()
        .flat_map(|s| s.values.iter().copied())
        .fold(0.0, f64::max)
        .max(1.0);
    let row_labels: Vec<String> = series.iter().map(|s| s.label.clone()).collect();

    let root = canvas(path, (1200, 160 + 60 * rows as u32))?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, (FONT, 24))
        .margin(16)
        .x_label_area_size(40)
        .y_label_area_size(100)
        .build_cartesian_2d(index_range(n), index_range(rows))
        .map_err(chart_err)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(n.min(15))
        .x_label_formatter(&|x| label_at(x_labels, *x))
        .y_labels(rows)
        .y_label_formatter(&|y| label_at(&row_labels, *y))
        .draw()
        .map_err(chart_err)?;

    for (row, s) in series.iter().enumerate() {
        let y = row as f64;
        chart
            .draw_series(s.values.iter().enumerate().map(move |(i, v)| {
                let fade = (255.0 * (1.0 - v / max)).round() as u8;
                let x = i as f64;
                Rectangle::new(
                    [(x - 0.5, y - 0.5), (x + 0.5, y + 0.5)],
                    RGBColor(255, fade, fade).filled(),
                )
            }))
            .map_err(chart_err)?;
    }

    root.present().map_err(chart_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_only_on_index_positions() {
        let labels = vec!["a".to_string(), "b".to_string()];
        assert_eq!(label_at(&labels, 1.0), "b");
        assert_eq!(label_at(&labels, 0.5), "");
        assert_eq!(label_at(&labels, -1.0), "");
        assert_eq!(label_at(&labels, 5.0), "");
    }

    #[test]
    fn writes_png_files() {
        let dir = tempfile::tempdir().unwrap();
        let labels: Vec<String> = ["Mon", "Tue", "Wed"].iter().map(|s| s.to_string()).collect();
        let series = vec![
            Series { label: "Trump".into(), values: vec![1.0, 3.0, 2.0] },
            Series { label: "Putin".into(), values: vec![0.0, 1.0, 4.0] },
        ];

        let bars = dir.path().join("bars.png");
        grouped_bars(&bars, "Weekday", "Day", &labels, &series, &[]).unwrap();

        let wedges = dir.path().join("pie.png");
        pie(
            &wedges,
            "Sentiment",
            &[
                Slice { label: "positive".into(), value: 2.0, color: sentiment_color(Sentiment::Positive) },
                Slice { label: "negative".into(), value: 1.0, color: sentiment_color(Sentiment::Negative) },
            ],
        )
        .unwrap();

        for path in [bars, wedges] {
            let bytes = std::fs::read(&path).unwrap();
            assert!(bytes.starts_with(b"\x89PNG"), "{} is not a PNG image", path.display());
        }
    }
}
