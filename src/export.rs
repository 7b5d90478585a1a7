use plotters::prelude::*;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

use crate::chart::{ChartSeries, finite_segments};
use crate::store::Entry;

/// File formats offered for exporting a machine's entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    /// Pick the format from the file extension, defaulting to CSV.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ExportFormat::Json,
            _ => ExportFormat::Csv,
        }
    }
}

pub fn write_json<T: Serialize + ?Sized, P: AsRef<Path>>(
    value: &T,
    path: P,
) -> std::io::Result<()> {
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(file, value).map_err(std::io::Error::other)
}

pub fn write_csv<T: Serialize>(writer: impl Write, records: &[T]) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for r in records {
        wtr.serialize(r)?;
    }
    wtr.flush().map_err(Into::into)
}

pub fn save_entries_csv<P: AsRef<Path>>(path: P, entries: &[Entry]) -> csv::Result<()> {
    write_csv(std::fs::File::create(path)?, entries)
}

pub fn save_entries_json<P: AsRef<Path>>(path: P, entries: &[Entry]) -> std::io::Result<()> {
    write_json(entries, path)
}

/// Render the weight/reps chart for one machine to a PNG file.
pub fn save_chart_png(
    path: &Path,
    title: &str,
    series: &ChartSeries,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = BitMapBackend::new(path, (800, 400)).into_drawing_area();
    root.fill(&WHITE)?;
    if series.is_empty() {
        root.present()?;
        return Ok(());
    }

    let (min, max) = value_range(series);
    let last = series.dates.len().saturating_sub(1).max(1);
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 25))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0f64..last as f64, min..max)?;
    chart
        .configure_mesh()
        .x_desc("Date")
        .x_labels(series.dates.len().min(10))
        .x_label_formatter(&|x| series.date_label(*x))
        .draw()?;

    let weight_color = RGBColor(54, 162, 235);
    let reps_color = RGBColor(255, 99, 132);
    for (name, values, color) in [
        ("Weight", &series.weights, weight_color),
        ("Reps", &series.reps, reps_color),
    ] {
        for (i, segment) in finite_segments(values).into_iter().enumerate() {
            let drawn = chart.draw_series(LineSeries::new(
                segment.into_iter().map(|[x, y]| (x, y)),
                color.stroke_width(2),
            ))?;
            if i == 0 {
                drawn
                    .label(name)
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
            }
        }
    }
    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Vertical extent covering every finite value and zero, padded so flat
/// series still get a visible band.
fn value_range(series: &ChartSeries) -> (f64, f64) {
    let (min, max) = series
        .weights
        .iter()
        .chain(series.reps.iter())
        .filter(|v| v.is_finite())
        .fold((0.0_f64, 0.0_f64), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    if min == max {
        (min - 1.0, max + 1.0)
    } else {
        let pad = (max - min) * 0.05;
        (min - pad, max + pad)
    }
}
