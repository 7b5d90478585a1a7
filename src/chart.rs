use egui::Color32;
use egui_plot::{Line, PlotPoints};

use crate::store::Entry;

pub const WEIGHT_COLOR: Color32 = Color32::from_rgb(54, 162, 235);
pub const REPS_COLOR: Color32 = Color32::from_rgb(255, 99, 132);

/// Parallel date/weight/reps sequences for one machine, in the order the
/// entries were given (ascending date when they come from the store).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartSeries {
    pub dates: Vec<String>,
    pub weights: Vec<f64>,
    pub reps: Vec<f64>,
}

impl ChartSeries {
    pub fn from_entries(entries: &[Entry]) -> Self {
        Self {
            dates: entries.iter().map(|e| e.date.clone()).collect(),
            weights: entries.iter().map(|e| e.weight).collect(),
            reps: entries.iter().map(|e| e.reps).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// The "Weight" and "Reps" lines, plotted against the entry index.
    ///
    /// A series is split wherever a value is not finite, so bad readings show
    /// up as gaps. Pieces of one series share a name and colour and therefore
    /// a single legend entry.
    pub fn lines(&self) -> Vec<Line> {
        let mut lines = Vec::new();
        for (name, values, color) in [
            ("Weight", &self.weights, WEIGHT_COLOR),
            ("Reps", &self.reps, REPS_COLOR),
        ] {
            for segment in finite_segments(values) {
                lines.push(
                    Line::new(PlotPoints::from(segment))
                        .name(name)
                        .color(color)
                        .width(2.0),
                );
            }
        }
        lines
    }

    /// Axis label for a tick at `x`: the date of that entry, or nothing
    /// between entries.
    pub fn date_label(&self, x: f64) -> String {
        let idx = x.round();
        if (x - idx).abs() > 1e-6 || idx < 0.0 {
            return String::new();
        }
        self.dates.get(idx as usize).cloned().unwrap_or_default()
    }
}

/// Runs of consecutive finite points as `[index, value]` pairs.
pub fn finite_segments(values: &[f64]) -> Vec<Vec<[f64; 2]>> {
    let mut segments = Vec::new();
    let mut current: Vec<[f64; 2]> = Vec::new();
    for (i, v) in values.iter().enumerate() {
        if v.is_finite() {
            current.push([i as f64, *v]);
        } else if !current.is_empty() {
            segments.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}
