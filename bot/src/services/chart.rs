use std::path::Path;

use anyhow::{Context, Result};
use chrono::DateTime;
use plotters::prelude::*;
use plotters::style::register_font;

use crate::models::History;

const ONE_DAY: i64 = 24 * 60 * 60;
const CHART_FONT: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

lazy_static::lazy_static! {
    // Bitmap text needs a registered face; every label uses "sans-serif".
    static ref FONT_LOADED: bool =
        register_font("sans-serif", FontStyle::Normal, CHART_FONT).is_ok();
}

/// Produces the image attached to each post.
pub trait ChartRenderer: Send + Sync {
    fn render(&self, history: &History, output: &Path) -> Result<()>;
}

/// Line chart of the running mean (in minutes) over publish time, as PNG.
pub struct PngChartRenderer {
    title: String,
    y_label: String,
}

impl PngChartRenderer {
    pub fn new(title: impl Into<String>, y_label: impl Into<String>) -> Self {
        PngChartRenderer {
            title: title.into(),
            y_label: y_label.into(),
        }
    }
}

/// (unix timestamp, mean in minutes) for every record, oldest first.
pub fn mean_series(history: &History) -> Vec<(i64, f64)> {
    history
        .records()
        .iter()
        .map(|record| {
            (
                record.published_at.timestamp(),
                record.running_mean_seconds / 60.0,
            )
        })
        .collect()
}

impl ChartRenderer for PngChartRenderer {
    fn render(&self, history: &History, output: &Path) -> Result<()> {
        if !*FONT_LOADED {
            return Err(anyhow::anyhow!("Bundled chart font could not be loaded"));
        }

        let series = mean_series(history);
        let (Some(first), Some(last)) = (series.first(), series.last()) else {
            return Err(anyhow::anyhow!("Cannot plot an empty history"));
        };

        let x_range = first.0..(last.0.max(first.0 + ONE_DAY));
        let y_max = series.iter().map(|(_, mean)| *mean).fold(0.0_f64, f64::max);
        let y_range = 0.0..(y_max * 1.1).max(1.0);

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let root = BitMapBackend::new(output, (1200, 720)).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(&self.title, ("sans-serif", 32))
            .margin(20)
            .x_label_area_size(60)
            .y_label_area_size(70)
            .build_cartesian_2d(x_range, y_range)?;

        chart
            .configure_mesh()
            .x_labels(10)
            .y_labels(10)
            .x_label_formatter(&|ts| {
                DateTime::from_timestamp(*ts, 0)
                    .map(|date| date.format("%Y-%m").to_string())
                    .unwrap_or_default()
            })
            .y_desc(self.y_label.as_str())
            .draw()?;

        chart.draw_series(LineSeries::new(series, &BLUE))?;
        root.present()
            .with_context(|| format!("Failed to write chart to {}", output.display()))?;

        Ok(())
    }
}
