use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};
use plotters::prelude::*;

use crate::plot::PlotSpec;

// ---------------------------------------------------------------------------
// PNG renderer for PlotSpec values
// ---------------------------------------------------------------------------

const PLOT_SIZE: (u32, u32) = (800, 600);

/// Axis range with a small margin so edge points are not clipped.
fn padded_range(values: &[f64]) -> (f64, f64) {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;
    let pad = if span > 0.0 { span * 0.05 } else { 1.0 };
    (min - pad, max + pad)
}

/// Render one plot specification to a PNG at its `output_path`.
///
/// The parent directory is created if needed.  A spec with no observations
/// at all is skipped with a warning rather than producing an empty chart.
pub fn render(spec: &PlotSpec) -> Result<()> {
    if spec.x_values.is_empty() {
        warn!("render '{}': no observations, skipping", spec.title);
        return Ok(());
    }

    let path = Path::new(&spec.output_path);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }

    let root = BitMapBackend::new(path, PLOT_SIZE).into_drawing_area();
    root.fill(&WHITE).context("filling plot background")?;

    let (x_min, x_max) = padded_range(&spec.x_values);
    let (y_min, y_max) = padded_range(&spec.y_values);

    let mut chart = ChartBuilder::on(&root)
        .caption(&spec.title, ("sans-serif", 24))
        .margin(12)
        .x_label_area_size(45)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .context("building chart")?;

    chart
        .configure_mesh()
        .x_desc(&spec.x_label)
        .y_desc(&spec.y_label)
        .draw()
        .context("drawing mesh")?;

    chart
        .draw_series(
            spec.x_values
                .iter()
                .zip(&spec.y_values)
                .map(|(&x, &y)| Circle::new((x, y), 3, BLUE.mix(0.6).filled())),
        )
        .context("drawing scatter")?;

    if let Some(line) = &spec.fit_line {
        let series = LineSeries::new(
            [line.x_min, line.x_max]
                .iter()
                .map(|&x| (x, line.slope * x + line.intercept)),
            RED.stroke_width(2),
        );
        let labelled = chart.draw_series(series).context("drawing fit line")?;
        if let Some(legend) = &spec.legend {
            labelled
                .label(legend)
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED.stroke_width(2)));
            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperLeft)
                .border_style(BLACK.mix(0.4))
                .background_style(WHITE.mix(0.85))
                .draw()
                .context("drawing legend")?;
        }
    }

    root.present().context("writing PNG")?;
    info!("render '{}': wrote {}", spec.title, path.display());
    Ok(())
}
