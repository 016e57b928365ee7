use crate::data::model::PanelTable;
use crate::error::PipelineError;
use crate::fit::{FitResult, FitStatus, paired_observations};

// ---------------------------------------------------------------------------
// PlotSpecBuilder – renderable scatter-plus-fit specifications
// ---------------------------------------------------------------------------

/// The fitted line restricted to the observed x-range (no extrapolation).
#[derive(Debug, Clone, PartialEq)]
pub struct FitLine {
    pub slope: f64,
    pub intercept: f64,
    pub x_min: f64,
    pub x_max: f64,
}

/// Everything a renderer needs to draw one pair: scatter points, optional
/// fit line, title and destination.  Pure value object; building one has no
/// side effects.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotSpec {
    pub x_values: Vec<f64>,
    pub y_values: Vec<f64>,
    /// `None` when the pair had fewer than two observations: the fit line
    /// is not renderable, though the scatter (if any) still is.
    pub fit_line: Option<FitLine>,
    pub title: String,
    pub output_path: String,
    pub x_label: String,
    pub y_label: String,
    /// Legend annotation: scaling exponent and R², when the fit succeeded.
    pub legend: Option<String>,
}

/// Build the plot specification for a fitted pair.
///
/// Re-extracts the paired observations with the same filtering the
/// estimator used, in table row order.
pub fn build(table: &PanelTable, result: &FitResult) -> Result<PlotSpec, PipelineError> {
    let obs = paired_observations(table, &result.pair)?;
    let (x_values, y_values): (Vec<f64>, Vec<f64>) = obs.into_iter().unzip();

    let fit_line = if result.n_obs < 2 || !result.slope.is_finite() {
        None
    } else {
        let x_min = x_values.iter().copied().fold(f64::INFINITY, f64::min);
        let x_max = x_values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(FitLine {
            slope: result.slope,
            intercept: result.intercept,
            x_min,
            x_max,
        })
    };

    let legend = match result.status {
        FitStatus::Ok => Some(format!(
            "β = {:.3}, R² = {:.3}",
            result.slope, result.r_squared
        )),
        FitStatus::DegenerateFit => Some(format!("β = {:.3}, R² undefined", result.slope)),
        FitStatus::InsufficientData | FitStatus::ConstantX => None,
    };

    Ok(PlotSpec {
        x_values,
        y_values,
        fit_line,
        title: result.pair.title.clone(),
        output_path: result.pair.output_path.clone(),
        x_label: result.pair.x_col.clone(),
        y_label: result.pair.y_col.clone(),
        legend,
    })
}
