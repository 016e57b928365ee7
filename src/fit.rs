use log::debug;

use crate::config::ScalingPairConfig;
use crate::data::model::PanelTable;
use crate::error::PipelineError;

// ---------------------------------------------------------------------------
// ScalingEstimator – OLS on a log-log pair
// ---------------------------------------------------------------------------

/// Per-pair fit condition.  Neither non-`Ok` state aborts the run; callers
/// check `status` before trusting the statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitStatus {
    Ok,
    /// Fewer than two paired observations; slope/intercept/R² are NaN.
    InsufficientData,
    /// All x values identical (SS_xx == 0): the slope of y on x is
    /// undefined, so slope/intercept/R² are NaN.
    ConstantX,
    /// All y values identical (SS_tot == 0); slope is finite, R² is NaN.
    DegenerateFit,
}

/// An ordinary-least-squares fit of one configured scaling pair.
/// Immutable once produced; the slope is the scaling exponent β.
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    pub pair: ScalingPairConfig,
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub n_obs: usize,
    pub status: FitStatus,
}

/// Collect the (x, y) observations for a pair: rows where both columns are
/// non-null, in table row order.  The fixed order keeps the accumulation,
/// and therefore the fit, bit-for-bit reproducible.
pub fn paired_observations(
    table: &PanelTable,
    pair: &ScalingPairConfig,
) -> Result<Vec<(f64, f64)>, PipelineError> {
    for col in [&pair.x_col, &pair.y_col] {
        if !table.has_column(col) {
            return Err(PipelineError::ConfigReference { column: col.clone() });
        }
    }
    Ok(table
        .rows
        .iter()
        .filter_map(|row| Some((row.value(&pair.x_col)?, row.value(&pair.y_col)?)))
        .collect())
}

/// Fit `y = slope * x + intercept` for one configured pair.
///
/// Uses mean-centered normal equations, which are numerically stable for
/// the magnitudes log columns take.  No clamping anywhere: R² is reported
/// raw even if estimation error pushes it slightly outside [0, 1], and NaN
/// is never silently replaced.
pub fn fit(table: &PanelTable, pair: &ScalingPairConfig) -> Result<FitResult, PipelineError> {
    let obs = paired_observations(table, pair)?;
    let n_obs = obs.len();

    if n_obs < 2 {
        debug!(
            "fit '{}': only {n_obs} paired observation(s), skipping regression",
            pair.title
        );
        return Ok(FitResult {
            pair: pair.clone(),
            slope: f64::NAN,
            intercept: f64::NAN,
            r_squared: f64::NAN,
            n_obs,
            status: FitStatus::InsufficientData,
        });
    }

    let n = n_obs as f64;
    let mean_x = obs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = obs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut ss_xx = 0.0;
    let mut ss_xy = 0.0;
    for &(x, y) in &obs {
        ss_xx += (x - mean_x) * (x - mean_x);
        ss_xy += (x - mean_x) * (y - mean_y);
    }

    // Constant x: the slope is 0/0, a reported condition rather than a
    // silent NaN carrying an Ok status.
    if ss_xx == 0.0 {
        debug!("fit '{}': constant x, slope undefined", pair.title);
        return Ok(FitResult {
            pair: pair.clone(),
            slope: f64::NAN,
            intercept: f64::NAN,
            r_squared: f64::NAN,
            n_obs,
            status: FitStatus::ConstantX,
        });
    }

    let slope = ss_xy / ss_xx;
    let intercept = mean_y - slope * mean_x;

    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for &(x, y) in &obs {
        let predicted = slope * x + intercept;
        ss_res += (y - predicted) * (y - predicted);
        ss_tot += (y - mean_y) * (y - mean_y);
    }

    let (r_squared, status) = if ss_tot == 0.0 {
        (f64::NAN, FitStatus::DegenerateFit)
    } else {
        (1.0 - ss_res / ss_tot, FitStatus::Ok)
    };

    debug!(
        "fit '{}': slope {slope:.4}, intercept {intercept:.4}, R² {r_squared:.4}, n {n_obs}",
        pair.title
    );

    Ok(FitResult {
        pair: pair.clone(),
        slope,
        intercept,
        r_squared,
        n_obs,
        status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::PanelRow;
    use std::collections::BTreeMap;

    fn pair() -> ScalingPairConfig {
        ScalingPairConfig {
            x_col: "x_log".to_string(),
            y_col: "y_log".to_string(),
            title: "y vs x".to_string(),
            output_path: "out.png".to_string(),
        }
    }

    fn table(points: &[(Option<f64>, Option<f64>)]) -> PanelTable {
        PanelTable::from_rows(
            points
                .iter()
                .enumerate()
                .map(|(i, (x, y))| PanelRow {
                    entity: format!("E{i}"),
                    code: Some("XXX".to_string()),
                    year: 2000,
                    variant: None,
                    values: BTreeMap::from([
                        ("x_log".to_string(), *x),
                        ("y_log".to_string(), *y),
                    ]),
                })
                .collect(),
        )
    }

    #[test]
    fn perfect_line_recovers_slope_and_intercept() {
        let t = table(&[
            (Some(1.0), Some(2.0)),
            (Some(2.0), Some(4.0)),
            (Some(3.0), Some(6.0)),
            (Some(4.0), Some(8.0)),
        ]);
        let result = fit(&t, &pair()).unwrap();

        assert_eq!(result.status, FitStatus::Ok);
        assert_eq!(result.n_obs, 4);
        assert!((result.slope - 2.0).abs() < 1e-12);
        assert!(result.intercept.abs() < 1e-12);
        assert!((result.r_squared - 1.0).abs() < 1e-12);
    }

    #[test]
    fn rows_with_a_null_side_are_skipped() {
        let t = table(&[
            (Some(1.0), Some(2.0)),
            (None, Some(9.0)),
            (Some(2.0), None),
            (Some(3.0), Some(6.0)),
        ]);
        let result = fit(&t, &pair()).unwrap();
        assert_eq!(result.n_obs, 2);
        assert_eq!(result.status, FitStatus::Ok);
    }

    #[test]
    fn single_observation_reports_insufficient_data() {
        let t = table(&[(Some(1.0), Some(2.0)), (None, Some(4.0))]);
        let result = fit(&t, &pair()).unwrap();

        assert_eq!(result.status, FitStatus::InsufficientData);
        assert_eq!(result.n_obs, 1);
        assert!(result.slope.is_nan());
        assert!(result.intercept.is_nan());
        assert!(result.r_squared.is_nan());
    }

    #[test]
    fn constant_x_reports_undefined_slope() {
        let t = table(&[
            (Some(2.0), Some(1.0)),
            (Some(2.0), Some(2.0)),
            (Some(2.0), Some(3.0)),
        ]);
        let result = fit(&t, &pair()).unwrap();

        assert_eq!(result.status, FitStatus::ConstantX);
        assert_eq!(result.n_obs, 3);
        assert!(result.slope.is_nan());
        assert!(result.intercept.is_nan());
        assert!(result.r_squared.is_nan());
    }

    #[test]
    fn constant_y_reports_degenerate_fit() {
        let t = table(&[
            (Some(1.0), Some(5.0)),
            (Some(2.0), Some(5.0)),
            (Some(3.0), Some(5.0)),
        ]);
        let result = fit(&t, &pair()).unwrap();

        assert_eq!(result.status, FitStatus::DegenerateFit);
        assert!(result.slope.is_finite());
        assert!(result.slope.abs() < 1e-12);
        assert!(result.r_squared.is_nan());
    }

    #[test]
    fn fit_is_deterministic() {
        let t = table(&[
            (Some(0.31), Some(1.77)),
            (Some(1.93), Some(3.08)),
            (Some(2.64), Some(5.51)),
            (Some(4.12), Some(7.98)),
            (Some(5.55), Some(9.02)),
        ]);
        let a = fit(&t, &pair()).unwrap();
        let b = fit(&t, &pair()).unwrap();

        assert_eq!(a.slope.to_bits(), b.slope.to_bits());
        assert_eq!(a.intercept.to_bits(), b.intercept.to_bits());
        assert_eq!(a.r_squared.to_bits(), b.r_squared.to_bits());
        assert_eq!(a.n_obs, b.n_obs);
    }

    #[test]
    fn missing_column_is_a_config_error() {
        let t = table(&[(Some(1.0), Some(2.0))]);
        let mut p = pair();
        p.y_col = "absent_log".to_string();
        let err = fit(&t, &p).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::ConfigReference { column } if column == "absent_log"
        ));
    }
}
