use std::path::Path;

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

// ---------------------------------------------------------------------------
// Run configuration
// ---------------------------------------------------------------------------

/// One scaling relationship to estimate: a log-log regression of `y_col`
/// against `x_col`.  Column names refer to the table *after* log
/// transformation, so they normally carry the `_log` suffix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingPairConfig {
    pub x_col: String,
    pub y_col: String,
    pub title: String,
    pub output_path: String,
}

/// Cleaning and transformation parameters, passed explicitly into each
/// pipeline stage (never ambient state).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisParams {
    pub year_min: i32,
    pub year_max: i32,
    /// Maximum tolerated null fraction per row (over retained columns).
    pub null_threshold: f64,
    /// Maximum tolerated null fraction per column (over year-filtered rows).
    pub column_threshold: f64,
    pub log_base: f64,
}

/// Pre-processing switches applied before cleaning/transformation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataProcessing {
    /// Drop rows tagged as "medium variant" demographic projections so
    /// historical estimates are never mixed with projected series.
    pub remove_medium_variant: bool,
    /// Rescale energy columns TWh → kWh before log transformation.
    pub convert_energy_units: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub scaling_pairs: Vec<ScalingPairConfig>,
    pub analysis_params: AnalysisParams,
    pub data_processing: DataProcessing,
}

impl Config {
    /// Load a configuration from a JSON file, falling back to the built-in
    /// default when the file is absent.
    pub fn load(path: &Path) -> Result<Config> {
        if !path.exists() {
            warn!(
                "configuration file not found: {}, using default configuration",
                path.display()
            );
            return Ok(Config::default());
        }
        let text = std::fs::read_to_string(path).context("reading configuration file")?;
        let config: Config = serde_json::from_str(&text).context("parsing configuration JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Check the numeric parameter domains up front so a broken
    /// configuration fails before any data is touched.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let p = &self.analysis_params;
        if p.year_min > p.year_max {
            return Err(PipelineError::InvalidParams(format!(
                "year_min ({}) > year_max ({})",
                p.year_min, p.year_max
            )));
        }
        for (name, v) in [
            ("null_threshold", p.null_threshold),
            ("column_threshold", p.column_threshold),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(PipelineError::InvalidParams(format!(
                    "{name} must be in [0, 1], got {v}"
                )));
            }
        }
        if p.log_base <= 0.0 || p.log_base == 1.0 {
            return Err(PipelineError::InvalidParams(format!(
                "log_base must be positive and != 1, got {}",
                p.log_base
            )));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            scaling_pairs: vec![ScalingPairConfig {
                x_col: "population_log".to_string(),
                y_col: "gdp_log".to_string(),
                title: "GDP vs Population (log-log)".to_string(),
                output_path: "reports/figures/gdp_vs_pop_loglog.png".to_string(),
            }],
            analysis_params: AnalysisParams {
                year_min: 1990,
                year_max: 2019,
                null_threshold: 0.8,
                column_threshold: 0.2,
                log_base: std::f64::consts::E,
            },
            data_processing: DataProcessing {
                remove_medium_variant: true,
                convert_energy_units: false,
            },
        }
    }
}
