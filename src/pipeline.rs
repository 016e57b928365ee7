use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use log::info;
use rayon::prelude::*;

use crate::config::{Config, ScalingPairConfig};
use crate::data::clean;
use crate::data::model::{PanelRow, PanelTable};
use crate::error::PipelineError;
use crate::fit::{self, FitResult, FitStatus};
use crate::plot::{self, PlotSpec};
use crate::transform::LogColumns;
use crate::units;

// ---------------------------------------------------------------------------
// Pipeline – clean → transform once → fit/spec per pair
// ---------------------------------------------------------------------------

/// Fit plus plot specification for one configured pair.
#[derive(Debug, Clone)]
pub struct PairOutcome {
    pub fit: FitResult,
    pub spec: PlotSpec,
}

/// All per-pair outcomes of a run, in configured `scaling_pairs` order.
/// Each pair is fitted twice: over country-year rows and over per-year
/// world totals.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcomes: Vec<PairOutcome>,
    pub world_outcomes: Vec<PairOutcome>,
}

fn count_ok(outcomes: &[PairOutcome]) -> usize {
    outcomes
        .iter()
        .filter(|o| o.fit.status == FitStatus::Ok)
        .count()
}

impl RunReport {
    /// Number of country-level pairs fitted without a reported condition.
    pub fn n_ok(&self) -> usize {
        count_ok(&self.outcomes)
    }

    /// Number of world-total pairs fitted without a reported condition.
    pub fn n_world_ok(&self) -> usize {
        count_ok(&self.world_outcomes)
    }
}

fn write_outcomes(f: &mut fmt::Formatter<'_>, outcomes: &[PairOutcome]) -> fmt::Result {
    for outcome in outcomes {
        let fit = &outcome.fit;
        match fit.status {
            FitStatus::Ok => writeln!(
                f,
                "  ok          {}: slope {:.4}, R² {:.4}, n {}",
                fit.pair.title, fit.slope, fit.r_squared, fit.n_obs
            )?,
            FitStatus::InsufficientData => writeln!(
                f,
                "  no fit      {}: insufficient data (n = {})",
                fit.pair.title, fit.n_obs
            )?,
            FitStatus::ConstantX => writeln!(
                f,
                "  no fit      {}: constant x, slope undefined, n {}",
                fit.pair.title, fit.n_obs
            )?,
            FitStatus::DegenerateFit => writeln!(
                f,
                "  degenerate  {}: constant y, slope {:.4}, R² undefined, n {}",
                fit.pair.title, fit.slope, fit.n_obs
            )?,
        }
    }
    Ok(())
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "run summary: {}/{} pairs fitted",
            self.n_ok(),
            self.outcomes.len()
        )?;
        write_outcomes(f, &self.outcomes)?;
        writeln!(
            f,
            "world totals: {}/{} pairs fitted",
            self.n_world_ok(),
            self.world_outcomes.len()
        )?;
        write_outcomes(f, &self.world_outcomes)
    }
}

/// Base columns the configured pairs need log derivatives for.
///
/// A pair column carrying the `_log` suffix requires its base column; a
/// column without the suffix is taken as a direct table reference and left
/// to the estimator's column check.
fn required_base_columns(config: &Config) -> Vec<String> {
    let mut bases: BTreeSet<String> = BTreeSet::new();
    for pair in &config.scaling_pairs {
        for col in [&pair.x_col, &pair.y_col] {
            if let Some(base) = col.strip_suffix("_log") {
                bases.insert(base.to_string());
            }
        }
    }
    bases.into_iter().collect()
}

/// Collapse the cleaned table to one row per year holding world totals.
///
/// Raw indicator columns are summed over the non-null cells of each year;
/// a column with no observed value that year stays null rather than
/// becoming a silent zero.  Runs on the cleaned, pre-log table, since
/// summing log values would total the wrong quantity.
fn world_totals(table: &PanelTable) -> PanelTable {
    let mut by_year: BTreeMap<i32, Vec<&PanelRow>> = BTreeMap::new();
    for row in &table.rows {
        by_year.entry(row.year).or_default().push(row);
    }

    let rows = by_year
        .into_iter()
        .map(|(year, rows)| {
            let values = table
                .columns
                .iter()
                .map(|col| {
                    let observed: Vec<f64> =
                        rows.iter().filter_map(|r| r.value(col)).collect();
                    let total = if observed.is_empty() {
                        None
                    } else {
                        Some(observed.iter().sum())
                    };
                    (col.clone(), total)
                })
                .collect();
            PanelRow {
                entity: "World".to_string(),
                code: Some("OWID_WRL".to_string()),
                year,
                variant: None,
                values,
            }
        })
        .collect();

    PanelTable {
        rows,
        columns: table.columns.clone(),
    }
}

/// The world-total rendition of a configured pair: same columns, suffixed
/// title and figure path.
fn world_pair(pair: &ScalingPairConfig) -> ScalingPairConfig {
    let output_path = match pair.output_path.strip_suffix(".png") {
        Some(stem) => format!("{stem}_world.png"),
        None => format!("{}_world", pair.output_path),
    };
    ScalingPairConfig {
        x_col: pair.x_col.clone(),
        y_col: pair.y_col.clone(),
        title: format!("{} (World)", pair.title),
        output_path,
    }
}

fn fit_pairs(table: &PanelTable, pairs: &[ScalingPairConfig]) -> Result<Vec<PairOutcome>, PipelineError> {
    pairs
        .par_iter()
        .map(|pair| {
            let fit = fit::fit(table, pair)?;
            let spec = plot::build(table, &fit)?;
            Ok(PairOutcome { fit, spec })
        })
        .collect()
}

/// Run the full analysis over a loaded panel.
///
/// The table is cleaned and log-transformed exactly once; the configured
/// pairs then read that shared immutable table in parallel, each producing
/// its own [`FitResult`] and [`PlotSpec`].  Structural problems
/// ([`PipelineError`]) abort the run; per-pair conditions are recorded in
/// the report and processing continues.
pub fn run(config: &Config, table: PanelTable) -> Result<RunReport, PipelineError> {
    config.validate()?;

    let mut table = table;
    if config.data_processing.convert_energy_units {
        units::convert_energy_units(&mut table);
    }

    let mut table = clean::clean(
        &table,
        &config.analysis_params,
        &config.data_processing,
    )?;

    // World totals come from the raw cleaned table, before log columns.
    let mut world = world_totals(&table);

    let bases = required_base_columns(config);
    let mut log_columns = LogColumns::default();
    log_columns.derive(&mut table, &bases, config.analysis_params.log_base)?;
    LogColumns::default().derive(&mut world, &bases, config.analysis_params.log_base)?;

    info!(
        "pipeline: fitting {} pair(s) over {} country rows and {} world rows",
        config.scaling_pairs.len(),
        table.len(),
        world.len()
    );

    // Both tables are read-only from here on; pairs are independent.
    let outcomes = fit_pairs(&table, &config.scaling_pairs)?;
    let world_pairs: Vec<ScalingPairConfig> =
        config.scaling_pairs.iter().map(world_pair).collect();
    let world_outcomes = fit_pairs(&world, &world_pairs)?;

    Ok(RunReport {
        outcomes,
        world_outcomes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnalysisParams, DataProcessing, ScalingPairConfig};
    use crate::data::model::PanelRow;
    use std::collections::BTreeMap;

    /// Synthetic panel obeying gdp = population² over 1980–2020, with a
    /// constant column for degenerate-fit coverage.
    fn fixture_table() -> PanelTable {
        let rows = (1980..=2020)
            .flat_map(|year| {
                ["Spain", "Chile", "Kenya"]
                    .iter()
                    .enumerate()
                    .map(move |(i, entity)| {
                        let population = 1.0e6 * (i + 1) as f64 * (1.0 + (year - 1980) as f64 / 40.0);
                        PanelRow {
                            entity: entity.to_string(),
                            code: Some(format!("C{i}")),
                            year,
                            variant: Some("estimates".to_string()),
                            values: BTreeMap::from([
                                ("population".to_string(), Some(population)),
                                ("gdp".to_string(), Some(population * population)),
                                ("flat".to_string(), Some(7.0)),
                            ]),
                        }
                    })
            })
            .collect();
        PanelTable::from_rows(rows)
    }

    fn config(pairs: Vec<ScalingPairConfig>) -> Config {
        Config {
            scaling_pairs: pairs,
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

    fn pair(x: &str, y: &str, title: &str) -> ScalingPairConfig {
        ScalingPairConfig {
            x_col: x.to_string(),
            y_col: y.to_string(),
            title: title.to_string(),
            output_path: format!("reports/figures/{title}.png"),
        }
    }

    #[test]
    fn end_to_end_fits_each_pair_in_configured_order() {
        let config = config(vec![
            pair("population_log", "gdp_log", "gdp_vs_pop"),
            pair("gdp_log", "population_log", "pop_vs_gdp"),
        ]);
        let report = run(&config, fixture_table()).unwrap();

        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.outcomes[0].fit.pair.title, "gdp_vs_pop");
        assert_eq!(report.outcomes[1].fit.pair.title, "pop_vs_gdp");
        assert_eq!(report.n_ok(), 2);

        // gdp = population² is slope 2 in log-log space.
        let first = &report.outcomes[0].fit;
        assert!((first.slope - 2.0).abs() < 1e-9);
        assert!((first.r_squared - 1.0).abs() < 1e-9);

        // Year window 1990–2019 over 3 entities.
        assert_eq!(first.n_obs, 90);

        // Each pair is also fitted over per-year world totals: one row per
        // year in the window, same column pairs, suffixed title and path.
        assert_eq!(report.world_outcomes.len(), 2);
        let world = &report.world_outcomes[0].fit;
        assert_eq!(world.pair.title, "gdp_vs_pop (World)");
        assert_eq!(
            world.pair.output_path,
            "reports/figures/gdp_vs_pop_world.png"
        );
        assert_eq!(world.n_obs, 30);
        // Every entity grows by the same factor per year, so world totals
        // keep the quadratic relationship exactly.
        assert!((world.slope - 2.0).abs() < 1e-9);
        assert_eq!(report.n_world_ok(), 2);
    }

    #[test]
    fn world_totals_sum_non_null_cells_per_year() {
        let make = |entity: &str, year: i32, gdp: Option<f64>| PanelRow {
            entity: entity.to_string(),
            code: Some("XXX".to_string()),
            year,
            variant: None,
            values: BTreeMap::from([("gdp".to_string(), gdp)]),
        };
        let table = PanelTable::from_rows(vec![
            make("A", 2000, Some(1.0)),
            make("B", 2000, Some(2.0)),
            make("A", 2001, Some(5.0)),
            make("B", 2001, None),
            make("A", 2002, None),
            make("B", 2002, None),
        ]);

        let world = world_totals(&table);
        assert_eq!(world.len(), 3);
        assert_eq!(world.rows[0].value("gdp"), Some(3.0));
        // A partially observed year sums the observed cells.
        assert_eq!(world.rows[1].value("gdp"), Some(5.0));
        // A fully missing year stays null, never a silent zero.
        assert_eq!(world.rows[2].value("gdp"), None);
        assert!(world.rows.iter().all(|r| r.entity == "World"));
    }

    #[test]
    fn degenerate_pair_is_reported_without_aborting_the_run() {
        let config = config(vec![
            pair("population_log", "flat_log", "flat_vs_pop"),
            pair("population_log", "gdp_log", "gdp_vs_pop"),
        ]);
        let report = run(&config, fixture_table()).unwrap();

        assert_eq!(report.outcomes[0].fit.status, FitStatus::DegenerateFit);
        assert_eq!(report.outcomes[1].fit.status, FitStatus::Ok);
        assert_eq!(report.n_ok(), 1);

        let summary = report.to_string();
        assert!(summary.contains("degenerate"));
        assert!(summary.contains("1/2 pairs fitted"));
    }

    #[test]
    fn unknown_pair_column_aborts_the_run() {
        let config = config(vec![pair("population_log", "exports_log", "bad")]);
        let err = run(&config, fixture_table()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::ConfigReference { column } if column == "exports"
        ));
    }

    #[test]
    fn cleaning_everything_away_aborts_the_run() {
        let mut config = config(vec![pair("population_log", "gdp_log", "gdp_vs_pop")]);
        config.analysis_params.year_min = 2050;
        config.analysis_params.year_max = 2060;
        let err = run(&config, fixture_table()).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyDataset));
    }
}
