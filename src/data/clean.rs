use log::{debug, info};

use crate::config::{AnalysisParams, DataProcessing};
use crate::error::PipelineError;

use super::model::{PanelRow, PanelTable};

// ---------------------------------------------------------------------------
// Cleaner – year window, variant drop, null-fraction thresholds
// ---------------------------------------------------------------------------

/// Whether a row belongs to a "medium variant" projection series.
///
/// UN population data tags projected rows with the variant name; historical
/// rows are tagged "estimates" or not at all.  Matching is case-insensitive
/// on the tag value.
fn is_medium_variant(row: &PanelRow) -> bool {
    row.variant
        .as_deref()
        .is_some_and(|v| v.eq_ignore_ascii_case("medium"))
}

/// Clean a panel table.  Filter order is fixed:
///
/// 1. medium-variant drop (when enabled): keeps only realized/estimate rows,
/// 2. year window `year_min ≤ year ≤ year_max`,
/// 3. aggregate drop: rows without an ISO code are regions or income
///    groups, not countries,
/// 4. column drop: null fraction over the surviving rows > `column_threshold`,
/// 5. row drop: null fraction over the *retained* columns > `null_threshold`.
///
/// Steps 1–3 shrink the universe before any null statistic is computed, and
/// the row pass runs after the column pass so row null fractions only count
/// surviving columns.  No value is ever imputed.
pub fn clean(
    table: &PanelTable,
    params: &AnalysisParams,
    processing: &DataProcessing,
) -> Result<PanelTable, PipelineError> {
    let mut rows: Vec<PanelRow> = table
        .rows
        .iter()
        .filter(|r| !(processing.remove_medium_variant && is_medium_variant(r)))
        .filter(|r| r.year >= params.year_min && r.year <= params.year_max)
        .filter(|r| r.code.is_some())
        .cloned()
        .collect();

    debug!(
        "cleaner: {} of {} rows survive variant/year/aggregate filters",
        rows.len(),
        table.len()
    );

    if rows.is_empty() {
        return Err(PipelineError::EmptyDataset);
    }

    // Column pass: null fraction measured over the row-filtered universe.
    let n = rows.len() as f64;
    let kept_columns: Vec<String> = table
        .columns
        .iter()
        .filter(|col| {
            let nulls = rows.iter().filter(|r| r.value(col).is_none()).count();
            let fraction = nulls as f64 / n;
            if fraction > params.column_threshold {
                info!("cleaner: dropping column '{col}' (null fraction {fraction:.3})");
                false
            } else {
                true
            }
        })
        .cloned()
        .collect();

    for row in &mut rows {
        row.values.retain(|col, _| kept_columns.contains(col));
    }

    // Row pass: null fraction measured over retained columns only.
    if !kept_columns.is_empty() {
        let width = kept_columns.len() as f64;
        rows.retain(|row| {
            let nulls = kept_columns
                .iter()
                .filter(|col| row.value(col).is_none())
                .count();
            nulls as f64 / width <= params.null_threshold
        });
    }

    if rows.is_empty() {
        return Err(PipelineError::EmptyDataset);
    }

    info!(
        "cleaner: {} rows, {} columns after cleaning",
        rows.len(),
        kept_columns.len()
    );

    Ok(PanelTable {
        rows,
        columns: kept_columns,
    })
}
