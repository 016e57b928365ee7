use std::collections::BTreeMap;

use log::debug;

use crate::data::model::PanelTable;
use crate::error::PipelineError;

// ---------------------------------------------------------------------------
// LogTransformer – derived log columns with an explicit name mapping
// ---------------------------------------------------------------------------

/// Derived-column registry: base column → log column.
///
/// Callers query the mapping by exact key instead of re-building `"<base>_log"`
/// strings at every call site, so the naming convention lives in one place.
#[derive(Debug, Clone, Default)]
pub struct LogColumns {
    mapping: BTreeMap<String, String>,
}

impl LogColumns {
    /// Derive a log column for each base column, in place.
    ///
    /// The derived value is `log_base(v)` for positive `v` and null for
    /// null or non-positive inputs, so the null-fraction semantics set up by
    /// the cleaner carry through and the estimator can simply skip those
    /// rows.  Re-deriving an existing column overwrites it (idempotent).
    ///
    /// A required base column absent from the table is a configuration
    /// error and aborts the run.
    pub fn derive(
        &mut self,
        table: &mut PanelTable,
        base_columns: &[String],
        log_base: f64,
    ) -> Result<(), PipelineError> {
        let ln_base = log_base.ln();

        for base in base_columns {
            if !table.has_column(base) {
                return Err(PipelineError::ConfigReference {
                    column: base.clone(),
                });
            }
            let derived = format!("{base}_log");

            for row in &mut table.rows {
                let value = row
                    .value(base)
                    .filter(|&v| v > 0.0)
                    .map(|v| v.ln() / ln_base);
                row.values.insert(derived.clone(), value);
            }
            if !table.has_column(&derived) {
                table.columns.push(derived.clone());
            }
            debug!("transform: derived '{derived}' from '{base}' (base {log_base})");
            self.mapping.insert(base.clone(), derived);
        }
        Ok(())
    }

    /// Name of the log column derived from `base`, if one was derived.
    pub fn derived_from(&self, base: &str) -> Option<&str> {
        self.mapping.get(base).map(String::as_str)
    }
}
