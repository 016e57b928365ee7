use std::collections::{BTreeMap, BTreeSet};

// ---------------------------------------------------------------------------
// PanelRow – one country-year observation
// ---------------------------------------------------------------------------

/// A single country-year observation (one row of the source table).
///
/// Indicator values live in a `BTreeMap` keyed by column name so the column
/// set stays dynamic; a missing value is an explicit `None`, never an absent
/// key (see [`PanelTable::from_rows`]).
#[derive(Debug, Clone, PartialEq)]
pub struct PanelRow {
    /// Country or territory name.
    pub entity: String,
    /// ISO 3166-1 alpha-3 code. Aggregates (regions, income groups) have none.
    pub code: Option<String>,
    /// Observation year.
    pub year: i32,
    /// Demographic series tag, e.g. "estimates" or "medium" for UN
    /// population projections. Absent for non-demographic sources.
    pub variant: Option<String>,
    /// Indicator columns: column_name → nullable value.
    pub values: BTreeMap<String, Option<f64>>,
}

impl PanelRow {
    /// Value of an indicator column, flattened: an absent key and a stored
    /// null both read as `None`.
    pub fn value(&self, column: &str) -> Option<f64> {
        self.values.get(column).copied().flatten()
    }
}

// ---------------------------------------------------------------------------
// PanelTable – the complete loaded dataset
// ---------------------------------------------------------------------------

/// The full panel with a normalized column index.
///
/// Invariant: every row's `values` map is keyed by exactly `columns`.
#[derive(Debug, Clone)]
pub struct PanelTable {
    /// All country-year rows, in source order.
    pub rows: Vec<PanelRow>,
    /// Ordered list of indicator column names (excludes entity/code/year).
    pub columns: Vec<String>,
}

impl PanelTable {
    /// Build a table from loaded rows, unifying the column set.
    ///
    /// Columns seen in any row are added to every row; rows that lack a
    /// column get an explicit `None` so downstream null-fraction statistics
    /// see missing values rather than missing keys.
    pub fn from_rows(rows: Vec<PanelRow>) -> Self {
        let mut column_set: BTreeSet<String> = BTreeSet::new();
        for row in &rows {
            for col in row.values.keys() {
                column_set.insert(col.clone());
            }
        }
        let columns: Vec<String> = column_set.into_iter().collect();

        let mut rows = rows;
        for row in &mut rows {
            for col in &columns {
                row.values.entry(col.clone()).or_insert(None);
            }
        }

        PanelTable { rows, columns }
    }

    /// Whether the table has a column with this exact name.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Fraction of null values in a column, over all rows.
    /// An empty table reports 0.0.
    pub fn column_null_fraction(&self, column: &str) -> f64 {
        if self.rows.is_empty() {
            return 0.0;
        }
        let nulls = self
            .rows
            .iter()
            .filter(|r| r.value(column).is_none())
            .count();
        nulls as f64 / self.rows.len() as f64
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(entity: &str, year: i32, values: &[(&str, Option<f64>)]) -> PanelRow {
        PanelRow {
            entity: entity.to_string(),
            code: Some("XXX".to_string()),
            year,
            variant: None,
            values: values.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }

    #[test]
    fn from_rows_unifies_column_sets() {
        let table = PanelTable::from_rows(vec![
            row("Spain", 2000, &[("gdp", Some(1.0))]),
            row("Chile", 2000, &[("population", Some(2.0))]),
        ]);
        assert_eq!(table.columns, vec!["gdp", "population"]);
        // The column missing from a row reads as an explicit null.
        assert_eq!(table.rows[0].value("population"), None);
        assert_eq!(table.rows[1].value("gdp"), None);
    }

    #[test]
    fn column_null_fraction_counts_explicit_nulls() {
        let table = PanelTable::from_rows(vec![
            row("A", 2000, &[("gdp", Some(1.0))]),
            row("B", 2000, &[("gdp", None)]),
            row("C", 2000, &[("gdp", None)]),
            row("D", 2000, &[("gdp", Some(4.0))]),
        ]);
        assert!((table.column_null_fraction("gdp") - 0.5).abs() < 1e-12);
    }
}
