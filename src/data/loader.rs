use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, Float32Array, Float64Array, Int32Array, Int64Array, StringArray};
use arrow::datatypes::DataType;
use log::info;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{PanelRow, PanelTable};

/// Reserved column names; everything else is an indicator column.
const ENTITY_COL: &str = "Entity";
const CODE_COL: &str = "Code";
const YEAR_COL: &str = "Year";
const VARIANT_COL: &str = "Variant";

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a panel table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – flat columns: `Entity`, `Year`, optional `Code`/`Variant`,
///   numeric indicator columns
/// * `.json`    – `[{ "Entity": "...", "Year": 1995, ...indicators }, ...]`
/// * `.csv`     – wide table with the same header layout; empty cell = null
pub fn load_file(path: &Path) -> Result<PanelTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        "csv" => load_csv(path),
        other => bail!("Unsupported file extension: .{other}"),
    }?;

    info!(
        "loaded {} rows, {} indicator columns from {}",
        table.len(),
        table.columns.len(),
        path.display()
    );
    Ok(table)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   {
///     "Entity": "Spain",
///     "Code": "ESP",
///     "Year": 1995,
///     "population": 39750000.0,
///     "gdp": 1.02e12
///   },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<PanelTable> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    let mut rows = Vec::with_capacity(records.len());

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        let entity = obj
            .get(ENTITY_COL)
            .and_then(|v| v.as_str())
            .with_context(|| format!("Row {i}: missing or non-string '{ENTITY_COL}'"))?
            .to_string();
        let year = obj
            .get(YEAR_COL)
            .and_then(|v| v.as_i64())
            .with_context(|| format!("Row {i}: missing or non-integer '{YEAR_COL}'"))?
            as i32;
        let code = obj
            .get(CODE_COL)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let variant = obj
            .get(VARIANT_COL)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let mut values = BTreeMap::new();
        for (key, val) in obj {
            if is_reserved(key) {
                continue;
            }
            let cell = match val {
                JsonValue::Null => None,
                JsonValue::Number(n) => n.as_f64(),
                other => bail!("Row {i}, column '{key}': expected number or null, got {other}"),
            };
            values.insert(key.clone(), cell);
        }

        rows.push(PanelRow {
            entity,
            code,
            year,
            variant,
            values,
        });
    }

    Ok(PanelTable::from_rows(rows))
}

fn is_reserved(name: &str) -> bool {
    matches!(name, ENTITY_COL | CODE_COL | YEAR_COL | VARIANT_COL)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with `Entity`, `Year`, optional `Code` and
/// `Variant`, followed by indicator columns.  An empty cell is a null.
fn load_csv(path: &Path) -> Result<PanelTable> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let entity_idx = headers
        .iter()
        .position(|h| h == ENTITY_COL)
        .with_context(|| format!("CSV missing '{ENTITY_COL}' column"))?;
    let year_idx = headers
        .iter()
        .position(|h| h == YEAR_COL)
        .with_context(|| format!("CSV missing '{YEAR_COL}' column"))?;
    let code_idx = headers.iter().position(|h| h == CODE_COL);
    let variant_idx = headers.iter().position(|h| h == VARIANT_COL);

    let mut rows = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;

        let entity = record.get(entity_idx).unwrap_or("").to_string();
        let year: i32 = record
            .get(year_idx)
            .unwrap_or("")
            .trim()
            .parse()
            .with_context(|| format!("CSV row {row_no}: invalid year"))?;
        let code = code_idx
            .and_then(|i| record.get(i))
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let variant = variant_idx
            .and_then(|i| record.get(i))
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let mut values = BTreeMap::new();
        for (col_idx, cell) in record.iter().enumerate() {
            if Some(col_idx) == code_idx
                || Some(col_idx) == variant_idx
                || col_idx == entity_idx
                || col_idx == year_idx
            {
                continue;
            }
            let col_name = &headers[col_idx];
            let value = if cell.trim().is_empty() {
                None
            } else {
                Some(cell.trim().parse::<f64>().with_context(|| {
                    format!("CSV row {row_no}, column '{col_name}': '{cell}' is not a number")
                })?)
            };
            values.insert(col_name.clone(), value);
        }

        rows.push(PanelRow {
            entity,
            code,
            year,
            variant,
            values,
        });
    }

    Ok(PanelTable::from_rows(rows))
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file containing panel data.
///
/// Expected schema: flat columns: `Entity` (Utf8), `Year` (Int32/Int64),
/// optional `Code`/`Variant` (Utf8), and Float64/Float32/Int indicator
/// columns.  Works with files written by both **Pandas** (`df.to_parquet()`)
/// and **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<PanelTable> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();
        let n_rows = batch.num_rows();

        let entity_idx = schema
            .index_of(ENTITY_COL)
            .map_err(|_| anyhow::anyhow!("Parquet file missing '{ENTITY_COL}' column"))?;
        let year_idx = schema
            .index_of(YEAR_COL)
            .map_err(|_| anyhow::anyhow!("Parquet file missing '{YEAR_COL}' column"))?;
        let code_idx = schema.index_of(CODE_COL).ok();
        let variant_idx = schema.index_of(VARIANT_COL).ok();

        let indicator_cols: Vec<(usize, String)> = schema
            .fields()
            .iter()
            .enumerate()
            .filter(|(_, f)| !is_reserved(f.name()))
            .map(|(i, f)| (i, f.name().clone()))
            .collect();

        for row in 0..n_rows {
            let entity = extract_string(batch.column(entity_idx), row)
                .with_context(|| format!("Row {row}: failed to read '{ENTITY_COL}'"))?;
            let year = extract_year(batch.column(year_idx), row)
                .with_context(|| format!("Row {row}: failed to read '{YEAR_COL}'"))?;
            let code = code_idx.and_then(|i| extract_string(batch.column(i), row).ok());
            let variant = variant_idx.and_then(|i| extract_string(batch.column(i), row).ok());

            let mut values = BTreeMap::new();
            for (col_idx, col_name) in &indicator_cols {
                let value = extract_f64(batch.column(*col_idx), row).with_context(|| {
                    format!("Row {row}: failed to read indicator '{col_name}'")
                })?;
                values.insert(col_name.clone(), value);
            }

            rows.push(PanelRow {
                entity,
                code,
                year,
                variant,
                values,
            });
        }
    }

    Ok(PanelTable::from_rows(rows))
}

// -- Parquet / Arrow helpers --

fn extract_string(col: &Arc<dyn Array>, row: usize) -> Result<String> {
    if col.is_null(row) {
        bail!("null value in string column");
    }
    let arr = col
        .as_any()
        .downcast_ref::<StringArray>()
        .context("expected Utf8 column")?;
    Ok(arr.value(row).to_string())
}

fn extract_year(col: &Arc<dyn Array>, row: usize) -> Result<i32> {
    if col.is_null(row) {
        bail!("null year");
    }
    match col.data_type() {
        DataType::Int32 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int32Array>()
                .context("expected Int32Array")?;
            Ok(arr.value(row))
        }
        DataType::Int64 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int64Array>()
                .context("expected Int64Array")?;
            Ok(arr.value(row) as i32)
        }
        other => bail!("Year column has type {other:?}, expected Int32 or Int64"),
    }
}

/// Extract a nullable numeric cell; nulls stay `None`.
fn extract_f64(col: &Arc<dyn Array>, row: usize) -> Result<Option<f64>> {
    if col.is_null(row) {
        return Ok(None);
    }
    match col.data_type() {
        DataType::Float64 => {
            let arr = col
                .as_any()
                .downcast_ref::<Float64Array>()
                .context("expected Float64Array")?;
            Ok(Some(arr.value(row)))
        }
        DataType::Float32 => {
            let arr = col
                .as_any()
                .downcast_ref::<Float32Array>()
                .context("expected Float32Array")?;
            Ok(Some(arr.value(row) as f64))
        }
        DataType::Int32 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int32Array>()
                .context("expected Int32Array")?;
            Ok(Some(arr.value(row) as f64))
        }
        DataType::Int64 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int64Array>()
                .context("expected Int64Array")?;
            Ok(Some(arr.value(row) as f64))
        }
        other => bail!("Indicator column has type {other:?}, expected numeric"),
    }
}
