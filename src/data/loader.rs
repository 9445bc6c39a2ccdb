use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, Float32Array, Float64Array, Int32Array, Int64Array};
use log::info;
use ndarray::Array2;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::FeatureTable;
use crate::error::{LoaderError, Result};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a numeric feature table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, every column numeric (empty cells become NaN)
/// * `.parquet` – numeric columns (Float32/Float64/Int32/Int64)
/// * `.json`    – `[{ "a": 1.0, "b": 2.0 }, ...]`
pub fn load_table(path: &Path) -> Result<FeatureTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "csv" => load_csv(path)?,
        "parquet" | "pq" => load_parquet(path)?,
        "json" => load_json(path)?,
        other => return Err(LoaderError::UnsupportedExtension(other.to_string())),
    };
    info!(
        "Loaded {} rows x {} columns from {:?}",
        table.len(),
        table.column_names.len(),
        path
    );
    Ok(table)
}

/// Read a text file into lines, each keeping its terminator.
///
/// A trailing line without a newline still counts as a line.
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path).map_err(|e| LoaderError::io(path, e))?;
    Ok(text.split_inclusive('\n').map(str::to_string).collect())
}

fn into_table(path: &Path, column_names: Vec<String>, flat: Vec<f64>) -> Result<FeatureTable> {
    let n_cols = column_names.len();
    let n_rows = if n_cols == 0 { 0 } else { flat.len() / n_cols };
    let values = Array2::from_shape_vec((n_rows, n_cols), flat)
        .map_err(|e| LoaderError::parse(path, e.to_string()))?;
    Ok(FeatureTable::new(column_names, values))
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path) -> Result<FeatureTable> {
    let mut reader =
        csv::Reader::from_path(path).map_err(|e| LoaderError::parse(path, e.to_string()))?;
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| LoaderError::parse(path, e.to_string()))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut flat = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let record = result.map_err(|e| LoaderError::parse(path, format!("row {row_no}: {e}")))?;
        if record.len() != headers.len() {
            return Err(LoaderError::parse(
                path,
                format!(
                    "row {row_no} has {} fields, header has {}",
                    record.len(),
                    headers.len()
                ),
            ));
        }
        for (col_idx, value) in record.iter().enumerate() {
            flat.push(parse_cell(path, value, row_no, &headers[col_idx])?);
        }
    }

    into_table(path, headers, flat)
}

fn parse_cell(path: &Path, s: &str, row: usize, col: &str) -> Result<f64> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(f64::NAN);
    }
    s.parse::<f64>()
        .map_err(|_| LoaderError::parse(path, format!("row {row}, column '{col}': '{s}' is not a number")))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON (`df.to_json(orient='records')`). Columns are taken
/// from the first record in key order; nulls become NaN.
fn load_json(path: &Path) -> Result<FeatureTable> {
    let text = std::fs::read_to_string(path).map_err(|e| LoaderError::io(path, e))?;
    let root: JsonValue =
        serde_json::from_str(&text).map_err(|e| LoaderError::parse(path, e.to_string()))?;

    let records = root
        .as_array()
        .ok_or_else(|| LoaderError::parse(path, "expected top-level JSON array"))?;

    let column_names: Vec<String> = match records.first().and_then(|r| r.as_object()) {
        Some(obj) => obj.keys().cloned().collect(),
        None if records.is_empty() => Vec::new(),
        None => return Err(LoaderError::parse(path, "row 0 is not a JSON object")),
    };

    let mut flat = Vec::with_capacity(records.len() * column_names.len());

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .ok_or_else(|| LoaderError::parse(path, format!("row {i} is not a JSON object")))?;
        for col in &column_names {
            let value = match obj.get(col) {
                Some(JsonValue::Null) => f64::NAN,
                Some(v) => v.as_f64().ok_or_else(|| {
                    LoaderError::parse(path, format!("row {i}, column '{col}': not a number"))
                })?,
                None => {
                    return Err(LoaderError::parse(
                        path,
                        format!("row {i}: missing column '{col}'"),
                    ))
                }
            };
            flat.push(value);
        }
    }

    into_table(path, column_names, flat)
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`), as long as every column is numeric.
fn load_parquet(path: &Path) -> Result<FeatureTable> {
    let file = std::fs::File::open(path).map_err(|e| LoaderError::io(path, e))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| LoaderError::parse(path, format!("reading parquet metadata: {e}")))?;
    let column_names: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder
        .build()
        .map_err(|e| LoaderError::parse(path, format!("building parquet reader: {e}")))?;

    let mut flat = Vec::new();

    for batch_result in reader {
        let batch = batch_result
            .map_err(|e| LoaderError::parse(path, format!("reading record batch: {e}")))?;
        let columns: Vec<&Arc<dyn Array>> = batch.columns().iter().collect();

        for row in 0..batch.num_rows() {
            for (col_idx, col) in columns.iter().enumerate() {
                let value = extract_f64(col, row).ok_or_else(|| {
                    LoaderError::parse(
                        path,
                        format!(
                            "column '{}' has non-numeric type {:?}",
                            column_names[col_idx],
                            col.data_type()
                        ),
                    )
                })?;
                flat.push(value);
            }
        }
    }

    into_table(path, column_names, flat)
}

/// Read one numeric cell as `f64`; nulls become NaN. `None` for non-numeric columns.
fn extract_f64(col: &Arc<dyn Array>, row: usize) -> Option<f64> {
    let any = col.as_any();
    let value = if let Some(arr) = any.downcast_ref::<Float64Array>() {
        arr.value(row)
    } else if let Some(arr) = any.downcast_ref::<Float32Array>() {
        arr.value(row) as f64
    } else if let Some(arr) = any.downcast_ref::<Int64Array>() {
        arr.value(row) as f64
    } else if let Some(arr) = any.downcast_ref::<Int32Array>() {
        arr.value(row) as f64
    } else {
        return None;
    };
    if col.is_null(row) {
        Some(f64::NAN)
    } else {
        Some(value)
    }
}
