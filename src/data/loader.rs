use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{Array, Float32Array, Float64Array, Int32Array, Int64Array};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use super::model::{ColumnData, SpaxelTable};
use super::table::{column_kind, ColumnKind};
use crate::bpt::BptClass;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a spaxel table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – one column per spaxel quantity (as written by
///   [`export_table`](super::export::export_table) or `df.to_parquet()`)
/// * `.csv`     – header row with column names, empty cells are missing values
pub fn load_table(path: &Path) -> Result<SpaxelTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "csv" => load_csv(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

/// Decode a BPT label stored as a float code (0, 1, 2, NaN).
fn class_from_code(code: f64) -> Result<BptClass> {
    if !code.is_finite() {
        return Ok(BptClass::Undefined);
    }
    if code.fract() != 0.0 {
        bail!("BPT code {code} is not an integer");
    }
    Ok(BptClass::from_label(Some(code as i64))?)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one row per spaxel. Known
/// spaxel columns take their type from the table layout; any other column is
/// an integer column if every cell parses as one, otherwise a float column.
fn load_csv(path: &Path) -> Result<SpaxelTable> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        for (col_idx, column) in cells.iter_mut().enumerate() {
            column.push(record.get(col_idx).unwrap_or("").trim().to_string());
        }
    }

    let mut table = SpaxelTable::new();
    for (name, values) in headers.iter().zip(cells) {
        let kind = column_kind(name).unwrap_or_else(|| guess_kind(&values));
        let data = parse_csv_column(&values, kind)
            .with_context(|| format!("CSV column '{name}'"))?;
        table.push_column(name.clone(), data)?;
    }
    Ok(table)
}

fn guess_kind(values: &[String]) -> ColumnKind {
    if values.iter().all(|s| s.parse::<i64>().is_ok()) {
        ColumnKind::Integer
    } else {
        ColumnKind::Float
    }
}

fn parse_csv_column(values: &[String], kind: ColumnKind) -> Result<ColumnData> {
    let parse_float = |(row, s): (usize, &String)| -> Result<f64> {
        if s.is_empty() {
            return Ok(f64::NAN);
        }
        s.parse::<f64>()
            .with_context(|| format!("row {row}: '{s}' is not a number"))
    };

    Ok(match kind {
        ColumnKind::Integer => ColumnData::Integer(
            values
                .iter()
                .enumerate()
                .map(|(row, s)| {
                    s.parse::<i64>()
                        .with_context(|| format!("row {row}: '{s}' is not an integer"))
                })
                .collect::<Result<_>>()?,
        ),
        ColumnKind::Float => {
            ColumnData::Float(values.iter().enumerate().map(parse_float).collect::<Result<_>>()?)
        }
        ColumnKind::Class => ColumnData::Class(
            values
                .iter()
                .enumerate()
                .map(|cell| class_from_code(parse_float(cell)?))
                .collect::<Result<_>>()?,
        ),
    })
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet spaxel table.
///
/// Integer columns may be Int32 or Int64, float columns Float32 or Float64
/// (nulls read as NaN). `BPT_class` may be a nullable integer column or a
/// float column using NaN for missing labels, as Pandas writes it.
fn load_parquet(path: &Path) -> Result<SpaxelTable> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut columns: Vec<(String, ColumnData)> = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        if columns.is_empty() {
            columns = schema
                .fields()
                .iter()
                .map(|f| {
                    let kind = column_kind(f.name()).unwrap_or(match f.data_type() {
                        DataType::Int32 | DataType::Int64 => ColumnKind::Integer,
                        _ => ColumnKind::Float,
                    });
                    (f.name().clone(), empty_column(kind))
                })
                .collect();
        }

        for (col_idx, (name, data)) in columns.iter_mut().enumerate() {
            let array = batch.column(col_idx);
            append_arrow_column(data, array)
                .with_context(|| format!("Parquet column '{name}'"))?;
        }
    }

    let mut table = SpaxelTable::new();
    for (name, data) in columns {
        table.push_column(name, data)?;
    }
    Ok(table)
}

fn empty_column(kind: ColumnKind) -> ColumnData {
    match kind {
        ColumnKind::Integer => ColumnData::Integer(Vec::new()),
        ColumnKind::Float => ColumnData::Float(Vec::new()),
        ColumnKind::Class => ColumnData::Class(Vec::new()),
    }
}

/// Read an Arrow numeric column as `f64`, nulls as NaN.
fn arrow_to_f64(col: &Arc<dyn Array>) -> Result<Vec<f64>> {
    let values = match col.data_type() {
        DataType::Float64 => col
            .as_any()
            .downcast_ref::<Float64Array>()
            .context("expected Float64Array")?
            .iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect(),
        DataType::Float32 => col
            .as_any()
            .downcast_ref::<Float32Array>()
            .context("expected Float32Array")?
            .iter()
            .map(|v| v.map_or(f64::NAN, f64::from))
            .collect(),
        DataType::Int64 => col
            .as_any()
            .downcast_ref::<Int64Array>()
            .context("expected Int64Array")?
            .iter()
            .map(|v| v.map_or(f64::NAN, |i| i as f64))
            .collect(),
        DataType::Int32 => col
            .as_any()
            .downcast_ref::<Int32Array>()
            .context("expected Int32Array")?
            .iter()
            .map(|v| v.map_or(f64::NAN, f64::from))
            .collect(),
        other => bail!("Expected a numeric column, got {other:?}"),
    };
    Ok(values)
}

/// Read an Arrow integer column; `None` for nulls.
fn arrow_to_i64(col: &Arc<dyn Array>) -> Result<Vec<Option<i64>>> {
    let values = match col.data_type() {
        DataType::Int64 => col
            .as_any()
            .downcast_ref::<Int64Array>()
            .context("expected Int64Array")?
            .iter()
            .collect(),
        DataType::Int32 => col
            .as_any()
            .downcast_ref::<Int32Array>()
            .context("expected Int32Array")?
            .iter()
            .map(|v| v.map(i64::from))
            .collect(),
        other => bail!("Expected an integer column, got {other:?}"),
    };
    Ok(values)
}

fn append_arrow_column(data: &mut ColumnData, col: &Arc<dyn Array>) -> Result<()> {
    match data {
        ColumnData::Integer(out) => {
            for (row, v) in arrow_to_i64(col)?.into_iter().enumerate() {
                out.push(v.with_context(|| format!("null value at row {row}"))?);
            }
        }
        ColumnData::Float(out) => out.extend(arrow_to_f64(col)?),
        ColumnData::Class(out) => {
            if matches!(col.data_type(), DataType::Int32 | DataType::Int64) {
                for label in arrow_to_i64(col)? {
                    out.push(BptClass::from_label(label)?);
                }
            } else {
                for code in arrow_to_f64(col)? {
                    out.push(class_from_code(code)?);
                }
            }
        }
    }
    Ok(())
}
