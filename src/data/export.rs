use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use super::model::{ColumnData, SpaxelTable};

/// Write a spaxel table to a file.  Dispatch by extension (`.parquet`,
/// `.pq` or `.csv`). Missing values are written as nulls / empty cells.
pub fn export_table(table: &SpaxelTable, path: &Path) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "parquet" | "pq" => write_parquet(table, path),
        "csv" => write_csv(table, path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

fn write_csv(table: &SpaxelTable, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV")?;
    writer
        .write_record(table.column_names())
        .context("writing CSV header")?;
    for i in 0..table.len() {
        writer
            .write_record(table.row(i).iter().map(|c| c.to_string()))
            .with_context(|| format!("writing CSV row {i}"))?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

/// Arrow schema and arrays for a table: Integer → Int64, Float → nullable
/// Float64, BPT labels → nullable Int64.
pub fn to_record_batch(table: &SpaxelTable) -> Result<RecordBatch> {
    let mut fields = Vec::with_capacity(table.columns().len());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(table.columns().len());

    for column in table.columns() {
        let (field, array): (Field, ArrayRef) = match &column.data {
            ColumnData::Integer(v) => (
                Field::new(&column.name, DataType::Int64, false),
                Arc::new(Int64Array::from(v.clone())),
            ),
            ColumnData::Float(v) => (
                Field::new(&column.name, DataType::Float64, true),
                Arc::new(Float64Array::from(
                    v.iter()
                        .map(|&x| x.is_finite().then_some(x))
                        .collect::<Vec<_>>(),
                )),
            ),
            ColumnData::Class(v) => (
                Field::new(&column.name, DataType::Int64, true),
                Arc::new(Int64Array::from(
                    v.iter().map(|c| c.label()).collect::<Vec<_>>(),
                )),
            ),
        };
        fields.push(field);
        arrays.push(array);
    }

    let schema = Arc::new(Schema::new(fields));
    RecordBatch::try_new(schema, arrays).context("building record batch")
}

fn write_parquet(table: &SpaxelTable, path: &Path) -> Result<()> {
    let batch = to_record_batch(table)?;
    let file = std::fs::File::create(path).context("creating parquet file")?;
    let mut writer =
        ArrowWriter::try_new(file, batch.schema(), None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Array;

    use crate::bpt::BptClass;
    use crate::data::loader::load_table;

    fn sample() -> SpaxelTable {
        let mut t = SpaxelTable::new();
        t.push_column("CATID", ColumnData::Integer(vec![5, 5])).unwrap();
        t.push_column("log10_OIII_Hbeta", ColumnData::Float(vec![-0.25, f64::NAN]))
            .unwrap();
        t.push_column(
            "BPT_class",
            ColumnData::Class(vec![BptClass::Liner, BptClass::Undefined]),
        )
        .unwrap();
        t
    }

    #[test]
    fn test_csv_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        export_table(&sample(), &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "CATID,log10_OIII_Hbeta,BPT_class\n5,-0.25,1\n5,,\n"
        );
    }

    #[test]
    fn test_parquet_preserves_nulls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.parquet");
        export_table(&sample(), &path).unwrap();

        let loaded = load_table(&path).unwrap();
        assert_eq!(loaded.column_names(), vec!["CATID", "log10_OIII_Hbeta", "BPT_class"]);
        assert_eq!(loaded.column("CATID"), sample().column("CATID"));
        assert_eq!(loaded.column("BPT_class"), sample().column("BPT_class"));
        let y = loaded.float_column("log10_OIII_Hbeta").unwrap();
        assert_eq!(y[0], -0.25);
        assert!(y[1].is_nan());
    }

    #[test]
    fn test_record_batch_schema() {
        let batch = to_record_batch(&sample()).unwrap();
        let schema = batch.schema();
        assert_eq!(schema.field(0).data_type(), &DataType::Int64);
        assert!(!schema.field(0).is_nullable());
        assert!(schema.field(1).is_nullable());
        assert_eq!(batch.column(2).null_count(), 1);
    }
}
