use std::fmt;

use thiserror::Error;

use crate::bpt::BptClass;

// ---------------------------------------------------------------------------
// CellValue – a single cell of the spaxel table
// ---------------------------------------------------------------------------

/// One cell, typed the way it is persisted. Non-finite floats are missing
/// measurements and persist as NULL.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Integer(i64),
    Float(f64),
    Null,
}

impl CellValue {
    /// Float cell with NaN/inf mapped to [`CellValue::Null`].
    pub fn from_f64(v: f64) -> Self {
        if v.is_finite() {
            CellValue::Float(v)
        } else {
            CellValue::Null
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            CellValue::Null => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Null => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// ColumnData – one typed column
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Integer(Vec<i64>),
    /// Measurements; NaN marks a missing value.
    Float(Vec<f64>),
    /// BPT labels, persisted as nullable integers.
    Class(Vec<BptClass>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Integer(v) => v.len(),
            ColumnData::Float(v) => v.len(),
            ColumnData::Class(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn cell(&self, row: usize) -> CellValue {
        match self {
            ColumnData::Integer(v) => CellValue::Integer(v[row]),
            ColumnData::Float(v) => CellValue::from_f64(v[row]),
            ColumnData::Class(v) => match v[row].label() {
                Some(l) => CellValue::Integer(l),
                None => CellValue::Null,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TableError {
    #[error("column '{name}' has {got} rows but the table has {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),

    #[error("missing column '{0}'")]
    MissingColumn(String),

    #[error("column '{0}' is not a float column")]
    NotFloat(String),
}

// ---------------------------------------------------------------------------
// SpaxelTable – one row per spatial pixel
// ---------------------------------------------------------------------------

/// Column-oriented table of per-spaxel quantities. Column order is the
/// insertion order and matches the database schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpaxelTable {
    columns: Vec<Column>,
}

impl SpaxelTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column. Every column must have the same number of rows.
    pub fn push_column(&mut self, name: impl Into<String>, data: ColumnData) -> Result<(), TableError> {
        let name = name.into();
        if self.index_of(&name).is_some() {
            return Err(TableError::DuplicateColumn(name));
        }
        if let Some(first) = self.columns.first() {
            let expected = first.data.len();
            if data.len() != expected {
                return Err(TableError::LengthMismatch {
                    name,
                    expected,
                    got: data.len(),
                });
            }
        }
        self.columns.push(Column { name, data });
        Ok(())
    }

    /// Replace the data of an existing column or append a new one.
    pub fn set_column(&mut self, name: &str, data: ColumnData) -> Result<(), TableError> {
        match self.index_of(name) {
            Some(i) => {
                let expected = self.len();
                if data.len() != expected {
                    return Err(TableError::LengthMismatch {
                        name: name.to_string(),
                        expected,
                        got: data.len(),
                    });
                }
                self.columns[i].data = data;
                Ok(())
            }
            None => self.push_column(name, data),
        }
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnData> {
        self.columns.iter().find(|c| c.name == name).map(|c| &c.data)
    }

    pub fn float_column(&self, name: &str) -> Result<&[f64], TableError> {
        match self.column(name) {
            Some(ColumnData::Float(v)) => Ok(v),
            Some(_) => Err(TableError::NotFloat(name.to_string())),
            None => Err(TableError::MissingColumn(name.to_string())),
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// All cells of one row, in column order.
    pub fn row(&self, i: usize) -> Vec<CellValue> {
        self.columns.iter().map(|c| c.data.cell(i)).collect()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.columns.first().map_or(0, |c| c.data.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SpaxelTable {
        let mut t = SpaxelTable::new();
        t.push_column("CATID", ColumnData::Integer(vec![7, 7, 7])).unwrap();
        t.push_column("halpha_flux", ColumnData::Float(vec![1.5, f64::NAN, 2.0]))
            .unwrap();
        t.push_column(
            "BPT_class",
            ColumnData::Class(vec![BptClass::StarForming, BptClass::Undefined, BptClass::Seyfert]),
        )
        .unwrap();
        t
    }

    #[test]
    fn test_rows_and_nulls() {
        let t = sample();
        assert_eq!(t.len(), 3);
        assert_eq!(t.column_names(), vec!["CATID", "halpha_flux", "BPT_class"]);
        assert_eq!(
            t.row(0),
            vec![CellValue::Integer(7), CellValue::Float(1.5), CellValue::Integer(0)]
        );
        assert_eq!(
            t.row(1),
            vec![CellValue::Integer(7), CellValue::Null, CellValue::Null]
        );
        assert_eq!(t.row(2)[2], CellValue::Integer(2));
    }

    #[test]
    fn test_rejects_bad_columns() {
        let mut t = sample();
        assert_eq!(
            t.push_column("x", ColumnData::Float(vec![1.0])),
            Err(TableError::LengthMismatch {
                name: "x".into(),
                expected: 3,
                got: 1
            })
        );
        assert_eq!(
            t.push_column("CATID", ColumnData::Integer(vec![1, 2, 3])),
            Err(TableError::DuplicateColumn("CATID".into()))
        );
    }

    #[test]
    fn test_float_column_access() {
        let t = sample();
        assert_eq!(t.float_column("halpha_flux").unwrap()[0], 1.5);
        assert_eq!(
            t.float_column("CATID"),
            Err(TableError::NotFloat("CATID".into()))
        );
        assert_eq!(
            t.float_column("nope"),
            Err(TableError::MissingColumn("nope".into()))
        );
    }

    #[test]
    fn test_set_column_replaces() {
        let mut t = sample();
        t.set_column("BPT_class", ColumnData::Class(vec![BptClass::Liner; 3]))
            .unwrap();
        assert_eq!(t.columns().len(), 3);
        assert_eq!(t.row(1)[2], CellValue::Integer(1));
        assert!(t.set_column("BPT_class", ColumnData::Class(vec![])).is_err());
    }

    #[test]
    fn test_cell_value() {
        assert_eq!(CellValue::from_f64(f64::INFINITY), CellValue::Null);
        assert_eq!(CellValue::Integer(3).as_f64(), Some(3.0));
        assert!(CellValue::Null.is_null());
        assert_eq!(CellValue::Null.to_string(), "");
    }
}
