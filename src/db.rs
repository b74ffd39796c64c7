//! SQLite persistence of spaxel tables.
//!
//! One table, `sami`, holds every spaxel of every ingested galaxy. It is
//! created once by [`create_schema`] and appended to per galaxy.

use anyhow::{Context, Result};
use log::{debug, info};
use rusqlite::types::{ToSqlOutput, Value};
use rusqlite::{params, params_from_iter, Connection, ToSql};

use crate::bpt::{classify_spaxels, BptClass, BptSummary};
use crate::data::model::{CellValue, ColumnData, SpaxelTable};
use crate::data::table::{log_ratio, ColumnKind, SPAXEL_COLUMNS};

pub const TABLE_NAME: &str = "sami";

impl ToSql for CellValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            CellValue::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            CellValue::Float(v) => ToSqlOutput::Owned(Value::Real(*v)),
            CellValue::Null => ToSqlOutput::Owned(Value::Null),
        })
    }
}

fn sql_type(kind: ColumnKind) -> &'static str {
    match kind {
        ColumnKind::Integer => "INTEGER",
        ColumnKind::Float => "FLOAT",
        ColumnKind::Class => "INT",
    }
}

/// `CREATE TABLE` statement for the spaxel table.
pub fn schema_sql() -> String {
    let mut columns = vec!["[id] INTEGER PRIMARY KEY".to_string()];
    columns.extend(
        SPAXEL_COLUMNS
            .iter()
            .map(|(name, kind)| format!("[{name}] {}", sql_type(*kind))),
    );
    format!(
        "CREATE TABLE IF NOT EXISTS {TABLE_NAME} ({})",
        columns.join(", ")
    )
}

/// Drop and recreate the spaxel table.
pub fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute(&format!("DROP TABLE IF EXISTS {TABLE_NAME}"), [])
        .context("dropping spaxel table")?;
    conn.execute(&schema_sql(), [])
        .context("creating spaxel table")?;
    info!("created table {TABLE_NAME}");
    Ok(())
}

/// Append every row of `table` in one transaction. Returns the number of
/// rows written; `id` is assigned by SQLite.
pub fn append_table(conn: &mut Connection, table: &SpaxelTable) -> Result<usize> {
    let names = table.column_names();
    let columns = names
        .iter()
        .map(|n| format!("[{n}]"))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = vec!["?"; names.len()].join(", ");
    let sql = format!("INSERT INTO {TABLE_NAME} ({columns}) VALUES ({placeholders})");

    let tx = conn.transaction().context("starting transaction")?;
    {
        let mut stmt = tx.prepare(&sql).context("preparing insert")?;
        for i in 0..table.len() {
            stmt.execute(params_from_iter(table.row(i)))
                .with_context(|| format!("inserting row {i}"))?;
        }
    }
    tx.commit().context("committing rows")?;
    debug!("appended {} rows to {TABLE_NAME}", table.len());
    Ok(table.len())
}

/// Number of stored spaxels, optionally for one galaxy.
pub fn count_rows(conn: &Connection, catid: Option<i64>) -> Result<usize> {
    let n: i64 = match catid {
        Some(id) => conn.query_row(
            &format!("SELECT COUNT(*) FROM {TABLE_NAME} WHERE CATID = ?1"),
            params![id],
            |row| row.get(0),
        ),
        None => conn.query_row(&format!("SELECT COUNT(*) FROM {TABLE_NAME}"), [], |row| {
            row.get(0)
        }),
    }
    .context("counting rows")?;
    Ok(n as usize)
}

/// Recompute `log10_OIII_Hbeta`, `log10_SII_Halpha` and `BPT_class` for every
/// stored row from its fluxes.
pub fn reclassify(conn: &mut Connection) -> Result<BptSummary> {
    let (ids, fluxes) = {
        let mut stmt = conn
            .prepare(&format!(
                "SELECT id, OIII5007_flux, hbeta_flux, SII6731_flux, halpha_flux FROM {TABLE_NAME} ORDER BY id"
            ))
            .context("preparing flux query")?;
        let rows = stmt
            .query_map([], |row| {
                let flux = |i: usize| -> rusqlite::Result<f64> {
                    Ok(row.get::<_, Option<f64>>(i)?.unwrap_or(f64::NAN))
                };
                Ok((row.get::<_, i64>(0)?, [flux(1)?, flux(2)?, flux(3)?, flux(4)?]))
            })
            .context("querying fluxes")?;

        let mut ids = Vec::new();
        let mut fluxes: [Vec<f64>; 4] = Default::default();
        for row in rows {
            let (id, f) = row.context("reading flux row")?;
            ids.push(id);
            for (column, v) in fluxes.iter_mut().zip(f) {
                column.push(v);
            }
        }
        (ids, fluxes)
    };

    let [oiii, hbeta, sii, halpha] = fluxes;
    let oiii_hbeta = log_ratio(&oiii, &hbeta);
    let sii_halpha = log_ratio(&sii, &halpha);
    let classes = classify_spaxels(&oiii_hbeta, &sii_halpha)?;

    let tx = conn.transaction().context("starting transaction")?;
    {
        let mut stmt = tx
            .prepare(&format!(
                "UPDATE {TABLE_NAME} SET log10_OIII_Hbeta = ?1, log10_SII_Halpha = ?2, BPT_class = ?3 WHERE id = ?4"
            ))
            .context("preparing update")?;
        for (i, id) in ids.iter().enumerate() {
            stmt.execute(params![
                CellValue::from_f64(oiii_hbeta[i]),
                CellValue::from_f64(sii_halpha[i]),
                classes[i].label(),
                id
            ])
            .with_context(|| format!("updating row {id}"))?;
        }
    }
    tx.commit().context("committing classifications")?;

    let summary = BptSummary::from_classes(&classes);
    info!("reclassified {} rows: {summary}", ids.len());
    Ok(summary)
}

/// Read stored spaxels back into a table, optionally for one galaxy.
pub fn read_table(conn: &Connection, catid: Option<i64>) -> Result<SpaxelTable> {
    let names: Vec<&str> = SPAXEL_COLUMNS.iter().map(|(n, _)| *n).collect();
    let select = names
        .iter()
        .map(|n| format!("[{n}]"))
        .collect::<Vec<_>>()
        .join(", ");
    let filter = if catid.is_some() { " WHERE CATID = ?1" } else { "" };
    let sql = format!("SELECT {select} FROM {TABLE_NAME}{filter} ORDER BY id");

    let mut stmt = conn.prepare(&sql).context("preparing select")?;
    let mut rows = match catid {
        Some(id) => stmt.query(params![id]),
        None => stmt.query([]),
    }
    .context("querying spaxels")?;

    let mut data: Vec<ColumnData> = SPAXEL_COLUMNS
        .iter()
        .map(|(_, kind)| match kind {
            ColumnKind::Integer => ColumnData::Integer(Vec::new()),
            ColumnKind::Float => ColumnData::Float(Vec::new()),
            ColumnKind::Class => ColumnData::Class(Vec::new()),
        })
        .collect();

    while let Some(row) = rows.next().context("reading spaxel row")? {
        for (i, column) in data.iter_mut().enumerate() {
            match column {
                ColumnData::Integer(v) => v.push(row.get::<_, Option<i64>>(i)?.unwrap_or_default()),
                ColumnData::Float(v) => v.push(row.get::<_, Option<f64>>(i)?.unwrap_or(f64::NAN)),
                ColumnData::Class(v) => {
                    v.push(BptClass::from_label(row.get::<_, Option<i64>>(i)?)?)
                }
            }
        }
    }

    let mut table = SpaxelTable::new();
    for (name, column) in names.into_iter().zip(data) {
        table.push_column(name, column)?;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(catid: i64) -> SpaxelTable {
        let mut t = SpaxelTable::new();
        let n = 4;
        for (name, kind) in SPAXEL_COLUMNS {
            let data = match kind {
                ColumnKind::Integer => ColumnData::Integer(vec![catid; n]),
                ColumnKind::Float => ColumnData::Float(vec![1.0; n]),
                ColumnKind::Class => ColumnData::Class(vec![BptClass::Undefined; n]),
            };
            t.push_column(name, data).unwrap();
        }
        // fluxes for SF, LINER, Seyfert, missing
        let s = 10.0_f64.powf(0.5);
        t.set_column("OIII5007_flux", ColumnData::Float(vec![10.0_f64.powf(-0.5), 10.0_f64.powf(1.5), 100.0, f64::NAN]))
            .unwrap();
        t.set_column("SII6731_flux", ColumnData::Float(vec![1.0 / s, s, s, 1.0]))
            .unwrap();
        t
    }

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn test_schema_has_all_columns() {
        let conn = memory_db();
        let mut stmt = conn.prepare("PRAGMA table_info(sami)").unwrap();
        let names: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(names.len(), 48);
        assert_eq!(names[0], "id");
        assert_eq!(names[1], "CATID");
        assert_eq!(names.last().map(String::as_str), Some("BPT_class"));
    }

    #[test]
    fn test_append_and_count() {
        let mut conn = memory_db();
        assert_eq!(append_table(&mut conn, &table(1)).unwrap(), 4);
        assert_eq!(append_table(&mut conn, &table(2)).unwrap(), 4);
        assert_eq!(count_rows(&conn, None).unwrap(), 8);
        assert_eq!(count_rows(&conn, Some(2)).unwrap(), 4);
        assert_eq!(count_rows(&conn, Some(3)).unwrap(), 0);
    }

    #[test]
    fn test_nan_is_stored_as_null() {
        let mut conn = memory_db();
        append_table(&mut conn, &table(1)).unwrap();
        let nulls: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sami WHERE OIII5007_flux IS NULL AND BPT_class IS NULL",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(nulls, 1);
    }

    #[test]
    fn test_reclassify_updates_rows() {
        let mut conn = memory_db();
        append_table(&mut conn, &table(1)).unwrap();

        let summary = reclassify(&mut conn).unwrap();
        assert_eq!(summary.count(BptClass::StarForming), 1);
        assert_eq!(summary.count(BptClass::Liner), 1);
        assert_eq!(summary.count(BptClass::Seyfert), 1);
        assert_eq!(summary.count(BptClass::Undefined), 1);

        let stored = read_table(&conn, Some(1)).unwrap();
        assert_eq!(
            stored.column("BPT_class"),
            Some(&ColumnData::Class(vec![
                BptClass::StarForming,
                BptClass::Liner,
                BptClass::Seyfert,
                BptClass::Undefined
            ]))
        );
        let y = stored.float_column("log10_OIII_Hbeta").unwrap();
        assert!((y[0] - -0.5).abs() < 1e-12);
        assert!(y[3].is_nan());
    }

    #[test]
    fn test_read_table_filters_by_catid() {
        let mut conn = memory_db();
        append_table(&mut conn, &table(1)).unwrap();
        append_table(&mut conn, &table(2)).unwrap();
        let t = read_table(&conn, Some(2)).unwrap();
        assert_eq!(t.len(), 4);
        assert_eq!(t.column("CATID"), Some(&ColumnData::Integer(vec![2; 4])));
        assert_eq!(read_table(&conn, None).unwrap().len(), 8);
    }
}
