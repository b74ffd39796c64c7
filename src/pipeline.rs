//! Ingestion entry points: FITS maps → spaxel table → database.

use std::fs::OpenOptions;
use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use rusqlite::Connection;

use crate::config::PipelineConfig;
use crate::data::model::SpaxelTable;
use crate::data::table::{build_spaxel_table, GalaxyMaps};
use crate::db;

/// Open (creating if needed) a database and reset its spaxel table.
pub fn make_database(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let conn = open_database(path)?;
    db::create_schema(&conn)?;
    Ok(conn)
}

pub fn open_database(path: &Path) -> Result<Connection> {
    Connection::open(path).with_context(|| format!("opening database {}", path.display()))
}

/// Read every map of one galaxy and flatten it into a classified table.
pub fn build_galaxy_table(config: &PipelineConfig, catid: i64) -> Result<SpaxelTable> {
    let source = config.fits_source();
    let wcs = source.read_wcs(catid)?;
    let maps = GalaxyMaps::load(&source, catid)?;
    build_spaxel_table(catid, &maps, &wcs, config.shape())
}

/// Build one galaxy's table and append it to the database.
pub fn ingest_galaxy(config: &PipelineConfig, conn: &mut Connection, catid: i64) -> Result<usize> {
    let table = build_galaxy_table(config, catid)
        .with_context(|| format!("building spaxel table for CATID {catid}"))?;
    let n = db::append_table(conn, &table)?;
    info!("CATID {catid}: wrote {n} spaxels");
    Ok(n)
}

/// Create or touch a marker file recording a finished step.
pub fn touch(path: &Path) -> Result<()> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("touching {}", path.display()))?;
    Ok(())
}
