use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use log::info;

use super::fits::{FitsSource, Image, StellarMaps};
use super::model::{ColumnData, SpaxelTable};
use super::wcs::TanWcs;
use crate::bpt::{classify_spaxels, BptSummary};

// ---------------------------------------------------------------------------
// Column layout
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Float,
    /// BPT label: nullable integer.
    Class,
}

pub const OIII_HBETA: &str = "log10_OIII_Hbeta";
pub const SII_HALPHA: &str = "log10_SII_Halpha";
pub const BPT_CLASS: &str = "BPT_class";

/// Every column of a spaxel row, in table order.
pub const SPAXEL_COLUMNS: [(&str, ColumnKind); 47] = [
    ("CATID", ColumnKind::Integer),
    ("RA", ColumnKind::Float),
    ("DEC", ColumnKind::Float),
    ("cube_x", ColumnKind::Integer),
    ("cube_y", ColumnKind::Integer),
    ("stellar_flux", ColumnKind::Float),
    ("e_stellar_flux", ColumnKind::Float),
    ("stellar_SN", ColumnKind::Float),
    ("v_stars", ColumnKind::Float),
    ("e_v_stars", ColumnKind::Float),
    ("sigma_stars", ColumnKind::Float),
    ("e_sigma_stars", ColumnKind::Float),
    ("h3", ColumnKind::Float),
    ("e_h3", ColumnKind::Float),
    ("h4", ColumnKind::Float),
    ("e_h4", ColumnKind::Float),
    ("v_gas", ColumnKind::Float),
    ("e_v_gas", ColumnKind::Float),
    ("sigma_gas", ColumnKind::Float),
    ("e_sigma_gas", ColumnKind::Float),
    ("sfr", ColumnKind::Float),
    ("e_sfr", ColumnKind::Float),
    ("sfr_density", ColumnKind::Float),
    ("e_sfr_density", ColumnKind::Float),
    ("halpha_flux", ColumnKind::Float),
    ("e_halpha_flux", ColumnKind::Float),
    ("hbeta_flux", ColumnKind::Float),
    ("e_hbeta_flux", ColumnKind::Float),
    ("NII6583_flux", ColumnKind::Float),
    ("e_NII6583_flux", ColumnKind::Float),
    ("OI6300_flux", ColumnKind::Float),
    ("e_OI6300_flux", ColumnKind::Float),
    ("OII3728_flux", ColumnKind::Float),
    ("e_OII3728_flux", ColumnKind::Float),
    ("OIII5007_flux", ColumnKind::Float),
    ("e_OIII5007_flux", ColumnKind::Float),
    ("SII6716_flux", ColumnKind::Float),
    ("e_SII6716_flux", ColumnKind::Float),
    ("SII6731_flux", ColumnKind::Float),
    ("e_SII6731_flux", ColumnKind::Float),
    ("extinct_corr", ColumnKind::Float),
    ("e_extinct_corr", ColumnKind::Float),
    ("log10_NII_Halpha", ColumnKind::Float),
    ("log10_OI_Halpha", ColumnKind::Float),
    (OIII_HBETA, ColumnKind::Float),
    (SII_HALPHA, ColumnKind::Float),
    (BPT_CLASS, ColumnKind::Class),
];

pub fn column_kind(name: &str) -> Option<ColumnKind> {
    SPAXEL_COLUMNS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, k)| *k)
}

/// Gas quantity file → (value column, error column).
pub const GAS_QUANTITIES: [(&str, &str, &str); 13] = [
    ("gas-velocity", "v_gas", "e_v_gas"),
    ("gas-vdisp", "sigma_gas", "e_sigma_gas"),
    ("sfr", "sfr", "e_sfr"),
    ("sfr-dens", "sfr_density", "e_sfr_density"),
    ("Halpha", "halpha_flux", "e_halpha_flux"),
    ("Hbeta", "hbeta_flux", "e_hbeta_flux"),
    ("NII6583", "NII6583_flux", "e_NII6583_flux"),
    ("OI6300", "OI6300_flux", "e_OI6300_flux"),
    ("OII3728", "OII3728_flux", "e_OII3728_flux"),
    ("OIII5007", "OIII5007_flux", "e_OIII5007_flux"),
    ("SII6716", "SII6716_flux", "e_SII6716_flux"),
    ("SII6731", "SII6731_flux", "e_SII6731_flux"),
    ("extinct-corr", "extinct_corr", "e_extinct_corr"),
];

pub const STELLAR_DISPERSION: &str = "stellar-velocity-dispersion";
pub const STELLAR_VELOCITY: &str = "stellar-velocity";
pub const STELLAR_H3: &str = "stellar-velocity-h3";
pub const STELLAR_H4: &str = "stellar-velocity-h4";

/// Derived `log10(numerator / denominator)` columns.
const LINE_RATIOS: [(&str, &str, &str); 4] = [
    ("log10_NII_Halpha", "NII6583_flux", "halpha_flux"),
    ("log10_OI_Halpha", "OI6300_flux", "halpha_flux"),
    (OIII_HBETA, "OIII5007_flux", "hbeta_flux"),
    (SII_HALPHA, "SII6731_flux", "halpha_flux"),
];

// ---------------------------------------------------------------------------
// GalaxyMaps – everything loaded for one galaxy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GalaxyMaps {
    /// Gas quantity → (value, error).
    pub gas: BTreeMap<String, (Image, Image)>,
    /// Stellar quantity → its five HDUs.
    pub stellar: BTreeMap<String, StellarMaps>,
}

impl GalaxyMaps {
    pub fn load(source: &FitsSource, catid: i64) -> Result<Self> {
        let mut gas = BTreeMap::new();
        for (quantity, _, _) in GAS_QUANTITIES {
            let maps = source
                .load_gas_quantity(catid, quantity)
                .with_context(|| format!("loading {quantity} for {catid}"))?;
            gas.insert(quantity.to_string(), maps);
        }

        let mut stellar = BTreeMap::new();
        for quantity in [STELLAR_DISPERSION, STELLAR_VELOCITY, STELLAR_H3, STELLAR_H4] {
            let maps = source
                .load_stellar_quantity(catid, quantity)
                .with_context(|| format!("loading {quantity} for {catid}"))?;
            stellar.insert(quantity.to_string(), maps);
        }

        Ok(GalaxyMaps { gas, stellar })
    }

    fn gas(&self, quantity: &str) -> Result<&(Image, Image)> {
        self.gas
            .get(quantity)
            .with_context(|| format!("gas quantity {quantity} not loaded"))
    }

    fn stellar(&self, quantity: &str) -> Result<&StellarMaps> {
        self.stellar
            .get(quantity)
            .with_context(|| format!("stellar quantity {quantity} not loaded"))
    }
}

// ---------------------------------------------------------------------------
// Flattening
// ---------------------------------------------------------------------------

/// First plane of `image`, which must hold exactly `n` pixels.
fn flat(image: &Image, n: usize, what: &str) -> Result<ColumnData> {
    let plane = image.plane(0).with_context(|| what.to_string())?;
    if plane.len() != n {
        bail!(
            "{what}: map has {} spaxels (shape {:?}), expected {n}",
            plane.len(),
            image.shape
        );
    }
    Ok(ColumnData::Float(plane.to_vec()))
}

/// One row per spaxel, row-major over a `[height, width]` map:
/// row `k` is `cube_x = k / width`, `cube_y = k % width`.
pub fn build_spaxel_table(
    catid: i64,
    maps: &GalaxyMaps,
    wcs: &TanWcs,
    shape: [usize; 2],
) -> Result<SpaxelTable> {
    let [height, width] = shape;
    let n = height * width;

    let cube_x: Vec<i64> = (0..n).map(|k| (k / width) as i64).collect();
    let cube_y: Vec<i64> = (0..n).map(|k| (k % width) as i64).collect();
    let (ra, dec): (Vec<f64>, Vec<f64>) = cube_x
        .iter()
        .zip(&cube_y)
        .map(|(&x, &y)| wcs.pixel_to_sky(x as f64, y as f64))
        .unzip();

    let mut table = SpaxelTable::new();
    table.push_column("CATID", ColumnData::Integer(vec![catid; n]))?;
    table.push_column("RA", ColumnData::Float(ra))?;
    table.push_column("DEC", ColumnData::Float(dec))?;
    table.push_column("cube_x", ColumnData::Integer(cube_x))?;
    table.push_column("cube_y", ColumnData::Integer(cube_y))?;

    let dispersion = maps.stellar(STELLAR_DISPERSION)?;
    let velocity = maps.stellar(STELLAR_VELOCITY)?;
    let h3 = maps.stellar(STELLAR_H3)?;
    let h4 = maps.stellar(STELLAR_H4)?;
    let stellar_columns: [(&str, &Image); 11] = [
        ("stellar_flux", &dispersion.flux),
        ("e_stellar_flux", &dispersion.flux_error),
        ("stellar_SN", &dispersion.signal_to_noise),
        ("v_stars", &velocity.value),
        ("e_v_stars", &velocity.error),
        ("sigma_stars", &dispersion.value),
        ("e_sigma_stars", &dispersion.error),
        ("h3", &h3.value),
        ("e_h3", &h3.error),
        ("h4", &h4.value),
        ("e_h4", &h4.error),
    ];
    for (name, image) in stellar_columns {
        table.push_column(name, flat(image, n, name)?)?;
    }

    for (quantity, value_col, error_col) in GAS_QUANTITIES {
        let (value, error) = maps.gas(quantity)?;
        table.push_column(value_col, flat(value, n, value_col)?)?;
        table.push_column(error_col, flat(error, n, error_col)?)?;
    }

    add_line_ratios(&mut table)?;
    let summary = classify_table(&mut table)?;
    info!("CATID {catid}: {n} spaxels, {summary}");
    Ok(table)
}

/// `log10(a / b)` element-wise. Missing, zero or negative fluxes give
/// non-finite values, which classify as undefined.
pub fn log_ratio(numerator: &[f64], denominator: &[f64]) -> Vec<f64> {
    numerator
        .iter()
        .zip(denominator)
        .map(|(&a, &b)| (a / b).log10())
        .collect()
}

/// Compute (or recompute) the derived line-ratio columns from the fluxes.
pub fn add_line_ratios(table: &mut SpaxelTable) -> Result<()> {
    for (name, numerator, denominator) in LINE_RATIOS {
        let ratio = log_ratio(
            table.float_column(numerator)?,
            table.float_column(denominator)?,
        );
        table.set_column(name, ColumnData::Float(ratio))?;
    }
    Ok(())
}

/// Set `BPT_class` from the two ratio columns of `table`.
pub fn classify_table(table: &mut SpaxelTable) -> Result<BptSummary> {
    let classes = classify_spaxels(table.float_column(OIII_HBETA)?, table.float_column(SII_HALPHA)?)?;
    let summary = BptSummary::from_classes(&classes);
    table.set_column(BPT_CLASS, ColumnData::Class(classes))?;
    Ok(summary)
}
