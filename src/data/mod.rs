/// Data layer: FITS maps, the spaxel table, and tabular file I/O.
///
/// Architecture:
/// ```text
///  {catid}_A_{quantity}_{cube}_{fit}.fits
///        │
///        ▼
///   ┌──────────┐
///   │   fits    │  read value/error HDUs, WCS header
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  table    │  flatten maps → SpaxelTable, line ratios, BPT class
///   └──────────┘
///        │
///        ▼
///   ┌────────────────┐
///   │ export / loader │  .parquet / .csv round trip
///   └────────────────┘
/// ```

pub mod export;
pub mod fits;
pub mod loader;
pub mod model;
pub mod sample;
pub mod table;
pub mod wcs;
