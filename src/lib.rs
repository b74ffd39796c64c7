//! Per-spaxel SAMI database builder.
//!
//! Reads each galaxy's emission-line and stellar-kinematic FITS maps,
//! flattens them into one row per spaxel, derives the BPT line ratios and
//! classification, and appends the rows to a SQLite table.
//!
//! The BPT classifier in [`bpt`] has no I/O and can be used on its own:
//!
//! ```
//! use sami_spaxels::bpt::{classify_spaxel, classify_spaxels, BptClass};
//!
//! assert_eq!(classify_spaxel(-0.5, -0.5), BptClass::StarForming);
//! let classes = classify_spaxels(&[1.5, 2.0, f64::NAN], &[0.5, 0.5, 0.1]).unwrap();
//! assert_eq!(classes, vec![BptClass::Liner, BptClass::Seyfert, BptClass::Undefined]);
//! ```

pub mod bpt;
pub mod config;
pub mod data;
pub mod db;
pub mod pipeline;
