/// BPT (Baldwin–Phillips–Terlevich) diagnostics: the Kewley et al. (2006)
/// boundary curves and the spaxel classifier built on top of them.
///
/// ```text
///   log10(OIII/Hbeta)
///        │        Seyfert
///        │   ╲            ╱
///        │    ╲         ╱  LINER
///        │ SF  │      ╱
///        └─────┴────────────── log10(SII/Halpha)
/// ```
///
/// Only the SII/Halpha diagram is used for classification, following
/// Belfiore et al. (2016).
pub mod boundary;
pub mod classify;

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

pub use boundary::{
    composite_boundaries, composite_boundary, seyfert_liner_boundaries, seyfert_liner_boundary,
    star_forming_boundaries, star_forming_boundary,
};
pub use classify::{classify_spaxel, classify_spaxel_codes, classify_spaxels, BptSummary};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BptError {
    #[error("unknown ratio axis '{0}': expected one of NII, SII or OI")]
    UnknownAxis(String),

    #[error("the {curve} boundary is not defined on the {axis} axis")]
    UnsupportedAxis {
        curve: &'static str,
        axis: RatioAxis,
    },

    #[error("ratio arrays differ in length: {oiii_hbeta} OIII/Hbeta values vs {sii_halpha} SII/Halpha values")]
    LengthMismatch { oiii_hbeta: usize, sii_halpha: usize },

    #[error("unknown BPT label {0}")]
    UnknownLabel(i64),
}

// ---------------------------------------------------------------------------
// RatioAxis – x axis of a BPT diagram
// ---------------------------------------------------------------------------

/// The emission-line ratio on the x axis of a BPT diagram; each axis is
/// `log10(line / Halpha)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RatioAxis {
    /// `log10([NII]6583 / Halpha)`
    NII,
    /// `log10([SII]6731 / Halpha)`
    SII,
    /// `log10([OI]6300 / Halpha)`
    OI,
}

impl RatioAxis {
    pub const ALL: [RatioAxis; 3] = [RatioAxis::NII, RatioAxis::SII, RatioAxis::OI];

    pub fn name(self) -> &'static str {
        match self {
            RatioAxis::NII => "NII",
            RatioAxis::SII => "SII",
            RatioAxis::OI => "OI",
        }
    }
}

impl fmt::Display for RatioAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RatioAxis {
    type Err = BptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NII" => Ok(RatioAxis::NII),
            "SII" => Ok(RatioAxis::SII),
            "OI" => Ok(RatioAxis::OI),
            other => Err(BptError::UnknownAxis(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// BptClass – the label of one spaxel
// ---------------------------------------------------------------------------

/// Ionisation class of a spaxel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BptClass {
    StarForming,
    Liner,
    Seyfert,
    /// Missing or non-finite line ratios.
    Undefined,
}

impl BptClass {
    /// Numeric encoding: 0, 1, 2, or NaN for missing data.
    pub fn code(self) -> f64 {
        match self.label() {
            Some(l) => l as f64,
            None => f64::NAN,
        }
    }

    /// Integer encoding as stored in the `BPT_class` column; `None` is NULL.
    pub fn label(self) -> Option<i64> {
        match self {
            BptClass::StarForming => Some(0),
            BptClass::Liner => Some(1),
            BptClass::Seyfert => Some(2),
            BptClass::Undefined => None,
        }
    }

    pub fn from_label(label: Option<i64>) -> Result<Self, BptError> {
        match label {
            Some(0) => Ok(BptClass::StarForming),
            Some(1) => Ok(BptClass::Liner),
            Some(2) => Ok(BptClass::Seyfert),
            Some(other) => Err(BptError::UnknownLabel(other)),
            None => Ok(BptClass::Undefined),
        }
    }
}

impl fmt::Display for BptClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BptClass::StarForming => "star-forming",
            BptClass::Liner => "LINER",
            BptClass::Seyfert => "Seyfert",
            BptClass::Undefined => "undefined",
        };
        f.write_str(s)
    }
}
