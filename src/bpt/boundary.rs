use super::{BptError, RatioAxis};

// ---------------------------------------------------------------------------
// Kewley et al. (2006) diagnostic lines
// ---------------------------------------------------------------------------
//
// Each curve returns the value of log10(OIII/Hbeta) on the line at the given
// x-axis ratio. The hyperbolic lines diverge at their asymptote (x = 0.32 for
// SII, x = 0.05 for NII, x = -0.59 for OI) and are only meaningful to the left
// of it.

/// x-axis asymptote of the SII star-forming line.
pub const SII_SF_ASYMPTOTE: f64 = 0.32;

/// Star-forming / non-star-forming boundary (Kewley et al. 2006, eqs. 1-3).
/// Star-forming spaxels lie below this line.
pub fn star_forming_boundary(axis: RatioAxis, ratio: f64) -> Result<f64, BptError> {
    Ok(star_forming_line(axis)(ratio))
}

/// Composite region bounds on the NII diagram (Kewley et al. 2006, eqs. 4-5).
/// Returns `(left, right)`; composite spaxels lie between the two lines.
pub fn composite_boundary(axis: RatioAxis, ratio: f64) -> Result<(f64, f64), BptError> {
    check_composite_axis(axis)?;
    Ok(composite_lines(ratio))
}

/// Seyfert / LINER boundary. Seyferts lie above the line.
pub fn seyfert_liner_boundary(axis: RatioAxis, ratio: f64) -> Result<f64, BptError> {
    Ok(seyfert_liner_line(axis)?(ratio))
}

/// [`star_forming_boundary`] over a slice; output length matches input.
pub fn star_forming_boundaries(axis: RatioAxis, ratios: &[f64]) -> Result<Vec<f64>, BptError> {
    let line = star_forming_line(axis);
    Ok(ratios.iter().map(|&x| line(x)).collect())
}

/// [`composite_boundary`] over a slice; returns the left and right lines.
pub fn composite_boundaries(
    axis: RatioAxis,
    ratios: &[f64],
) -> Result<(Vec<f64>, Vec<f64>), BptError> {
    check_composite_axis(axis)?;
    Ok(ratios.iter().map(|&x| composite_lines(x)).unzip())
}

/// [`seyfert_liner_boundary`] over a slice.
pub fn seyfert_liner_boundaries(axis: RatioAxis, ratios: &[f64]) -> Result<Vec<f64>, BptError> {
    let line = seyfert_liner_line(axis)?;
    Ok(ratios.iter().map(|&x| line(x)).collect())
}

// -- line selection --

pub(crate) fn star_forming_line(axis: RatioAxis) -> fn(f64) -> f64 {
    match axis {
        RatioAxis::SII => sf_sii,
        RatioAxis::NII => sf_nii,
        RatioAxis::OI => sf_oi,
    }
}

pub(crate) fn seyfert_liner_line(axis: RatioAxis) -> Result<fn(f64) -> f64, BptError> {
    match axis {
        RatioAxis::SII => Ok(seyfert_liner_sii),
        RatioAxis::OI => Ok(seyfert_liner_oi),
        RatioAxis::NII => Err(BptError::UnsupportedAxis {
            curve: "Seyfert/LINER",
            axis,
        }),
    }
}

fn check_composite_axis(axis: RatioAxis) -> Result<(), BptError> {
    if axis == RatioAxis::NII {
        Ok(())
    } else {
        Err(BptError::UnsupportedAxis {
            curve: "composite",
            axis,
        })
    }
}

// -- the curves themselves --

#[inline]
pub(crate) fn sf_sii(x: f64) -> f64 {
    0.72 / (x - SII_SF_ASYMPTOTE) + 1.30
}

#[inline]
fn sf_nii(x: f64) -> f64 {
    0.61 / (x - 0.05) + 1.30
}

#[inline]
fn sf_oi(x: f64) -> f64 {
    0.73 / (x + 0.59) + 1.33
}

#[inline]
fn composite_lines(x: f64) -> (f64, f64) {
    (sf_nii(x), 0.61 / (x - 0.47) + 1.19)
}

#[inline]
pub(crate) fn seyfert_liner_sii(x: f64) -> f64 {
    1.89 * x + 0.76
}

#[inline]
fn seyfert_liner_oi(x: f64) -> f64 {
    1.18 * x + 1.30
}
