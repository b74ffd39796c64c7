use std::collections::BTreeMap;
use std::fmt;

use super::boundary::{seyfert_liner_sii, sf_sii, SII_SF_ASYMPTOTE};
use super::{BptClass, BptError};

// ---------------------------------------------------------------------------
// Scalar classifier
// ---------------------------------------------------------------------------

/// Classify a single spaxel on the SII/Halpha BPT diagram.
///
/// * Non-finite input on either axis → [`BptClass::Undefined`]
/// * Below the Kewley (2006) star-forming line **and** left of its asymptote
///   (`x < 0.32`) → [`BptClass::StarForming`]
/// * Otherwise, below the Seyfert/LINER line → [`BptClass::Liner`], on or
///   above it → [`BptClass::Seyfert`]
///
/// A spaxel under the star-forming curve but at `x >= 0.32` is not
/// star-forming: the curve is only valid left of its asymptote, so it goes on
/// to the Seyfert/LINER test.
pub fn classify_spaxel(log10_oiii_hbeta: f64, log10_sii_halpha: f64) -> BptClass {
    let (y, x) = (log10_oiii_hbeta, log10_sii_halpha);

    if !(y.is_finite() && x.is_finite()) {
        return BptClass::Undefined;
    }
    if y < sf_sii(x) && x < SII_SF_ASYMPTOTE {
        return BptClass::StarForming;
    }
    if y < seyfert_liner_sii(x) {
        BptClass::Liner
    } else {
        BptClass::Seyfert
    }
}

// ---------------------------------------------------------------------------
// Vectorised classifier
// ---------------------------------------------------------------------------

/// Label lookup indexed by `finite << 2 | star_forming << 1 | below_seyfert_liner`.
const LABELS: [BptClass; 8] = [
    BptClass::Undefined,
    BptClass::Undefined,
    BptClass::Undefined,
    BptClass::Undefined,
    BptClass::Seyfert,
    BptClass::Liner,
    BptClass::StarForming,
    BptClass::StarForming,
];

/// Classify paired arrays of line ratios in one pass.
///
/// Each element is reduced to three masks (both finite, inside the
/// star-forming region, below the Seyfert/LINER line) that are combined
/// without branching. The result is identical, element by element, to
/// [`classify_spaxel`].
pub fn classify_spaxels(
    log10_oiii_hbeta: &[f64],
    log10_sii_halpha: &[f64],
) -> Result<Vec<BptClass>, BptError> {
    if log10_oiii_hbeta.len() != log10_sii_halpha.len() {
        return Err(BptError::LengthMismatch {
            oiii_hbeta: log10_oiii_hbeta.len(),
            sii_halpha: log10_sii_halpha.len(),
        });
    }

    Ok(log10_oiii_hbeta
        .iter()
        .zip(log10_sii_halpha)
        .map(|(&y, &x)| {
            let finite = y.is_finite() & x.is_finite();
            let star_forming = (y < sf_sii(x)) & (x < SII_SF_ASYMPTOTE);
            let below_sl = y < seyfert_liner_sii(x);
            LABELS[(finite as usize) << 2 | (star_forming as usize) << 1 | below_sl as usize]
        })
        .collect())
}

/// [`classify_spaxels`] returning the numeric encoding (0, 1, 2, NaN).
pub fn classify_spaxel_codes(
    log10_oiii_hbeta: &[f64],
    log10_sii_halpha: &[f64],
) -> Result<Vec<f64>, BptError> {
    Ok(classify_spaxels(log10_oiii_hbeta, log10_sii_halpha)?
        .into_iter()
        .map(BptClass::code)
        .collect())
}

// ---------------------------------------------------------------------------
// Summary counts
// ---------------------------------------------------------------------------

/// Per-class counts of a classified batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BptSummary {
    pub counts: BTreeMap<BptClass, usize>,
}

impl BptSummary {
    pub fn from_classes(classes: &[BptClass]) -> Self {
        let mut counts = BTreeMap::new();
        for &c in classes {
            *counts.entry(c).or_insert(0) += 1;
        }
        BptSummary { counts }
    }

    pub fn count(&self, class: BptClass) -> usize {
        self.counts.get(&class).copied().unwrap_or(0)
    }

    /// Number of spaxels with a defined class.
    pub fn classified(&self) -> usize {
        self.counts
            .iter()
            .filter(|(c, _)| **c != BptClass::Undefined)
            .map(|(_, n)| n)
            .sum()
    }
}

impl fmt::Display for BptSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} star-forming, {} LINER, {} Seyfert, {} undefined",
            self.count(BptClass::StarForming),
            self.count(BptClass::Liner),
            self.count(BptClass::Seyfert),
            self.count(BptClass::Undefined),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_star_forming() {
        // sf line at x = -0.5 is ~0.422
        assert_eq!(classify_spaxel(-0.5, -0.5), BptClass::StarForming);
    }

    #[test]
    fn test_liner_right_of_asymptote() {
        // x >= 0.32: sl line = 1.89 * 0.5 + 0.76 = 1.705
        assert_eq!(classify_spaxel(1.5, 0.5), BptClass::Liner);
    }

    #[test]
    fn test_seyfert() {
        assert_eq!(classify_spaxel(2.0, 0.5), BptClass::Seyfert);
    }

    #[test]
    fn test_above_sf_line_left_of_asymptote() {
        // x = 0.0: sf line = 0.72 / -0.32 + 1.3 = -0.95, sl line = 0.76
        assert_eq!(classify_spaxel(0.0, 0.0), BptClass::Liner);
        assert_eq!(classify_spaxel(1.0, 0.0), BptClass::Seyfert);
    }

    #[test]
    fn test_below_sf_curve_but_past_asymptote_falls_through() {
        // Right of the asymptote the curve comes back down from +inf, so
        // y = 1.0 at x = 0.4 is "below" it (0.72 / 0.08 + 1.3 = 10.3).
        let x = 0.4;
        let y = 1.0;
        assert!(y < sf_sii(x));
        // sl line = 1.516 → LINER
        assert_eq!(classify_spaxel(y, x), BptClass::Liner);
        assert_eq!(classify_spaxel(2.0, x), BptClass::Seyfert);
    }

    #[test]
    fn test_asymptote_is_never_star_forming() {
        assert_eq!(classify_spaxel(-5.0, SII_SF_ASYMPTOTE), BptClass::Liner);
        let v = classify_spaxels(&[-5.0], &[SII_SF_ASYMPTOTE]).unwrap();
        assert_eq!(v, vec![BptClass::Liner]);
    }

    #[test]
    fn test_on_seyfert_liner_line_is_seyfert() {
        let x = 0.5;
        let y = seyfert_liner_sii(x);
        assert_eq!(classify_spaxel(y, x), BptClass::Seyfert);
        assert_eq!(classify_spaxels(&[y], &[x]).unwrap(), vec![BptClass::Seyfert]);
    }

    #[test]
    fn test_non_finite_is_undefined() {
        let bad = [f64::NAN, f64::INFINITY, f64::NEG_INFINITY];
        for &b in &bad {
            assert_eq!(classify_spaxel(b, 0.1), BptClass::Undefined);
            assert_eq!(classify_spaxel(-0.5, b), BptClass::Undefined);
            assert_eq!(classify_spaxel(b, b), BptClass::Undefined);
        }
    }

    #[test]
    fn test_vectorised_matches_scalar() {
        let y = [-0.5, 1.5, 2.0, f64::NAN, 0.0, 1.0, -3.0, 0.3, f64::INFINITY];
        let x = [-0.5, 0.5, 0.5, 0.1, 0.0, 0.4, 0.32, f64::NAN, -1.0];
        let got = classify_spaxels(&y, &x).unwrap();
        let expected: Vec<BptClass> = y
            .iter()
            .zip(&x)
            .map(|(&y, &x)| classify_spaxel(y, x))
            .collect();
        assert_eq!(got, expected);
        assert_eq!(got[0], BptClass::StarForming);
        assert_eq!(got[1], BptClass::Liner);
        assert_eq!(got[2], BptClass::Seyfert);
        assert_eq!(got[3], BptClass::Undefined);
    }

    #[test]
    fn test_length_mismatch() {
        assert_eq!(
            classify_spaxels(&[0.0, 1.0], &[0.0]),
            Err(BptError::LengthMismatch {
                oiii_hbeta: 2,
                sii_halpha: 1
            })
        );
        assert!(classify_spaxel_codes(&[], &[1.0]).is_err());
    }

    #[test]
    fn test_codes() {
        let codes = classify_spaxel_codes(&[-0.5, 1.5, 2.0, f64::NAN], &[-0.5, 0.5, 0.5, 0.1])
            .unwrap();
        assert_eq!(&codes[..3], &[0.0, 1.0, 2.0]);
        assert!(codes[3].is_nan());
    }

    #[test]
    fn test_summary() {
        let classes = classify_spaxels(&[-0.5, 1.5, 2.0, f64::NAN, -0.6], &[-0.5, 0.5, 0.5, 0.1, -0.4])
            .unwrap();
        let summary = BptSummary::from_classes(&classes);
        assert_eq!(summary.count(BptClass::StarForming), 2);
        assert_eq!(summary.count(BptClass::Liner), 1);
        assert_eq!(summary.count(BptClass::Seyfert), 1);
        assert_eq!(summary.count(BptClass::Undefined), 1);
        assert_eq!(summary.classified(), 4);
        assert_eq!(
            summary.to_string(),
            "2 star-forming, 1 LINER, 1 Seyfert, 1 undefined"
        );
    }
}
