//! Celestial WCS for SAMI maps: gnomonic (TAN) projection only.
//!
//! Pixel coordinates are zero-based; FITS `CRPIX` is one-based. Sky
//! coordinates are returned in degrees.
//!
//! Reference: Calabretta & Greisen (2002), FITS WCS Paper II, §5.1.1.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WcsError {
    #[error("missing WCS keyword {0}")]
    MissingKeyword(&'static str),

    #[error("unsupported projection '{ctype1}'/'{ctype2}': only RA---TAN/DEC--TAN is supported")]
    UnsupportedProjection { ctype1: String, ctype2: String },

    #[error("singular pixel-to-sky matrix")]
    Singular,
}

/// Raw celestial WCS keywords as read from a FITS header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WcsHeader {
    pub ctype1: Option<String>,
    pub ctype2: Option<String>,
    pub crpix1: Option<f64>,
    pub crpix2: Option<f64>,
    pub crval1: Option<f64>,
    pub crval2: Option<f64>,
    /// `[[CD1_1, CD1_2], [CD2_1, CD2_2]]`, used when present.
    pub cd: Option<[[f64; 2]; 2]>,
    pub cdelt1: Option<f64>,
    pub cdelt2: Option<f64>,
    /// `[[PC1_1, PC1_2], [PC2_1, PC2_2]]`, identity if absent.
    pub pc: Option<[[f64; 2]; 2]>,
}

/// A resolved TAN projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TanWcs {
    /// Reference pixel, one-based.
    pub crpix: [f64; 2],
    /// Reference sky position in degrees.
    pub crval: [f64; 2],
    /// Pixel offset to intermediate world coordinates, degrees per pixel.
    pub cd: [[f64; 2]; 2],
}

impl TanWcs {
    pub fn from_header(h: &WcsHeader) -> Result<Self, WcsError> {
        let ctype1 = h.ctype1.clone().unwrap_or_default();
        let ctype2 = h.ctype2.clone().unwrap_or_default();
        if !(ctype1.trim().eq_ignore_ascii_case("RA---TAN")
            && ctype2.trim().eq_ignore_ascii_case("DEC--TAN"))
        {
            return Err(WcsError::UnsupportedProjection { ctype1, ctype2 });
        }

        let crpix = [
            h.crpix1.ok_or(WcsError::MissingKeyword("CRPIX1"))?,
            h.crpix2.ok_or(WcsError::MissingKeyword("CRPIX2"))?,
        ];
        let crval = [
            h.crval1.ok_or(WcsError::MissingKeyword("CRVAL1"))?,
            h.crval2.ok_or(WcsError::MissingKeyword("CRVAL2"))?,
        ];

        let cd = match h.cd {
            Some(cd) => cd,
            None => {
                let cdelt1 = h.cdelt1.ok_or(WcsError::MissingKeyword("CDELT1"))?;
                let cdelt2 = h.cdelt2.ok_or(WcsError::MissingKeyword("CDELT2"))?;
                let pc = h.pc.unwrap_or([[1.0, 0.0], [0.0, 1.0]]);
                [
                    [cdelt1 * pc[0][0], cdelt1 * pc[0][1]],
                    [cdelt2 * pc[1][0], cdelt2 * pc[1][1]],
                ]
            }
        };

        let det = cd[0][0] * cd[1][1] - cd[0][1] * cd[1][0];
        if det.abs() < 1e-30 {
            return Err(WcsError::Singular);
        }

        Ok(TanWcs { crpix, crval, cd })
    }

    /// Zero-based pixel `(x, y)` → `(ra, dec)` in degrees, RA in [0, 360).
    pub fn pixel_to_sky(&self, x: f64, y: f64) -> (f64, f64) {
        let dx = x + 1.0 - self.crpix[0];
        let dy = y + 1.0 - self.crpix[1];
        let xi = (self.cd[0][0] * dx + self.cd[0][1] * dy).to_radians();
        let eta = (self.cd[1][0] * dx + self.cd[1][1] * dy).to_radians();

        let (ra, dec) = inverse_tan_project(
            xi,
            eta,
            self.crval[0].to_radians(),
            self.crval[1].to_radians(),
        );
        (ra.to_degrees().rem_euclid(360.0), dec.to_degrees())
    }
}

/// Inverse gnomonic projection of tangent-plane `(ξ, η)` about
/// `(crval_ra, crval_dec)`; all angles in radians.
#[inline]
fn inverse_tan_project(xi: f64, eta: f64, crval_ra: f64, crval_dec: f64) -> (f64, f64) {
    let sin_dec0 = crval_dec.sin();
    let cos_dec0 = crval_dec.cos();
    let rho_sq = xi * xi + eta * eta;

    if rho_sq < 1e-30 {
        return (crval_ra, crval_dec);
    }

    let rho = rho_sq.sqrt();
    let c = rho.atan();
    let sin_c = c.sin();
    let cos_c = c.cos();

    let dec = (cos_c * sin_dec0 + eta * sin_c * cos_dec0 / rho).asin();
    let ra = crval_ra + (xi * sin_c).atan2(rho * cos_dec0 * cos_c - eta * sin_dec0 * sin_c);
    (ra, dec)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// SAMI-like header: 0.5" pixels, RA increasing to the left.
    fn sami_header() -> WcsHeader {
        WcsHeader {
            ctype1: Some("RA---TAN".into()),
            ctype2: Some("DEC--TAN".into()),
            crpix1: Some(25.5),
            crpix2: Some(25.5),
            crval1: Some(180.0),
            crval2: Some(-1.0),
            cdelt1: Some(-0.5 / 3600.0),
            cdelt2: Some(0.5 / 3600.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_reference_pixel_maps_to_crval() {
        let wcs = TanWcs::from_header(&sami_header()).unwrap();
        let (ra, dec) = wcs.pixel_to_sky(24.5, 24.5);
        assert!((ra - 180.0).abs() < 1e-12);
        assert!((dec - -1.0).abs() < 1e-12);
    }

    #[test]
    fn test_small_offsets_follow_pixel_scale() {
        let wcs = TanWcs::from_header(&sami_header()).unwrap();
        // 10 pixels up → +5 arcsec in Dec
        let (ra, dec) = wcs.pixel_to_sky(24.5, 34.5);
        assert!((ra - 180.0).abs() < 1e-9);
        assert!((dec - (-1.0 + 5.0 / 3600.0)).abs() < 1e-9);

        // 10 pixels right → RA decreases by 5"/cos(dec)
        let (ra, _) = wcs.pixel_to_sky(34.5, 24.5);
        let expected = 180.0 - 5.0 / 3600.0 / (-1.0_f64).to_radians().cos();
        assert!((ra - expected).abs() < 1e-8);
    }

    #[test]
    fn test_ra_wraps_into_range() {
        let mut h = sami_header();
        h.crval1 = Some(0.0);
        let wcs = TanWcs::from_header(&h).unwrap();
        // right of the reference pixel, RA < 0 before wrapping
        let (ra, _) = wcs.pixel_to_sky(40.0, 24.5);
        assert!(ra > 359.0 && ra < 360.0);
    }

    #[test]
    fn test_cd_matrix_takes_precedence() {
        let mut h = sami_header();
        h.cd = Some([[0.0, 1.0 / 3600.0], [1.0 / 3600.0, 0.0]]);
        let wcs = TanWcs::from_header(&h).unwrap();
        assert_eq!(wcs.cd, [[0.0, 1.0 / 3600.0], [1.0 / 3600.0, 0.0]]);
    }

    #[test]
    fn test_rejects_other_projections() {
        let mut h = sami_header();
        h.ctype1 = Some("RA---SIN".into());
        assert!(matches!(
            TanWcs::from_header(&h),
            Err(WcsError::UnsupportedProjection { .. })
        ));
    }

    #[test]
    fn test_missing_and_singular() {
        let mut h = sami_header();
        h.crval2 = None;
        assert_eq!(
            TanWcs::from_header(&h),
            Err(WcsError::MissingKeyword("CRVAL2"))
        );

        let mut h = sami_header();
        h.cdelt2 = Some(0.0);
        assert_eq!(TanWcs::from_header(&h), Err(WcsError::Singular));
    }
}
