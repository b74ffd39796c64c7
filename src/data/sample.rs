//! Synthetic SAMI-style galaxy maps for demos and tests.

use anyhow::Result;
use log::info;

use super::fits::{write_images, FitsSource, Image, CUBE_QUANTITIES};
use super::table::{GAS_QUANTITIES, STELLAR_DISPERSION, STELLAR_H3, STELLAR_H4, STELLAR_VELOCITY};
use super::wcs::WcsHeader;

/// Gas quantity left out of the sample so the missing-file fallback is used.
pub const OMITTED_QUANTITY: &str = "OII3728";

/// Minimal deterministic PRNG (xoshiro256**)
pub struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    pub fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    pub fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    pub fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// Celestial WCS written on the sample's Halpha map: 0.5" pixels centred on
/// the map.
pub fn sample_wcs(shape: [usize; 2], ra_deg: f64, dec_deg: f64) -> WcsHeader {
    let [h, w] = shape;
    WcsHeader {
        ctype1: Some("RA---TAN".into()),
        ctype2: Some("DEC--TAN".into()),
        crpix1: Some(w as f64 / 2.0 + 0.5),
        crpix2: Some(h as f64 / 2.0 + 0.5),
        crval1: Some(ra_deg),
        crval2: Some(dec_deg),
        cdelt1: Some(-0.5 / 3600.0),
        cdelt2: Some(0.5 / 3600.0),
        ..Default::default()
    }
}

/// Target `(log10 OIII/Hbeta, log10 SII/Halpha)` at a fractional radius:
/// Seyfert nucleus, LINER ring, star-forming disc, nothing outside.
fn target_ratios(r: f64) -> Option<(f64, f64)> {
    if r < 0.15 {
        Some((1.0, 0.0))
    } else if r < 0.35 {
        Some((0.2, 0.1))
    } else if r < 1.0 {
        Some((-0.5, -0.5))
    } else {
        None
    }
}

/// Write a full set of maps for `catid` into `source.data_dir`.
pub fn write_sample_galaxy(source: &FitsSource, catid: i64, seed: u64) -> Result<()> {
    let mut rng = SimpleRng::new(seed);
    let shape = source.map_shape;
    let [h, w] = shape;
    let n = h * w;
    let radius = h.min(w) as f64 / 2.0;

    let mut halpha = vec![f64::NAN; n];
    let mut hbeta = vec![f64::NAN; n];
    let mut oiii = vec![f64::NAN; n];
    let mut sii = vec![f64::NAN; n];
    for k in 0..n {
        let (row, col) = ((k / w) as f64, (k % w) as f64);
        let r = ((row + 0.5 - h as f64 / 2.0).powi(2) + (col + 0.5 - w as f64 / 2.0).powi(2))
            .sqrt()
            / radius;
        if let Some((y, x)) = target_ratios(r) {
            let ha = 50.0 * (-2.0 * r).exp() * (1.0 + rng.gauss(0.0, 0.01)).abs();
            halpha[k] = ha;
            hbeta[k] = ha / 2.86;
            oiii[k] = hbeta[k] * 10f64.powf(y + rng.gauss(0.0, 0.02));
            sii[k] = ha * 10f64.powf(x + rng.gauss(0.0, 0.02));
        }
    }

    let plane = |data: Vec<f64>| Image {
        shape: vec![h, w],
        data,
    };
    let error_of = |data: &[f64]| plane(data.iter().map(|v| 0.05 * v.abs()).collect());
    let scaled = |data: &[f64], f: f64| plane(data.iter().map(|v| v * f).collect());
    // constant inside the galaxy, missing outside
    let filled = |c: f64| plane(halpha.iter().map(|v| if v.is_nan() { f64::NAN } else { c }).collect());

    for (quantity, _, _) in GAS_QUANTITIES {
        if quantity == OMITTED_QUANTITY {
            continue;
        }
        let value = match quantity {
            "Halpha" => plane(halpha.clone()),
            "Hbeta" => plane(hbeta.clone()),
            "OIII5007" => plane(oiii.clone()),
            "SII6731" => plane(sii.clone()),
            "SII6716" => scaled(&sii, 1.3),
            "NII6583" => scaled(&halpha, 0.4),
            "OI6300" => scaled(&halpha, 0.05),
            "gas-velocity" => plane((0..n).map(|k| ((k % w) as f64 - w as f64 / 2.0) * 8.0).collect()),
            "gas-vdisp" => filled(40.0),
            "extinct-corr" => filled(1.2),
            _ => scaled(&halpha, 0.01),
        };
        let error = error_of(&value.data);

        let (value, error) = if CUBE_QUANTITIES.contains(&quantity) {
            (stack_planes(&value, 2), stack_planes(&error, 2))
        } else {
            (value, error)
        };
        let wcs = (quantity == "Halpha").then(|| sample_wcs(shape, 180.0, -1.0));
        write_images(&source.gas_path(catid, quantity), &[&value, &error], wcs.as_ref())?;
    }

    for quantity in [STELLAR_DISPERSION, STELLAR_VELOCITY, STELLAR_H3, STELLAR_H4] {
        let value = match quantity {
            STELLAR_DISPERSION => plane(vec![120.0; n]),
            STELLAR_VELOCITY => plane((0..n).map(|k| ((k % w) as f64 - w as f64 / 2.0) * 5.0).collect()),
            _ => plane((0..n).map(|_| rng.gauss(0.0, 0.02)).collect()),
        };
        let error = error_of(&value.data);
        let flux = scaled(&halpha, 3.0);
        let flux_error = error_of(&flux.data);
        let sn = plane(flux.data.iter().map(|v| v / 2.0).collect());
        write_images(
            &source.stellar_path(catid, quantity),
            &[&value, &error, &flux, &flux_error, &sn],
            None,
        )?;
    }

    info!(
        "wrote sample galaxy {catid} ({h}x{w}) to {}",
        source.data_dir.display()
    );
    Ok(())
}

/// Repeat a 2-D map as the planes of a cube.
fn stack_planes(image: &Image, planes: usize) -> Image {
    let mut shape = vec![planes];
    shape.extend(&image.shape);
    Image {
        shape,
        data: image.data.repeat(planes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rng_is_deterministic() {
        let mut a = SimpleRng::new(42);
        let mut b = SimpleRng::new(42);
        for _ in 0..10 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
        let u = a.next_f64();
        assert!((0.0..1.0).contains(&u));
    }

    #[test]
    fn test_target_regions() {
        assert_eq!(target_ratios(0.0), Some((1.0, 0.0)));
        assert_eq!(target_ratios(0.2), Some((0.2, 0.1)));
        assert_eq!(target_ratios(0.9), Some((-0.5, -0.5)));
        assert_eq!(target_ratios(1.2), None);
    }

    #[test]
    fn test_stack_planes() {
        let img = Image {
            shape: vec![1, 2],
            data: vec![1.0, 2.0],
        };
        let cube = stack_planes(&img, 2);
        assert_eq!(cube.shape, vec![2, 1, 2]);
        assert_eq!(cube.data, vec![1.0, 2.0, 1.0, 2.0]);
    }
}
