use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use fitsio::hdu::{FitsHdu, HduInfo};
use fitsio::images::{ImageDescription, ImageType};
use fitsio::FitsFile;
use log::{debug, warn};

use super::wcs::{TanWcs, WcsHeader};

/// Gas quantities stored as cubes whose first plane is the total
/// (all-component) map.
pub const CUBE_QUANTITIES: [&str; 3] = ["Halpha", "sfr", "sfr-dens"];

// ---------------------------------------------------------------------------
// Image – one FITS image HDU
// ---------------------------------------------------------------------------

/// Pixel data of one image HDU in row-major order. `shape` follows the
/// slowest-to-fastest axis order, e.g. `[2, 50, 50]` for a two-plane cube.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub shape: Vec<usize>,
    pub data: Vec<f64>,
}

impl Image {
    pub fn new(shape: Vec<usize>, data: Vec<f64>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            bail!("image shape {shape:?} needs {expected} pixels, got {}", data.len());
        }
        Ok(Image { shape, data })
    }

    /// An image where every pixel is missing.
    pub fn missing(shape: Vec<usize>) -> Self {
        let n = shape.iter().product();
        Image {
            shape,
            data: vec![f64::NAN; n],
        }
    }

    /// Number of pixels in one 2-D plane.
    pub fn plane_len(&self) -> usize {
        match self.shape.len() {
            0 => 0,
            1 => self.shape[0],
            n => self.shape[n - 2] * self.shape[n - 1],
        }
    }

    /// The `index`-th 2-D plane of a cube, or the whole image if it is 2-D.
    pub fn plane(&self, index: usize) -> Result<&[f64]> {
        let len = self.plane_len();
        let start = index * len;
        self.data
            .get(start..start + len)
            .with_context(|| format!("plane {index} out of range for shape {:?}", self.shape))
    }
}

/// The five HDUs of a stellar kinematics file.
#[derive(Debug, Clone)]
pub struct StellarMaps {
    pub value: Image,
    pub error: Image,
    pub flux: Image,
    pub flux_error: Image,
    pub signal_to_noise: Image,
}

// ---------------------------------------------------------------------------
// FitsSource – naming convention for one data release
// ---------------------------------------------------------------------------

/// Locates per-galaxy map files:
/// `{data_dir}/{catid}_A_{quantity}_{cube}_{fit}.fits`.
#[derive(Debug, Clone)]
pub struct FitsSource {
    pub data_dir: PathBuf,
    pub cube: String,
    pub gas_fit: String,
    pub stellar_fit: String,
    /// Map shape used for missing gas quantities (`[height, width]`).
    pub map_shape: [usize; 2],
}

impl FitsSource {
    pub fn path(&self, catid: i64, quantity: &str, fit: &str) -> PathBuf {
        self.data_dir
            .join(format!("{catid}_A_{quantity}_{}_{fit}.fits", self.cube))
    }

    pub fn gas_path(&self, catid: i64, quantity: &str) -> PathBuf {
        self.path(catid, quantity, &self.gas_fit)
    }

    pub fn stellar_path(&self, catid: i64, quantity: &str) -> PathBuf {
        self.path(catid, quantity, &self.stellar_fit)
    }

    /// Shape of the all-missing stand-in for an absent gas file.
    pub fn fallback_shape(&self, quantity: &str) -> Vec<usize> {
        let [h, w] = self.map_shape;
        if CUBE_QUANTITIES.contains(&quantity) {
            vec![2, h, w]
        } else {
            vec![h, w]
        }
    }

    /// Load a gas map and its error (HDUs 0 and 1). A missing file is not an
    /// error: both maps come back all-NaN.
    pub fn load_gas_quantity(&self, catid: i64, quantity: &str) -> Result<(Image, Image)> {
        let path = self.gas_path(catid, quantity);
        if !path.exists() {
            warn!("{}: not found, using missing values", path.display());
            let shape = self.fallback_shape(quantity);
            return Ok((Image::missing(shape.clone()), Image::missing(shape)));
        }

        let mut images = read_images(&path, 2)?;
        let error = images.pop().context("missing error HDU")?;
        let value = images.pop().context("missing value HDU")?;
        Ok((value, error))
    }

    /// Load a stellar kinematics map. The file must exist.
    pub fn load_stellar_quantity(&self, catid: i64, quantity: &str) -> Result<StellarMaps> {
        let path = self.stellar_path(catid, quantity);
        let mut it = read_images(&path, 5)?.into_iter();
        let mut next = |what: &str| it.next().with_context(|| format!("missing {what} HDU"));
        Ok(StellarMaps {
            value: next("value")?,
            error: next("error")?,
            flux: next("flux")?,
            flux_error: next("flux error")?,
            signal_to_noise: next("S/N")?,
        })
    }

    /// Celestial WCS of a galaxy, from the primary header of its Halpha map.
    pub fn read_wcs(&self, catid: i64) -> Result<TanWcs> {
        let path = self.gas_path(catid, "Halpha");
        let header = read_wcs_header(&path)?;
        TanWcs::from_header(&header).with_context(|| format!("WCS of {}", path.display()))
    }
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Read the first `count` image HDUs of a file as `f64`.
pub fn read_images(path: &Path, count: usize) -> Result<Vec<Image>> {
    let mut fptr = FitsFile::open(path)
        .with_context(|| format!("Failed to open FITS file: {}", path.display()))?;

    let mut images = Vec::with_capacity(count);
    for i in 0..count {
        let hdu = fptr
            .hdu(i)
            .with_context(|| format!("{}: failed to access HDU {i}", path.display()))?;
        let shape = match &hdu.info {
            HduInfo::ImageInfo { shape, .. } => shape.clone(),
            HduInfo::TableInfo { .. } => bail!("{}: HDU {i} is a table, not an image", path.display()),
            HduInfo::AnyInfo => bail!("{}: HDU {i} has an unknown type", path.display()),
        };
        let data: Vec<f64> = hdu
            .read_image(&mut fptr)
            .with_context(|| format!("{}: failed to read HDU {i}", path.display()))?;
        debug!("{}: HDU {i} shape {shape:?}", path.display());
        images.push(Image::new(shape, data)?);
    }
    Ok(images)
}

pub fn read_wcs_header(path: &Path) -> Result<WcsHeader> {
    let mut fptr = FitsFile::open(path)
        .with_context(|| format!("Failed to open FITS file: {}", path.display()))?;
    let hdu = fptr.primary_hdu().context("Failed to access primary HDU")?;

    let mut key = |name: &str| read_key_optional::<f64>(&hdu, &mut fptr, name);
    let cd = match (key("CD1_1"), key("CD1_2"), key("CD2_1"), key("CD2_2")) {
        (None, None, None, None) => None,
        (a, b, c, d) => Some([
            [a.unwrap_or(0.0), b.unwrap_or(0.0)],
            [c.unwrap_or(0.0), d.unwrap_or(0.0)],
        ]),
    };
    let pc = match (key("PC1_1"), key("PC1_2"), key("PC2_1"), key("PC2_2")) {
        (None, None, None, None) => None,
        (a, b, c, d) => Some([
            [a.unwrap_or(1.0), b.unwrap_or(0.0)],
            [c.unwrap_or(0.0), d.unwrap_or(1.0)],
        ]),
    };

    Ok(WcsHeader {
        ctype1: read_key_optional(&hdu, &mut fptr, "CTYPE1"),
        ctype2: read_key_optional(&hdu, &mut fptr, "CTYPE2"),
        crpix1: read_key_optional(&hdu, &mut fptr, "CRPIX1"),
        crpix2: read_key_optional(&hdu, &mut fptr, "CRPIX2"),
        crval1: read_key_optional(&hdu, &mut fptr, "CRVAL1"),
        crval2: read_key_optional(&hdu, &mut fptr, "CRVAL2"),
        cd,
        cdelt1: read_key_optional(&hdu, &mut fptr, "CDELT1"),
        cdelt2: read_key_optional(&hdu, &mut fptr, "CDELT2"),
        pc,
    })
}

fn read_key_optional<T: fitsio::headers::ReadsKey>(
    hdu: &FitsHdu,
    fptr: &mut FitsFile,
    key: &str,
) -> Option<T> {
    hdu.read_key(fptr, key).ok()
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Write images as consecutive HDUs (the first is the primary HDU), with the
/// WCS keywords on the primary header. Overwrites an existing file.
pub fn write_images(path: &Path, images: &[&Image], wcs: Option<&WcsHeader>) -> Result<()> {
    let Some((first, rest)) = images.split_first() else {
        bail!("no images to write to {}", path.display());
    };

    let description = ImageDescription {
        data_type: ImageType::Double,
        dimensions: &first.shape,
    };
    let mut fptr = FitsFile::create(path)
        .with_custom_primary(&description)
        .overwrite()
        .open()
        .with_context(|| format!("Failed to create FITS file: {}", path.display()))?;

    let primary = fptr.primary_hdu().context("Failed to access primary HDU")?;
    primary
        .write_image(&mut fptr, &first.data[..])
        .context("writing primary image")?;
    if let Some(h) = wcs {
        write_wcs_keys(&primary, &mut fptr, h)?;
    }

    for (i, image) in rest.iter().enumerate() {
        let description = ImageDescription {
            data_type: ImageType::Double,
            dimensions: &image.shape,
        };
        let hdu = fptr
            .create_image(format!("EXT{}", i + 1), &description)
            .with_context(|| format!("creating HDU {}", i + 1))?;
        hdu.write_image(&mut fptr, &image.data[..])
            .with_context(|| format!("writing HDU {}", i + 1))?;
    }
    Ok(())
}

fn write_wcs_keys(hdu: &FitsHdu, fptr: &mut FitsFile, h: &WcsHeader) -> Result<()> {
    if let Some(v) = &h.ctype1 {
        hdu.write_key(fptr, "CTYPE1", v.as_str())?;
    }
    if let Some(v) = &h.ctype2 {
        hdu.write_key(fptr, "CTYPE2", v.as_str())?;
    }
    let numeric = [
        ("CRPIX1", h.crpix1),
        ("CRPIX2", h.crpix2),
        ("CRVAL1", h.crval1),
        ("CRVAL2", h.crval2),
        ("CDELT1", h.cdelt1),
        ("CDELT2", h.cdelt2),
    ];
    for (key, value) in numeric {
        if let Some(v) = value {
            hdu.write_key(fptr, key, v)?;
        }
    }
    if let Some(cd) = h.cd {
        for (i, row) in cd.iter().enumerate() {
            for (j, v) in row.iter().enumerate() {
                hdu.write_key(fptr, &format!("CD{}_{}", i + 1, j + 1), *v)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(dir: &Path) -> FitsSource {
        FitsSource {
            data_dir: dir.to_path_buf(),
            cube: "default".into(),
            gas_fit: "1-comp".into(),
            stellar_fit: "four-moment".into(),
            map_shape: [50, 50],
        }
    }

    #[test]
    fn test_file_naming() {
        let src = source(Path::new("/data"));
        assert_eq!(
            src.gas_path(9011900128, "OIII5007"),
            PathBuf::from("/data/9011900128_A_OIII5007_default_1-comp.fits")
        );
        assert_eq!(
            src.stellar_path(12, "stellar-velocity"),
            PathBuf::from("/data/12_A_stellar-velocity_default_four-moment.fits")
        );
    }

    #[test]
    fn test_missing_gas_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let src = source(dir.path());

        let (value, error) = src.load_gas_quantity(1, "Hbeta").unwrap();
        assert_eq!(value.shape, vec![50, 50]);
        assert_eq!(error.shape, vec![50, 50]);
        assert!(value.data.iter().all(|v| v.is_nan()));

        for q in CUBE_QUANTITIES {
            let (value, _) = src.load_gas_quantity(1, q).unwrap();
            assert_eq!(value.shape, vec![2, 50, 50]);
            assert_eq!(value.plane(0).unwrap().len(), 2500);
        }
    }

    #[test]
    fn test_missing_stellar_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let src = source(dir.path());
        assert!(src.load_stellar_quantity(1, "stellar-velocity").is_err());
    }

    #[test]
    fn test_image_planes() {
        let img = Image::new(vec![2, 2, 3], (0..12).map(|v| v as f64).collect()).unwrap();
        assert_eq!(img.plane_len(), 6);
        assert_eq!(img.plane(1).unwrap(), &[6.0, 7.0, 8.0, 9.0, 10.0, 11.0]);
        assert!(img.plane(2).is_err());
        assert!(Image::new(vec![2, 2], vec![1.0]).is_err());
    }

    #[test]
    fn test_write_then_read_with_wcs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("3_A_Halpha_default_1-comp.fits");
        let value = Image::new(vec![2, 3, 4], (0..24).map(|v| v as f64 * 0.5).collect()).unwrap();
        let error = Image::new(vec![2, 3, 4], vec![0.1; 24]).unwrap();
        let header = WcsHeader {
            ctype1: Some("RA---TAN".into()),
            ctype2: Some("DEC--TAN".into()),
            crpix1: Some(2.5),
            crpix2: Some(2.0),
            crval1: Some(10.0),
            crval2: Some(-30.0),
            cdelt1: Some(-0.5 / 3600.0),
            cdelt2: Some(0.5 / 3600.0),
            ..Default::default()
        };
        write_images(&path, &[&value, &error], Some(&header)).unwrap();

        let mut src = source(dir.path());
        src.map_shape = [3, 4];
        let (v, e) = src.load_gas_quantity(3, "Halpha").unwrap();
        assert_eq!(v, value);
        assert_eq!(e, error);

        let wcs = src.read_wcs(3).unwrap();
        assert_eq!(wcs.crval, [10.0, -30.0]);
        assert_eq!(wcs.crpix, [2.5, 2.0]);
    }
}
