use crate::io::dates::{date_from_filename, parse_metadata_date, DATE_METADATA_KEYS};
use crate::types::{BandImage, GeoTransform, RasterError, RasterResult};
use chrono::NaiveDateTime;
use gdal::raster::Buffer;
use gdal::{Dataset, DriverManager, Metadata};
use ndarray::{Array2, Array3, Axis};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Default output driver
pub const DEFAULT_DRIVER: &str = "GTiff";

/// Tolerance used when comparing geotransforms of a raster stack
const GEOTRANSFORM_TOLERANCE: f64 = 1e-9;

/// One output band: name (written as the band description), pixels and nodata
#[derive(Debug, Clone)]
pub struct OutputBand {
    pub name: String,
    pub data: BandImage,
    pub nodata: Option<f64>,
}

impl OutputBand {
    pub fn new(name: impl Into<String>, data: BandImage, nodata: Option<f64>) -> Self {
        Self {
            name: name.into(),
            data,
            nodata,
        }
    }
}

/// Raster image read from a file.
///
/// The pixels are not loaded on open: the handle records the properties
/// needed to compare rasters and decide what to read, and bands are read
/// on demand.
#[derive(Debug, Clone)]
pub struct Raster {
    path: PathBuf,
    width: usize,
    height: usize,
    band_count: usize,
    geotransform: GeoTransform,
    crs: String,
    nodata: Vec<Option<f64>>,
    acquired: Option<NaiveDateTime>,
    band_names: HashMap<String, usize>,
}

impl Raster {
    /// Open a raster and read its properties
    pub fn open<P: AsRef<Path>>(path: P) -> RasterResult<Self> {
        let path = path.as_ref();
        log::debug!("Opening raster {}", path.display());

        let dataset = open_dataset(path)?;
        let (width, height) = dataset.raster_size();
        let band_count = dataset.raster_count().max(0) as usize;

        // Missing georeferencing is not fatal, GDAL reports the identity transform
        let geotransform = dataset
            .geo_transform()
            .map(GeoTransform::from_gdal)
            .unwrap_or_default();

        let mut nodata = Vec::with_capacity(band_count);
        for idx in 1..=band_count {
            nodata.push(dataset.rasterband(idx as isize)?.no_data_value());
        }

        let acquired = DATE_METADATA_KEYS
            .iter()
            .filter_map(|key| dataset.metadata_item(key, ""))
            .find_map(|value| parse_metadata_date(&value))
            .or_else(|| date_from_filename(path));

        log::debug!(
            "{}: {}x{} pixels, {} band(s), acquired {:?}",
            path.display(),
            width,
            height,
            band_count,
            acquired
        );

        Ok(Self {
            path: path.to_path_buf(),
            width,
            height,
            band_count,
            geotransform,
            crs: dataset.projection(),
            nodata,
            acquired,
            band_names: HashMap::new(),
        })
    }

    /// Open a raster and name its bands in order (`names[0]` is band 1).
    ///
    /// Fails when more names than bands are given or a name repeats.
    pub fn with_band_names<P: AsRef<Path>>(path: P, names: &[&str]) -> RasterResult<Self> {
        let mut raster = Self::open(path)?;
        if names.len() > raster.band_count {
            return Err(RasterError::BandIndex {
                index: names.len(),
                band_count: raster.band_count,
            });
        }

        let mut band_names = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            let key = name.trim().to_lowercase();
            if key.is_empty() {
                return Err(RasterError::InvalidArgument(format!(
                    "empty name for band {}",
                    i + 1
                )));
            }
            if band_names.insert(key, i + 1).is_some() {
                return Err(RasterError::InvalidArgument(format!(
                    "band name '{}' given more than once",
                    name
                )));
            }
        }
        raster.band_names = band_names;
        Ok(raster)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// (height, width), matching the shape of the arrays returned by `read_band`
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn band_count(&self) -> usize {
        self.band_count
    }

    pub fn geotransform(&self) -> &GeoTransform {
        &self.geotransform
    }

    /// Coordinate reference system as WKT (empty if the file has none)
    pub fn crs(&self) -> &str {
        &self.crs
    }

    /// Map coordinates of the top-left corner
    pub fn topleft(&self) -> (f64, f64) {
        (self.geotransform.top_left_x, self.geotransform.top_left_y)
    }

    pub fn pixel_size(&self) -> (f64, f64) {
        (self.geotransform.pixel_width, self.geotransform.pixel_height)
    }

    /// Acquisition date from metadata or file name, if any was found
    pub fn acquired(&self) -> Option<NaiveDateTime> {
        self.acquired
    }

    /// 1-based index of a named band
    pub fn band_index(&self, name: &str) -> RasterResult<usize> {
        self.band_names
            .get(&name.to_lowercase())
            .copied()
            .ok_or_else(|| {
                RasterError::InvalidArgument(format!(
                    "no band named '{}' in {}",
                    name,
                    self.path.display()
                ))
            })
    }

    /// Nodata value of a band (1-based)
    pub fn nodata(&self, idx: usize) -> RasterResult<Option<f64>> {
        self.check_band(idx)?;
        Ok(self.nodata[idx - 1])
    }

    /// Fail with `BandIndex` unless `1 <= idx <= band_count`
    pub fn check_band(&self, idx: usize) -> RasterResult<()> {
        if idx == 0 || idx > self.band_count {
            return Err(RasterError::BandIndex {
                index: idx,
                band_count: self.band_count,
            });
        }
        Ok(())
    }

    /// True when both rasters cover the same grid (size and geotransform)
    pub fn same_extent(&self, other: &Raster) -> bool {
        self.width == other.width
            && self.height == other.height
            && self
                .geotransform
                .approx_eq(&other.geotransform, GEOTRANSFORM_TOLERANCE)
    }

    /// Read one band (1-based) as a `height x width` array
    pub fn read_band(&self, idx: usize) -> RasterResult<BandImage> {
        self.check_band(idx)?;
        let dataset = open_dataset(&self.path)?;
        read_band_from(&dataset, idx, self.width, self.height)
    }

    /// Read every band as a `bands x height x width` array
    pub fn read_all(&self) -> RasterResult<Array3<f64>> {
        let dataset = open_dataset(&self.path)?;
        let mut cube = Array3::<f64>::zeros((self.band_count, self.height, self.width));
        for idx in 1..=self.band_count {
            let band = read_band_from(&dataset, idx, self.width, self.height)?;
            cube.index_axis_mut(Axis(0), idx - 1).assign(&band);
        }
        Ok(cube)
    }

    /// Write `bands` to a new Float64 raster on the same grid as `self`.
    ///
    /// Geotransform and projection are copied from this raster. Every band
    /// must have this raster's shape.
    pub fn write_bands<P: AsRef<Path>>(
        &self,
        out_path: P,
        driver: &str,
        bands: &[OutputBand],
    ) -> RasterResult<()> {
        let out_path = out_path.as_ref();
        if bands.is_empty() {
            return Err(RasterError::EmptyInput(format!(
                "no band to write to {}",
                out_path.display()
            )));
        }
        for band in bands {
            if band.data.dim() != self.shape() {
                return Err(RasterError::ShapeMismatch(format!(
                    "band '{}' is {:?}, expected {:?}",
                    band.name,
                    band.data.dim(),
                    self.shape()
                )));
            }
        }

        log::info!(
            "Writing {} band(s) to {} ({})",
            bands.len(),
            out_path.display(),
            driver
        );

        let driver = DriverManager::get_driver_by_name(driver)?;
        let mut dataset = driver.create_with_band_type::<f64, _>(
            out_path,
            self.width as isize,
            self.height as isize,
            bands.len() as isize,
        )?;

        dataset.set_geo_transform(&self.geotransform.to_gdal())?;
        if !self.crs.is_empty() {
            dataset.set_projection(&self.crs)?;
        }

        for (i, band) in bands.iter().enumerate() {
            let mut rasterband = dataset.rasterband(i as isize + 1)?;
            let flat_data: Vec<f64> = band.data.iter().cloned().collect();
            let buffer = Buffer::new((self.width, self.height), flat_data);
            rasterband.write((0, 0), (self.width, self.height), &buffer)?;
            rasterband.set_description(&band.name)?;
            if let Some(nodata) = band.nodata {
                rasterband.set_no_data_value(Some(nodata))?;
            }
        }

        Ok(())
    }

    /// Write `bands` to `out_path`, or over this raster's own file when `None`.
    ///
    /// Overwriting goes through a temporary file in the same directory that
    /// replaces the original only once it is complete.
    pub fn write_bands_or_overwrite(
        &self,
        out_path: Option<&Path>,
        driver: &str,
        bands: &[OutputBand],
    ) -> RasterResult<PathBuf> {
        match out_path {
            Some(path) => {
                self.write_bands(path, driver, bands)?;
                Ok(path.to_path_buf())
            }
            None => {
                replace_file(&self.path, |tmp| self.write_bands(tmp, driver, bands))?;
                Ok(self.path.clone())
            }
        }
    }
}

/// Produce `target` through `produce`, which writes to a temporary path in the
/// same directory; the temporary file is moved over `target` on success.
pub fn replace_file<F>(target: &Path, produce: F) -> RasterResult<()>
where
    F: FnOnce(&Path) -> RasterResult<()>,
{
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let extension = target
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    let tmp = tempfile::Builder::new()
        .prefix(".ymraster-")
        .suffix(&extension)
        .tempfile_in(&dir)?;
    let tmp_path = tmp.into_temp_path();

    // Writers create the file themselves; drop the empty placeholder first
    std::fs::remove_file(&tmp_path)?;
    produce(&tmp_path)?;

    tmp_path
        .persist(target)
        .map_err(|e| RasterError::Io(e.error))?;
    log::debug!("Replaced {}", target.display());
    Ok(())
}

fn open_dataset(path: &Path) -> RasterResult<Dataset> {
    Dataset::open(path).map_err(|e| RasterError::FileOpen {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn read_band_from(
    dataset: &Dataset,
    idx: usize,
    width: usize,
    height: usize,
) -> RasterResult<BandImage> {
    let rasterband = dataset.rasterband(idx as isize)?;
    let band_data = rasterband.read_as::<f64>((0, 0), (width, height), (width, height), None)?;
    Array2::from_shape_vec((height, width), band_data.data).map_err(|e| {
        RasterError::ShapeMismatch(format!("failed to reshape band {}: {}", idx, e))
    })
}
