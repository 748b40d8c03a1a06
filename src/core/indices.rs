//! Normalized-difference spectral indices (NDVI, NDMI, NDSI)

use crate::io::raster::{OutputBand, Raster, DEFAULT_DRIVER};
use crate::types::{BandImage, RasterError, RasterResult, SpectralIndex};
use ndarray::{Array2, Zip};
use num_traits::Float;
use std::path::Path;

/// `(a - b) / (a + b)` for one pixel; a zero sum is replaced by 1 so the
/// result stays finite.
pub fn normalized_difference_value<T: Float>(a: T, b: T) -> T {
    let sum = a + b;
    let denominator = if sum == T::zero() { T::one() } else { sum };
    (a - b) / denominator
}

/// Pixel-wise normalized difference of two bands of the same shape
pub fn normalized_difference<T>(band_a: &Array2<T>, band_b: &Array2<T>) -> RasterResult<Array2<T>>
where
    T: Float + Send + Sync,
{
    if band_a.dim() != band_b.dim() {
        return Err(RasterError::ShapeMismatch(format!(
            "bands are {:?} and {:?}",
            band_a.dim(),
            band_b.dim()
        )));
    }

    let mut out = Array2::<T>::zeros(band_a.dim());
    let zip = Zip::from(&mut out).and(band_a).and(band_b);

    #[cfg(feature = "parallel")]
    zip.par_for_each(|o, &a, &b| *o = normalized_difference_value(a, b));
    #[cfg(not(feature = "parallel"))]
    zip.for_each(|o, &a, &b| *o = normalized_difference_value(a, b));

    Ok(out)
}

/// NDVI from red and near-infrared bands
pub fn ndvi(red: &BandImage, nir: &BandImage) -> RasterResult<BandImage> {
    normalized_difference(nir, red)
}

/// NDMI from near-infrared and mid-infrared bands
pub fn ndmi(nir: &BandImage, mir: &BandImage) -> RasterResult<BandImage> {
    normalized_difference(nir, mir)
}

/// NDSI from green and mid-infrared bands
pub fn ndsi(green: &BandImage, mir: &BandImage) -> RasterResult<BandImage> {
    normalized_difference(green, mir)
}

impl Raster {
    /// Compute `index` from bands `idx_pos` and `idx_neg` (1-based, positive
    /// and negative term of the difference) and write a single-band raster.
    pub fn spectral_index<P: AsRef<Path>>(
        &self,
        index: SpectralIndex,
        idx_pos: usize,
        idx_neg: usize,
        out_path: P,
    ) -> RasterResult<BandImage> {
        log::info!(
            "Computing {} of {} from bands {} and {}",
            index,
            self.path().display(),
            idx_pos,
            idx_neg
        );
        let positive = self.read_band(idx_pos)?;
        let negative = self.read_band(idx_neg)?;
        let values = normalized_difference(&positive, &negative)?;

        let band = OutputBand::new(index.to_string().to_lowercase(), values, None);
        self.write_bands(out_path, DEFAULT_DRIVER, std::slice::from_ref(&band))?;
        Ok(band.data)
    }

    /// Like `spectral_index`, resolving the bands through the band-name map
    pub fn named_spectral_index<P: AsRef<Path>>(
        &self,
        index: SpectralIndex,
        out_path: P,
    ) -> RasterResult<BandImage> {
        let (pos, neg) = index.band_names();
        self.spectral_index(index, self.band_index(pos)?, self.band_index(neg)?, out_path)
    }

    /// Write the NDVI of this raster given its red and near-infrared bands
    pub fn ndvi<P: AsRef<Path>>(
        &self,
        out_path: P,
        idx_red: usize,
        idx_nir: usize,
    ) -> RasterResult<BandImage> {
        self.spectral_index(SpectralIndex::Ndvi, idx_nir, idx_red, out_path)
    }
}
