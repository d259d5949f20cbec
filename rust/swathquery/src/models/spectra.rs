use crate::errors::DataProcessingError;
use serde::{
    Deserialize,
    Serialize,
};

/// A centroided scan, m/z sorted ascending.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Spectrum {
    mz: Vec<f64>,
    intensity: Vec<f32>,
}

impl Spectrum {
    pub fn try_new(mz: Vec<f64>, intensity: Vec<f32>) -> Result<Self, DataProcessingError> {
        if mz.len() != intensity.len() {
            return Err(DataProcessingError::ExpectedVectorLength {
                real: intensity.len(),
                expected: mz.len(),
            });
        }
        if let Some(i) = mz.windows(2).position(|w| w[0] > w[1]) {
            return Err(DataProcessingError::ExpectedSortedMz { index: i + 1 });
        }
        Ok(Self { mz, intensity })
    }

    /// Builds a spectrum from pairs in any order.
    pub fn from_unsorted_pairs(mut pairs: Vec<(f64, f32)>) -> Self {
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (mz, intensity) = pairs.into_iter().unzip();
        Self { mz, intensity }
    }

    pub fn mz(&self) -> &[f64] {
        &self.mz
    }

    pub fn intensity(&self) -> &[f32] {
        &self.intensity
    }

    pub fn len(&self) -> usize {
        self.mz.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mz.is_empty()
    }

    /// Sum of the intensities with m/z in `[lo, hi]`.
    ///
    /// Accumulates in f64 so the result does not depend on the order of
    /// equal-m/z points.
    #[inline]
    pub fn window_sum(&self, lo: f64, hi: f64) -> f32 {
        let start = self.mz.partition_point(|&x| x < lo);
        let mut acc = 0.0f64;
        for (&mz, &inten) in self.mz[start..].iter().zip(self.intensity[start..].iter()) {
            if mz > hi {
                break;
            }
            acc += inten as f64;
        }
        acc as f32
    }

    /// Intensity weighted mean m/z and summed intensity in `[lo, hi]`.
    pub fn window_centroid(&self, lo: f64, hi: f64) -> Option<(f64, f32)> {
        let start = self.mz.partition_point(|&x| x < lo);
        let mut weighted = 0.0f64;
        let mut total = 0.0f64;
        for (&mz, &inten) in self.mz[start..].iter().zip(self.intensity[start..].iter()) {
            if mz > hi {
                break;
            }
            weighted += mz * inten as f64;
            total += inten as f64;
        }
        if total > 0.0 {
            Some((weighted / total, total as f32))
        } else {
            None
        }
    }
}

/// Retention time ordered scans of one block (one MS level, one isolation window).
///
/// RTs are in seconds and strictly ascending.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SpectraMap {
    rts: Vec<f32>,
    spectra: Vec<Spectrum>,
}

impl SpectraMap {
    pub fn try_new(rts: Vec<f32>, spectra: Vec<Spectrum>) -> Result<Self, DataProcessingError> {
        if rts.len() != spectra.len() {
            return Err(DataProcessingError::ExpectedVectorLength {
                real: spectra.len(),
                expected: rts.len(),
            });
        }
        if let Some(i) = rts.windows(2).position(|w| w[0] >= w[1]) {
            return Err(DataProcessingError::ExpectedAscendingRt { index: i + 1 });
        }
        Ok(Self { rts, spectra })
    }

    /// Sorts by RT; the later of two scans sharing an RT is dropped.
    pub fn from_unsorted(mut scans: Vec<(f32, Spectrum)>) -> Self {
        scans.sort_by(|a, b| a.0.total_cmp(&b.0));
        scans.dedup_by(|later, earlier| later.0 == earlier.0);
        let (rts, spectra) = scans.into_iter().unzip();
        Self { rts, spectra }
    }

    pub fn rts(&self) -> &[f32] {
        &self.rts
    }

    pub fn spectra(&self) -> &[Spectrum] {
        &self.spectra
    }

    pub fn len(&self) -> usize {
        self.rts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (f32, &Spectrum)> {
        self.rts.iter().copied().zip(self.spectra.iter())
    }

    /// The scan recorded at exactly `rt`.
    pub fn get_at_rt(&self, rt: f32) -> Option<&Spectrum> {
        self.rts
            .binary_search_by(|x| x.total_cmp(&rt))
            .ok()
            .map(|i| &self.spectra[i])
    }

    /// Scans with RT in `[start, end]`, split out of the full block.
    pub fn sub_range(&self, start: f32, end: f32) -> SpectraMap {
        let lo = self.rts.partition_point(|&x| x < start);
        let hi = self.rts.partition_point(|&x| x <= end);
        if lo >= hi {
            return SpectraMap::default();
        }
        SpectraMap {
            rts: self.rts[lo..hi].to_vec(),
            spectra: self.spectra[lo..hi].to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_sum_bounds_are_inclusive() {
        let spec = Spectrum::try_new(vec![99.0, 100.0, 100.5, 101.0, 102.0], vec![1.0, 2.0, 3.0, 4.0, 5.0])
            .unwrap();
        assert_eq!(spec.window_sum(100.0, 101.0), 9.0);
        assert_eq!(spec.window_sum(200.0, 300.0), 0.0);
        assert_eq!(spec.window_sum(0.0, 98.0), 0.0);
    }

    #[test]
    fn test_unsorted_spectrum_is_rejected() {
        let res = Spectrum::try_new(vec![2.0, 1.0], vec![1.0, 1.0]);
        assert!(res.is_err());
        let res = Spectrum::try_new(vec![1.0, 2.0], vec![1.0]);
        assert!(res.is_err());
    }

    #[test]
    fn test_centroid() {
        let spec = Spectrum::from_unsorted_pairs(vec![(100.002, 1.0), (99.998, 1.0), (150.0, 10.0)]);
        let (mz, int) = spec.window_centroid(99.99, 100.01).unwrap();
        assert!((mz - 100.0).abs() < 1e-9);
        assert_eq!(int, 2.0);
        assert!(spec.window_centroid(120.0, 121.0).is_none());
    }

    #[test]
    fn test_spectra_map_rt_ordering() {
        let err = SpectraMap::try_new(vec![1.0, 1.0], vec![Spectrum::default(), Spectrum::default()]);
        assert!(matches!(err, Err(DataProcessingError::ExpectedAscendingRt { index: 1 })));

        let map = SpectraMap::from_unsorted(vec![
            (3.0, Spectrum::default()),
            (1.0, Spectrum::default()),
            (2.0, Spectrum::default()),
        ]);
        assert_eq!(map.rts(), &[1.0, 2.0, 3.0]);
        assert_eq!(map.sub_range(1.5, 3.0).rts(), &[2.0, 3.0]);
        assert!(map.sub_range(5.0, 6.0).is_empty());
        assert!(map.get_at_rt(2.0).is_some());
        assert!(map.get_at_rt(2.5).is_none());
    }
}
