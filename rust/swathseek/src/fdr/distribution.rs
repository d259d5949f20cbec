use serde::Serialize;

/// Target and decoy counts of one FDR band `(lower, upper]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FdrBand {
    pub lower: f64,
    pub upper: f64,
    pub targets: usize,
    pub decoys: usize,
}

/// Histogram of assigned FDR values.
///
/// Bands are 0.001 wide up to 0.01 and 0.1 wide above; the first wide band
/// is `(0.01, 0.1]`. FDR 0 falls in the first band and anything above 1 in
/// the last one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FdrDistribution {
    pub bands: Vec<FdrBand>,
}

impl Default for FdrDistribution {
    fn default() -> Self {
        let mut uppers: Vec<f64> = (1..=10).map(|i| i as f64 / 1000.0).collect();
        uppers.extend((1..=10).map(|i| i as f64 / 10.0));
        let mut lower = 0.0;
        let bands = uppers
            .into_iter()
            .map(|upper| {
                let band = FdrBand {
                    lower,
                    upper,
                    targets: 0,
                    decoys: 0,
                };
                lower = upper;
                band
            })
            .collect();
        Self { bands }
    }
}

impl FdrDistribution {
    pub fn band_index(&self, fdr: f64) -> usize {
        let i = self.bands.partition_point(|b| b.upper < fdr);
        i.min(self.bands.len() - 1)
    }

    pub fn add(&mut self, fdr: f64, is_decoy: bool) {
        let i = self.band_index(fdr);
        let band = &mut self.bands[i];
        if is_decoy {
            band.decoys += 1;
        } else {
            band.targets += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_edges() {
        let d = FdrDistribution::default();
        assert_eq!(d.bands.len(), 20);
        assert_eq!(d.band_index(0.0), 0);
        assert_eq!(d.band_index(0.001), 0);
        assert_eq!(d.band_index(0.0015), 1);
        assert_eq!(d.band_index(0.003), 2);
        assert_eq!(d.band_index(0.01), 9);
        assert_eq!(d.band_index(0.05), 10);
        assert_eq!(d.bands[10].lower, 0.01);
        assert_eq!(d.bands[10].upper, 0.1);
        assert_eq!(d.band_index(0.15), 11);
        assert_eq!(d.band_index(1.0), 19);
        assert_eq!(d.band_index(3.0), 19);
    }
}
