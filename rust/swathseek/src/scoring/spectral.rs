//! Scores read off the MS2 spectrum at the feature apex.

use crate::errors::Result;
use crate::utils::correlation::pearson;
use swathquery::models::ion_ladder::{
    averagine_isotopes,
    ISOTOPE_SPACING,
    MASS_PROTON,
};
use swathquery::{
    ExtractionParams,
    IonLadder,
    Spectrum,
};

const NUM_ISOTOPES: usize = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IsotopeScores {
    pub correlation: f64,
    pub overlap: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MassdevScores {
    pub mean: f64,
    pub weighted: f64,
}

/// Isotope envelope agreement of every fragment, fragments taken as singly
/// charged.
pub fn isotope_scores(
    spectrum: &Spectrum,
    fragment_mzs: &[f64],
    weights: &[f64],
    params: &ExtractionParams,
) -> Result<IsotopeScores> {
    let mut out = IsotopeScores::default();
    let mut observed = [0.0f64; NUM_ISOTOPES];
    for (&mz, &w) in fragment_mzs.iter().zip(weights.iter()) {
        for (k, obs) in observed.iter_mut().enumerate() {
            let (lo, hi) = params.mz_range(mz + k as f64 * ISOTOPE_SPACING);
            *obs = spectrum.window_sum(lo, hi) as f64;
        }
        let mono = observed[0];

        let theoretical = averagine_isotopes(mz - MASS_PROTON, NUM_ISOTOPES);
        let corr = pearson(&observed, &theoretical)?;
        if corr.is_finite() {
            out.correlation += w * corr;
        }

        let (lo, hi) = params.mz_range(mz - ISOTOPE_SPACING);
        let preceding = spectrum.window_sum(lo, hi) as f64;
        if preceding > mono {
            out.overlap += w;
        }
    }
    Ok(out)
}

/// Absolute ppm error of the fragment centroids found in the spectrum.
///
/// Fragments without signal are skipped; with none found both scores are 0.
pub fn massdev_scores(
    spectrum: &Spectrum,
    fragment_mzs: &[f64],
    weights: &[f64],
    params: &ExtractionParams,
) -> MassdevScores {
    let mut total = 0.0;
    let mut weighted = 0.0;
    let mut found = 0usize;
    for (&mz, &w) in fragment_mzs.iter().zip(weights.iter()) {
        let (lo, hi) = params.mz_range(mz);
        if let Some((centroid, _)) = spectrum.window_centroid(lo, hi) {
            let ppm = ((centroid - mz) / mz * 1e6).abs();
            total += ppm;
            weighted += ppm * w;
            found += 1;
        }
    }
    if found == 0 {
        return MassdevScores::default();
    }
    MassdevScores {
        mean: total / found as f64,
        weighted,
    }
}

/// Number of singly charged (b, y) ladder ions with signal in the spectrum.
pub fn series_counts(spectrum: &Spectrum, ladder: &IonLadder, params: &ExtractionParams) -> (usize, usize) {
    let count = |ions: &[f64]| {
        ions.iter()
            .filter(|&&mz| {
                let (lo, hi) = params.mz_range(mz);
                spectrum.window_sum(lo, hi) > 0.0
            })
            .count()
    };
    (count(ladder.b_singly()), count(ladder.y_singly()))
}
