use super::library::library_scores;
use super::score_types::{
    ScoreType,
    ScoreVector,
    WeightVector,
};
use super::spectral::{
    isotope_scores,
    massdev_scores,
    series_counts,
};
use super::xcorr::xcorr_scores;
use crate::errors::Result;
use crate::peaks::PeakGroup;
use crate::rt_calibration::RtCalibration;
use swathquery::{
    Chromatogram,
    ExtractionParams,
    IonLadder,
    PeptideCoordinate,
    Spectrum,
};

/// Everything about one peptide the scores of its features depend on.
pub struct ScoringContext<'a> {
    pub coordinate: &'a PeptideCoordinate,
    pub chromatogram: &'a Chromatogram,
    /// Wide window SNR of each chromatogram trace.
    pub wide_snr: &'a [Vec<f32>],
    pub ladder: Option<&'a IonLadder>,
    pub calibration: &'a dyn RtCalibration,
}

/// Library intensities of the traces present in a chromatogram, scaled to sum to 1.
pub fn normalized_trace_weights(chromatogram: &Chromatogram) -> Vec<f64> {
    let raw: Vec<f64> = chromatogram
        .traces()
        .iter()
        .map(|t| t.library_intensity.max(0.0) as f64)
        .collect();
    let total: f64 = raw.iter().sum();
    if total <= 0.0 {
        let n = raw.len() as f64;
        return vec![1.0 / n; raw.len()];
    }
    raw.into_iter().map(|x| x / total).collect()
}

/// Computes the score vector of a feature.
///
/// Scoring only reads its inputs. `InitScore` uses the prior weights and
/// `WeightedTotalScore` the weights the scorer was built with.
#[derive(Debug, Clone)]
pub struct FeatureScorer {
    extraction: ExtractionParams,
    prior: WeightVector,
    weights: WeightVector,
}

impl FeatureScorer {
    pub fn new(extraction: ExtractionParams) -> Self {
        Self {
            extraction,
            prior: WeightVector::prior(),
            weights: WeightVector::prior(),
        }
    }

    pub fn with_weights(mut self, weights: WeightVector) -> Self {
        self.weights = weights;
        self
    }

    pub fn weights(&self) -> &WeightVector {
        &self.weights
    }

    #[cfg_attr(
        feature = "instrumentation",
        tracing::instrument(skip_all, level = "trace")
    )]
    pub fn score(
        &self,
        ctx: &ScoringContext<'_>,
        group: &PeakGroup,
        apex_spectrum: Option<&Spectrum>,
    ) -> Result<ScoreVector> {
        let mut v = ScoreVector::default();
        let chrom = ctx.chromatogram;
        let weights = normalized_trace_weights(chrom);
        let span = group.left_index..=group.right_index;

        let span_traces: Vec<Vec<f64>> = chrom
            .traces()
            .iter()
            .map(|t| t.intensities[span.clone()].iter().map(|&x| x as f64).collect())
            .collect();
        let xc = xcorr_scores(&span_traces, &weights)?;
        v[ScoreType::XcorrCoelution] = xc.coelution;
        v[ScoreType::XcorrCoelutionWeighted] = xc.coelution_weighted;
        v[ScoreType::XcorrShape] = xc.shape;
        v[ScoreType::XcorrShapeWeighted] = xc.shape_weighted;

        let observed: Vec<f64> = group.fragment_intensities.iter().map(|&x| x as f64).collect();
        let library: Vec<f64> = chrom
            .traces()
            .iter()
            .map(|t| t.library_intensity as f64)
            .collect();
        let lib = library_scores(&observed, &library)?;
        v[ScoreType::LibraryCorr] = lib.corr;
        v[ScoreType::LibraryRsmd] = lib.rsmd;
        v[ScoreType::LibraryManhattan] = lib.manhattan;
        v[ScoreType::LibraryDotprod] = lib.dotprod;
        v[ScoreType::LibrarySangle] = lib.sangle;
        v[ScoreType::LibraryRootmeansquare] = lib.rootmeansquare;

        v[ScoreType::LogSnScore] = log_sn(ctx.wide_snr, group.apex_index);
        v[ScoreType::NormRtScore] = norm_rt(ctx, group.apex_rt);

        let total_xic = chrom.total_intensity();
        v[ScoreType::IntensityScore] = if total_xic > 0.0 {
            group.total_intensity / total_xic
        } else {
            0.0
        };

        if let Some(spectrum) = apex_spectrum {
            let mzs: Vec<f64> = chrom.traces().iter().map(|t| t.mz).collect();
            let iso = isotope_scores(spectrum, &mzs, &weights, &self.extraction)?;
            v[ScoreType::IsotopeCorrelationScore] = iso.correlation;
            v[ScoreType::IsotopeOverlapScore] = iso.overlap;

            let md = massdev_scores(spectrum, &mzs, &weights, &self.extraction);
            v[ScoreType::MassdevScore] = md.mean;
            v[ScoreType::MassdevScoreWeighted] = md.weighted;

            if let Some(ladder) = ctx.ladder {
                let (b, y) = series_counts(spectrum, ladder, &self.extraction);
                v[ScoreType::BseriesScore] = b as f64;
                v[ScoreType::YseriesScore] = y as f64;
            }
        }

        if let Some(counts) = chrom.ion_counts() {
            if counts.ladder_size > 0 {
                let size = counts.ladder_size as f64;
                v[ScoreType::IonsDelta] = (size - group.ions_low as f64) / size;
            }
        }

        let mut v = v.sanitized();
        v[ScoreType::InitScore] = v.combine(&self.prior);
        v[ScoreType::WeightedTotalScore] = v.combine(&self.weights);
        Ok(v)
    }

    /// Recomputes `WeightedTotalScore` of an already scored feature with
    /// this scorer's weights.
    pub fn rescore(&self, scores: &mut ScoreVector) {
        scores[ScoreType::WeightedTotalScore] = 0.0;
        scores[ScoreType::WeightedTotalScore] = scores.combine(&self.weights);
    }
}

fn log_sn(wide_snr: &[Vec<f32>], apex: usize) -> f64 {
    if wide_snr.is_empty() {
        return 0.0;
    }
    let mean = wide_snr
        .iter()
        .map(|s| s.get(apex).copied().unwrap_or(0.0) as f64)
        .sum::<f64>()
        / wide_snr.len() as f64;
    if mean < 1.0 {
        0.0
    } else {
        mean.ln()
    }
}

fn norm_rt(ctx: &ScoringContext<'_>, apex_rt: f32) -> f64 {
    let lib_rt = ctx.coordinate.library_rt;
    let predicted = ctx.calibration.predict(lib_rt) as f64;
    let slope = ctx.calibration.local_slope(lib_rt) as f64;
    let slope = if slope.is_finite() && slope > 0.0 {
        slope
    } else {
        1.0
    };
    (predicted - apex_rt as f64).abs() / slope
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rt_calibration::Calibration;
    use std::sync::Arc;
    use swathquery::FragmentTrace;

    fn gaussian(rts: &[f32], center: f32, scale: f32) -> Vec<f32> {
        rts.iter()
            .map(|&rt| scale * (-((rt - center).powi(2)) / (2.0 * 9.0)).exp())
            .collect()
    }

    #[test]
    fn test_coeluting_library_match_scores_well() {
        let rts: Vec<f32> = (0..41).map(|i| 70.0 + i as f32 * 1.5).collect();
        let libs = [100.0f32, 60.0, 30.0];
        let traces = libs
            .iter()
            .enumerate()
            .map(|(i, &lib)| FragmentTrace {
                label: format!("y{}", 6 - i),
                mz: 700.0 - 100.0 * i as f64,
                library_intensity: lib,
                intensities: gaussian(&rts, 100.0, lib * 10.0),
            })
            .collect();
        let rts_arc: Arc<[f32]> = rts.clone().into();
        let chrom = Chromatogram::try_new(rts_arc, traces, vec![0.0; 41]).unwrap();
        let coord = PeptideCoordinate::sample();
        let snr = vec![vec![50.0f32; 41]; 3];
        let cal = Calibration::Identity;
        let ctx = ScoringContext {
            coordinate: &coord,
            chromatogram: &chrom,
            wide_snr: &snr,
            ladder: None,
            calibration: &cal,
        };
        let apex = 20;
        let fragment_intensities: Vec<f32> = chrom
            .traces()
            .iter()
            .map(|t| t.intensities[10..=30].iter().sum())
            .collect();
        let total = fragment_intensities.iter().map(|&x| x as f64).sum();
        let group = PeakGroup {
            left_rt: rts[10],
            right_rt: rts[30],
            apex_rt: rts[apex],
            left_index: 10,
            right_index: 30,
            apex_index: apex,
            fragment_intensities,
            total_intensity: total,
            supporting_fragments: 3,
            ions_low: 0,
            ions_high: 0,
            scores: ScoreVector::default(),
        };

        let v = FeatureScorer::new(ExtractionParams::default())
            .score(&ctx, &group, None)
            .unwrap();
        assert!((v[ScoreType::XcorrShape] - 1.0).abs() < 1e-6);
        assert_eq!(v[ScoreType::XcorrCoelution], 0.0);
        assert!(v[ScoreType::LibraryCorr] > 0.999);
        assert!(v[ScoreType::LibraryRsmd] < 1e-3);
        assert!((v[ScoreType::LogSnScore] - 50f64.ln()).abs() < 1e-6);
        assert!(v[ScoreType::NormRtScore] < 1e-6);
        assert!(v[ScoreType::IntensityScore] > 0.9 && v[ScoreType::IntensityScore] <= 1.0 + 1e-6);
        assert_eq!(v[ScoreType::InitScore], v[ScoreType::WeightedTotalScore]);
        assert!(v[ScoreType::InitScore] > 0.0);
    }
}
