//! Run analysis driver.
//!
//! MS2 blocks are processed one at a time, with the run's MS1 map kept for
//! the whole run. Inside a block every peptide goes through extraction,
//! conditioning, feature finding and scoring on the rayon pool, each worker
//! reusing its own scratch buffers. Once every block is done the weights are
//! learned over all peptides, features are rescored and the FDR engine ranks
//! the top feature of each peptide.

use super::accumulator::{
    BlockAccumulator,
    PeptideOutcome,
    SkipCounts,
    SkippingReason,
};
use super::irt::IrtResult;
use super::results::{
    PeptideResult,
    ResultRecord,
};
use crate::errors::Result;
use crate::fdr::{
    FdrEngine,
    FdrEntry,
    FdrParams,
    FdrReport,
    FdrSummary,
};
use crate::ml::{
    LearningParams,
    PeptideScores,
    SemiSupervisedLearner,
};
use crate::peaks::{
    pick_chromatogram,
    pick_max_peak,
    FeatureFinder,
    IonPeak,
    PeakParams,
};
use crate::rt_calibration::Calibration;
use crate::scoring::{
    FeatureScorer,
    ScoreTimings,
    ScoreType,
    ScoringContext,
    WeightVector,
};
use crate::signal::{
    ConditionedTrace,
    SignalConditioner,
    SignalParams,
};
use crate::traits::{
    CoordinateProvider,
    ResultSink,
    RunStatus,
    TaskSink,
};
#[cfg(not(feature = "serial_scoring"))]
use rayon::prelude::*;
use serde::{
    Deserialize,
    Serialize,
};
use std::time::Instant;
use swathquery::{
    BlockIndex,
    ExtractionOutcome,
    ExtractionParams,
    Extractor,
    PeptideCoordinate,
    RtWindow,
    SpectraMap,
    SpectraProvider,
};
use tracing::{
    debug,
    error,
    info,
    warn,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisParams {
    pub extraction: ExtractionParams,
    pub signal: SignalParams,
    pub peaks: PeakParams,
    pub learning: LearningParams,
    pub fdr: FdrParams,
    pub calibration: Calibration,
}

/// Per worker buffers reused across peptides.
#[derive(Debug, Default)]
pub struct PeptideScratch {
    snr: Vec<f32>,
}

#[derive(Debug, Default)]
pub struct BlockOutput {
    pub results: Vec<PeptideResult>,
    pub skipped: SkipCounts,
    pub timings: ScoreTimings,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub blocks_processed: usize,
    pub peptides_scored: usize,
    pub skipped: SkipCounts,
    pub timings: ScoreTimings,
    pub weights: WeightVector,
    pub summary: FdrSummary,
    /// Present when the calibration was fit from the run.
    pub calibration: Option<IrtResult>,
}

#[derive(Debug, Clone)]
pub struct RunAnalyzer {
    params: AnalysisParams,
    extractor: Extractor,
    conditioner: SignalConditioner,
    finder: FeatureFinder,
    scorer: FeatureScorer,
}

impl RunAnalyzer {
    pub fn new(params: AnalysisParams) -> Self {
        Self {
            extractor: Extractor::new(params.extraction.clone()),
            conditioner: SignalConditioner::new(params.signal),
            finder: FeatureFinder::new(&params.peaks),
            scorer: FeatureScorer::new(params.extraction.clone()),
            params,
        }
    }

    pub fn params(&self) -> &AnalysisParams {
        &self.params
    }

    pub fn with_calibration(&self, calibration: Calibration) -> Self {
        let mut params = self.params.clone();
        params.calibration = calibration;
        Self::new(params)
    }

    #[cfg_attr(
        feature = "instrumentation",
        tracing::instrument(skip_all, fields(peptide = %coord.peptide_ref), level = "trace")
    )]
    pub fn process_peptide(
        &self,
        coord: &PeptideCoordinate,
        ms2: &SpectraMap,
        ms1: Option<&SpectraMap>,
        scratch: &mut PeptideScratch,
    ) -> (PeptideOutcome, ScoreTimings) {
        let mut timings = ScoreTimings::default();

        let st = Instant::now();
        let chrom = match self.extractor.extract(coord, ms2, ms1) {
            Ok(ExtractionOutcome::Extracted(c)) => c,
            Ok(ExtractionOutcome::AllZeroSignal) => {
                return (PeptideOutcome::Skipped(SkippingReason::AllZeroSignal), timings);
            }
            Err(e) => return (PeptideOutcome::Failed(e.into()), timings),
        };
        timings.extraction = st.elapsed();

        let st = Instant::now();
        let rts = chrom.rts();
        let conditioned: Vec<ConditionedTrace> = chrom
            .traces()
            .iter()
            .map(|t| self.conditioner.condition(rts, &t.intensities, &mut scratch.snr))
            .collect();
        timings.conditioning = st.elapsed();

        let st = Instant::now();
        let peaks = &self.params.peaks;
        let ion_peaks: Vec<Vec<IonPeak>> = chrom
            .traces()
            .iter()
            .zip(conditioned.iter())
            .map(
                |(t, c)| match pick_max_peak(rts, &c.smoothed, &c.fine_snr, peaks) {
                    Some(max) => pick_chromatogram(
                        rts,
                        &t.intensities,
                        &c.smoothed,
                        &c.wide_snr,
                        peaks.min_snr,
                        Some(&max),
                    ),
                    None => Vec::new(),
                },
            )
            .collect();
        let mut groups = self.finder.find(&chrom, &ion_peaks);
        timings.feature_finding = st.elapsed();
        if groups.is_empty() {
            return (
                PeptideOutcome::Skipped(SkippingReason::NoSupportedFeature),
                timings,
            );
        }

        let st = Instant::now();
        let wide_snr: Vec<Vec<f32>> = conditioned.into_iter().map(|c| c.wide_snr).collect();
        let ladder = coord.ion_ladder().ok();
        let ctx = ScoringContext {
            coordinate: coord,
            chromatogram: &chrom,
            wide_snr: &wide_snr,
            ladder: ladder.as_ref(),
            calibration: &self.params.calibration,
        };
        for group in groups.iter_mut() {
            match self.scorer.score(&ctx, group, ms2.get_at_rt(group.apex_rt)) {
                Ok(scores) => group.scores = scores,
                Err(e) => return (PeptideOutcome::Failed(e), timings),
            }
        }
        timings.scoring = st.elapsed();

        (
            PeptideOutcome::Scored(PeptideResult::new(coord, groups)),
            timings,
        )
    }

    /// Processes every coordinate against one MS2 block.
    ///
    /// Results are sorted by peptide, targets first. The first peptide level
    /// failure is returned as the block's error.
    pub fn process_block(
        &self,
        coords: &[PeptideCoordinate],
        ms2: &SpectraMap,
        ms1: Option<&SpectraMap>,
    ) -> Result<BlockOutput> {
        let st = Instant::now();

        #[cfg(not(feature = "serial_scoring"))]
        let acc: BlockAccumulator = coords
            .par_iter()
            .map_init(PeptideScratch::default, |scratch, coord| {
                self.process_peptide(coord, ms2, ms1, scratch)
            })
            .collect();

        #[cfg(feature = "serial_scoring")]
        let acc: BlockAccumulator = {
            let mut scratch = PeptideScratch::default();
            coords
                .iter()
                .map(|coord| self.process_peptide(coord, ms2, ms1, &mut scratch))
                .collect()
        };

        let BlockAccumulator {
            mut results,
            skipped,
            mut failures,
            timings,
        } = acc;
        if !failures.is_empty() {
            error!("{} peptides failed in block", failures.len());
            return Err(failures.swap_remove(0));
        }
        results.sort_by(|a, b| {
            a.peptide_ref
                .cmp(&b.peptide_ref)
                .then(a.is_decoy.cmp(&b.is_decoy))
        });

        info!(
            "Scored {} of {} peptides in {:?} ({} without signal, {} without features)",
            results.len(),
            coords.len(),
            st.elapsed(),
            skipped.all_zero_signal,
            skipped.no_supported_feature
        );
        debug!("{:?}", timings);
        Ok(BlockOutput {
            results,
            skipped,
            timings,
        })
    }

    /// Reads only the RT span the coordinates need when all are bounded.
    fn read_block<P: SpectraProvider + ?Sized>(
        provider: &P,
        block: &BlockIndex,
        coords: &[PeptideCoordinate],
    ) -> Result<SpectraMap> {
        let mut span: Option<(f32, f32)> = None;
        for c in coords {
            match c.rt_window {
                RtWindow::Unbounded => return Ok(provider.read_block(block)?),
                RtWindow::Bounded { start, end } => {
                    span = Some(match span {
                        Some((lo, hi)) => (lo.min(start), hi.max(end)),
                        None => (start, end),
                    });
                }
            }
        }
        match span {
            Some((lo, hi)) => Ok(provider.read_block_rt_range(block, lo, hi)?),
            None => Ok(provider.read_block(block)?),
        }
    }

    /// Learns the dataset weights, rescores every feature with them and
    /// runs the FDR engine over each peptide's top feature.
    pub fn finalize(
        &self,
        run_id: &str,
        results: &mut [PeptideResult],
    ) -> Result<(WeightVector, FdrReport<ResultRecord>)> {
        let data: Vec<PeptideScores> = results.iter().map(|r| r.peptide_scores()).collect();
        let weights = SemiSupervisedLearner::new(self.params.learning).learn(&data)?;

        let scorer = self.scorer.clone().with_weights(weights);
        for r in results.iter_mut() {
            for f in r.features.iter_mut() {
                scorer.rescore(&mut f.scores);
            }
        }

        let entries: Vec<FdrEntry<ResultRecord>> = results
            .iter()
            .filter_map(|r| {
                let top = r.top_feature()?;
                Some(FdrEntry::new(
                    top.scores[ScoreType::WeightedTotalScore],
                    r.is_decoy,
                    ResultRecord::new(run_id, r, top),
                ))
            })
            .collect();
        let mut report = FdrEngine::new(self.params.fdr).evaluate(entries);
        report.entries.iter_mut().for_each(ResultRecord::fill_from);
        Ok((weights, report))
    }

    /// Analyses a whole run, reporting the outcome to `tasks`.
    pub fn run<P, C, S, T>(
        &self,
        provider: &P,
        library: &C,
        sink: &mut S,
        tasks: &T,
    ) -> Result<RunReport>
    where
        P: SpectraProvider + ?Sized,
        C: CoordinateProvider + ?Sized,
        S: ResultSink + ?Sized,
        T: TaskSink + ?Sized,
    {
        let out = self.run_inner(provider, library, sink, tasks);
        match &out {
            Ok(_) => tasks.finish(&RunStatus::Completed),
            Err(e) => tasks.finish(&RunStatus::Failed {
                cause: e.to_string(),
            }),
        }
        out
    }

    fn run_inner<P, C, S, T>(
        &self,
        provider: &P,
        library: &C,
        sink: &mut S,
        tasks: &T,
    ) -> Result<RunReport>
    where
        P: SpectraProvider + ?Sized,
        C: CoordinateProvider + ?Sized,
        S: ResultSink + ?Sized,
        T: TaskSink + ?Sized,
    {
        tasks.log(&format!("Analysing run {}", provider.run_id()));
        let Calibration::FromRun(irt) = &self.params.calibration else {
            return self.analyze_blocks(provider, library, sink, tasks);
        };

        let calibration = self.calibrate(provider, library, irt)?;
        tasks.log(&format!(
            "Calibrated RT from {} iRT anchors: slope {:.4}, intercept {:.2}",
            calibration.selected.len(),
            calibration.slope_intercept.slope,
            calibration.slope_intercept.intercept
        ));
        sink.write_calibration(&calibration)?;
        let calibrated =
            self.with_calibration(Calibration::SlopeIntercept(calibration.slope_intercept));
        let mut report = calibrated.analyze_blocks(provider, library, sink, tasks)?;
        report.calibration = Some(calibration);
        Ok(report)
    }

    fn analyze_blocks<P, C, S, T>(
        &self,
        provider: &P,
        library: &C,
        sink: &mut S,
        tasks: &T,
    ) -> Result<RunReport>
    where
        P: SpectraProvider + ?Sized,
        C: CoordinateProvider + ?Sized,
        S: ResultSink + ?Sized,
        T: TaskSink + ?Sized,
    {
        let run_id = provider.run_id().to_string();

        let ms1 = if self.params.extraction.with_ms1 {
            let index = provider.ms1_index()?;
            Some(provider.read_block(index)?)
        } else {
            None
        };

        let blocks = provider.ms2_indices();
        let mut results = Vec::new();
        let mut skipped = SkipCounts::default();
        let mut timings = ScoreTimings::default();
        let mut blocks_processed = 0;
        for (i, block) in blocks.iter().enumerate() {
            let Some(window) = block.window else {
                warn!("Skipping MS2 block {} without an isolation window", i);
                tasks.progress(i + 1, blocks.len());
                continue;
            };
            let coords = library.coordinates(
                window,
                &self.params.calibration,
                &self.params.extraction.rt,
            );
            if coords.is_empty() {
                debug!("No library entries in window {:?}", window);
                tasks.progress(i + 1, blocks.len());
                continue;
            }

            let ms2 = Self::read_block(provider, block, &coords)?;
            let out = self.process_block(&coords, &ms2, ms1.as_ref())?;
            sink.write_block(block, &out.results)?;

            skipped += out.skipped;
            timings += out.timings;
            results.extend(out.results);
            blocks_processed += 1;
            tasks.progress(i + 1, blocks.len());
        }

        let peptides_scored = results.len();
        tasks.log(&format!(
            "Scored {} peptides over {} blocks, {} skipped",
            peptides_scored,
            blocks_processed,
            skipped.total()
        ));
        info!("{:?}", timings);

        let (weights, report) = self.finalize(&run_id, &mut results)?;
        sink.write_weights(&weights)?;
        sink.write_fdr(&report)?;
        tasks.log(&format!(
            "{} targets identified at {} FDR",
            report.summary.identified_targets, report.summary.fdr_cutoff
        ));

        Ok(RunReport {
            run_id,
            blocks_processed,
            peptides_scored,
            skipped,
            timings,
            weights,
            summary: report.summary,
            calibration: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swathquery::Spectrum;

    fn gaussian_map(center: f32, height: f32, mzs: &[f64]) -> SpectraMap {
        let scans = (0..200)
            .map(|i| {
                let rt = i as f32;
                let y = height * (-((rt - center).powi(2)) / (2.0 * 16.0)).exp();
                let pairs = mzs.iter().map(|&mz| (mz, y + 1.0)).collect();
                (rt, Spectrum::from_unsorted_pairs(pairs))
            })
            .collect();
        SpectraMap::from_unsorted(scans)
    }

    #[test]
    fn test_peptide_without_signal_is_skipped() {
        let analyzer = RunAnalyzer::new(AnalysisParams::default());
        let coord = PeptideCoordinate::sample();
        let ms2 = gaussian_map(100.0, 1000.0, &[150.0]);
        let (outcome, _) = analyzer.process_peptide(&coord, &ms2, None, &mut PeptideScratch::default());
        assert!(matches!(
            outcome,
            PeptideOutcome::Skipped(SkippingReason::AllZeroSignal)
        ));
    }

    #[test]
    fn test_peptide_with_coeluting_fragments_is_scored() {
        let analyzer = RunAnalyzer::new(AnalysisParams::default());
        let coord = PeptideCoordinate::sample();
        let mzs: Vec<f64> = coord.fragments().iter().map(|f| f.mz).collect();
        let ms2 = gaussian_map(100.0, 1000.0, &mzs);
        let (outcome, _) = analyzer.process_peptide(&coord, &ms2, None, &mut PeptideScratch::default());
        let PeptideOutcome::Scored(res) = outcome else {
            panic!("expected a scored peptide, got {:?}", outcome);
        };
        let top = &res.features[0];
        assert!((top.apex_rt - 100.0).abs() <= 2.0);
        assert!(top.left_rt <= top.apex_rt && top.apex_rt <= top.right_rt);
        assert!(top.scores[ScoreType::XcorrShape] > 0.9);
    }
}
