//! Extracted ion chromatograms from RT-ordered spectra.
//!
//! The accumulation in [`Extractor::accumulate_into`] runs once per
//! fragment per scan for every peptide of a run, so it takes pre-sliced
//! scans and writes into a caller provided buffer.

use crate::errors::DataProcessingError;
use crate::models::{
    Chromatogram,
    ExtractionParams,
    FragmentTrace,
    IonCounts,
    IonLadder,
    PeptideCoordinate,
    RtWindow,
    SpectraMap,
    Spectrum,
};
use std::ops::Range;
use std::sync::Arc;
use tracing::debug;

/// Result of extracting one coordinate.
#[derive(Debug, Clone)]
pub enum ExtractionOutcome {
    Extracted(Chromatogram),
    /// No fragment had any signal in the window. Not an error.
    AllZeroSignal,
}

#[derive(Debug, Clone, Default)]
pub struct Extractor {
    params: ExtractionParams,
}

impl Extractor {
    pub fn new(params: ExtractionParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ExtractionParams {
        &self.params
    }

    /// Index range of the scans inside `window`.
    ///
    /// Scans are RT ascending, so the walk stops at the first scan past the end.
    pub fn select_scans(window: &RtWindow, rts: &[f32]) -> Range<usize> {
        match window {
            RtWindow::Unbounded => 0..rts.len(),
            RtWindow::Bounded { start, .. } => {
                let first = rts.partition_point(|&rt| rt < *start);
                let mut last = first;
                for &rt in &rts[first..] {
                    if window.is_exhausted_by(rt) {
                        break;
                    }
                    last += 1;
                }
                first..last
            }
        }
    }

    /// Sums the signal around `mz` in every scan into `out`, one sample per scan.
    ///
    /// Returns whether any sample is non-zero.
    #[inline]
    pub fn accumulate_into(&self, mz: f64, scans: &[Spectrum], out: &mut Vec<f32>) -> bool {
        let (lo, hi) = self.params.mz_range(mz);
        out.clear();
        out.reserve(scans.len());
        let mut any_signal = false;
        for scan in scans {
            let v = scan.window_sum(lo, hi);
            any_signal |= v > 0.0;
            out.push(v);
        }
        any_signal
    }

    /// Extracts every fragment of `coord` from `ms2`, plus the precursor trace
    /// from `ms1` when given and enabled.
    #[cfg_attr(
        feature = "instrumentation",
        tracing::instrument(skip_all, fields(peptide = %coord.peptide_ref), level = "trace")
    )]
    pub fn extract(
        &self,
        coord: &PeptideCoordinate,
        ms2: &SpectraMap,
        ms1: Option<&SpectraMap>,
    ) -> Result<ExtractionOutcome, DataProcessingError> {
        let range = Self::select_scans(&coord.rt_window, ms2.rts());
        if range.is_empty() {
            return Ok(ExtractionOutcome::AllZeroSignal);
        }
        let rts: Arc<[f32]> = ms2.rts()[range.clone()].into();
        let scans = &ms2.spectra()[range];

        let mut buffer = Vec::with_capacity(scans.len());
        let mut traces = Vec::with_capacity(coord.fragments().len());
        for frag in coord.fragments() {
            if self.accumulate_into(frag.mz, scans, &mut buffer) {
                traces.push(FragmentTrace {
                    label: frag.label.clone(),
                    mz: frag.mz,
                    library_intensity: frag.intensity,
                    intensities: buffer.clone(),
                });
            }
        }

        // Precursor m/z in the fragment scans, kept even when empty.
        let mut self_trace = Vec::with_capacity(scans.len());
        self.accumulate_into(coord.precursor_mz, scans, &mut self_trace);

        if traces.is_empty() {
            return Ok(ExtractionOutcome::AllZeroSignal);
        }

        let top_fragment_trace = if traces[0].label == coord.fragments()[0].label {
            Some(traces[0].intensities.clone())
        } else {
            None
        };

        let mut chromatogram = Chromatogram::try_new(rts, traces, self_trace)?;

        if self.params.with_ion_counts {
            match coord.ion_ladder() {
                Ok(ladder) => {
                    let counts = self.ion_counts(&ladder, scans, top_fragment_trace.as_deref());
                    chromatogram = chromatogram.with_ion_counts(counts)?;
                }
                Err(e) => {
                    debug!(
                        "Skipping ion counts for {}: {:?}",
                        coord.peptide_ref, e
                    );
                }
            }
        }

        if self.params.with_ms1 {
            if let Some(ms1) = ms1 {
                let ms1_trace = self.extract_ms1(coord, ms1);
                match reconcile_to_axis(ms1_trace, chromatogram.len()) {
                    Ok(trace) => chromatogram = chromatogram.with_ms1_trace(trace)?,
                    Err(e) => debug!(
                        "Dropping MS1 trace of {}: {:?}",
                        coord.peptide_ref, e
                    ),
                }
            }
        }

        Ok(ExtractionOutcome::Extracted(chromatogram))
    }

    /// Precursor trace over the MS1 scans in the coordinate's window, on the MS1 axis.
    pub fn extract_ms1(&self, coord: &PeptideCoordinate, ms1: &SpectraMap) -> Vec<f32> {
        let range = Self::select_scans(&coord.rt_window, ms1.rts());
        let mut out = Vec::with_capacity(range.len());
        self.accumulate_into(coord.precursor_mz, &ms1.spectra()[range], &mut out);
        out
    }

    /// Counts, per scan, the ladder ions above the low and high fractions of
    /// the top library fragment's intensity in that scan.
    ///
    /// When the top fragment has no trace the reference is `f32::MAX`,
    /// which makes every count zero.
    pub fn ion_counts(
        &self,
        ladder: &IonLadder,
        scans: &[Spectrum],
        top_fragment_trace: Option<&[f32]>,
    ) -> IonCounts {
        let mut low = Vec::with_capacity(scans.len());
        let mut high = Vec::with_capacity(scans.len());
        for (i, scan) in scans.iter().enumerate() {
            let reference = match top_fragment_trace {
                Some(t) => t[i],
                None => f32::MAX,
            };
            let low_limit = reference * self.params.ions_low;
            let high_limit = reference * self.params.ions_high;
            let mut n_low = 0u16;
            let mut n_high = 0u16;
            for ion_mz in ladder.iter() {
                let (lo, hi) = self.params.mz_range(ion_mz);
                let inten = scan.window_sum(lo, hi);
                if inten <= 0.0 {
                    continue;
                }
                if inten > low_limit {
                    n_low += 1;
                }
                if inten > high_limit {
                    n_high += 1;
                }
            }
            low.push(n_low);
            high.push(n_high);
        }
        IonCounts {
            low,
            high,
            ladder_size: ladder.len().min(u16::MAX as usize) as u16,
        }
    }
}

/// Fits a trace built on an independent axis onto an axis of `len` samples.
///
/// The two axes may disagree by one scan at the window edge: a longer trace
/// loses its last sample, a shorter one gains a trailing zero. Larger
/// disagreements are rejected.
pub fn reconcile_to_axis(mut trace: Vec<f32>, len: usize) -> Result<Vec<f32>, DataProcessingError> {
    match trace.len() {
        l if l == len => Ok(trace),
        l if l == len + 1 => {
            trace.truncate(len);
            Ok(trace)
        }
        l if l + 1 == len => {
            trace.push(0.0);
            Ok(trace)
        }
        l => Err(DataProcessingError::AxisMismatch { ms1: l, ms2: len }),
    }
}
