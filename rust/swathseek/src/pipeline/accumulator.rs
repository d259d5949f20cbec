//! Collects per-peptide outcomes of a block, sequentially or from rayon.
//!
//! Each worker folds into its own accumulator and the partial accumulators
//! are merged pairwise, so no state is shared between threads.

use super::results::PeptideResult;
use crate::errors::SwathSeekError;
use crate::scoring::ScoreTimings;
use rayon::iter::{
    FromParallelIterator,
    IntoParallelIterator,
    ParallelIterator,
};
use serde::Serialize;

/// Why a peptide produced no result. Neither is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkippingReason {
    AllZeroSignal,
    NoSupportedFeature,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SkipCounts {
    pub all_zero_signal: usize,
    pub no_supported_feature: usize,
}

impl SkipCounts {
    pub fn add(&mut self, reason: SkippingReason) {
        match reason {
            SkippingReason::AllZeroSignal => self.all_zero_signal += 1,
            SkippingReason::NoSupportedFeature => self.no_supported_feature += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.all_zero_signal + self.no_supported_feature
    }
}

impl std::ops::AddAssign for SkipCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.all_zero_signal += rhs.all_zero_signal;
        self.no_supported_feature += rhs.no_supported_feature;
    }
}

#[derive(Debug)]
pub enum PeptideOutcome {
    Scored(PeptideResult),
    Skipped(SkippingReason),
    Failed(SwathSeekError),
}

#[derive(Debug, Default)]
pub struct BlockAccumulator {
    pub results: Vec<PeptideResult>,
    pub skipped: SkipCounts,
    /// Failures in arrival order. Any failure aborts the run.
    pub failures: Vec<SwathSeekError>,
    pub timings: ScoreTimings,
}

impl BlockAccumulator {
    pub fn reduce(mut self, other: Self) -> Self {
        self.results.extend(other.results);
        self.skipped += other.skipped;
        self.failures.extend(other.failures);
        self.timings += other.timings;
        self
    }

    pub fn fold(mut self, item: (PeptideOutcome, ScoreTimings)) -> Self {
        match item.0 {
            PeptideOutcome::Scored(res) => self.results.push(res),
            PeptideOutcome::Skipped(reason) => self.skipped.add(reason),
            PeptideOutcome::Failed(err) => self.failures.push(err),
        }
        self.timings += item.1;
        self
    }
}

impl FromIterator<(PeptideOutcome, ScoreTimings)> for BlockAccumulator {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = (PeptideOutcome, ScoreTimings)>,
    {
        iter.into_iter()
            .fold(BlockAccumulator::default(), BlockAccumulator::fold)
    }
}

impl FromParallelIterator<(PeptideOutcome, ScoreTimings)> for BlockAccumulator {
    fn from_par_iter<I>(par_iter: I) -> Self
    where
        I: IntoParallelIterator<Item = (PeptideOutcome, ScoreTimings)>,
    {
        par_iter
            .into_par_iter()
            .fold(BlockAccumulator::default, BlockAccumulator::fold)
            .reduce(BlockAccumulator::default, BlockAccumulator::reduce)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;
    use swathquery::PeptideCoordinate;

    fn outcome(i: usize) -> (PeptideOutcome, ScoreTimings) {
        let o = match i % 3 {
            0 => {
                let mut coord = PeptideCoordinate::sample();
                coord.peptide_ref = format!("P{}", i);
                PeptideOutcome::Scored(PeptideResult::new(&coord, Vec::new()))
            }
            1 => PeptideOutcome::Skipped(SkippingReason::AllZeroSignal),
            _ => PeptideOutcome::Skipped(SkippingReason::NoSupportedFeature),
        };
        (o, ScoreTimings::default())
    }

    #[test]
    fn test_parallel_and_serial_collect_agree() {
        let serial: BlockAccumulator = (0..300).map(outcome).collect();
        let parallel: BlockAccumulator = (0..300).into_par_iter().map(outcome).collect();

        assert_eq!(serial.skipped, parallel.skipped);
        assert_eq!(serial.skipped.all_zero_signal, 100);
        assert_eq!(serial.skipped.total(), 200);

        let mut a: Vec<String> = serial.results.into_iter().map(|r| r.peptide_ref).collect();
        let mut b: Vec<String> = parallel.results.into_iter().map(|r| r.peptide_ref).collect();
        a.sort();
        b.sort();
        assert_eq!(a.len(), 100);
        assert_eq!(a, b);
        assert!(parallel.failures.is_empty());
    }
}
