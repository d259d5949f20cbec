//! Per stage timing of the peptide processing.
//!
//! Timings are summed across the parallel workers, so on a multi core run
//! they add up to more than the wall clock time.

use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Default, Clone, Copy)]
pub struct ScoreTimings {
    /// Building the chromatogram from the block spectra.
    pub extraction: Duration,
    /// Smoothing and SNR estimation of every trace.
    pub conditioning: Duration,
    /// Peak picking plus consensus grouping.
    pub feature_finding: Duration,
    pub scoring: Duration,
}

impl Serialize for ScoreTimings {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("ScoreTimings", 4)?;
        state.serialize_field("extraction_ms", &self.extraction.as_millis())?;
        state.serialize_field("conditioning_ms", &self.conditioning.as_millis())?;
        state.serialize_field("feature_finding_ms", &self.feature_finding.as_millis())?;
        state.serialize_field("scoring_ms", &self.scoring.as_millis())?;
        state.end()
    }
}

impl std::ops::AddAssign for ScoreTimings {
    fn add_assign(&mut self, rhs: Self) {
        self.extraction += rhs.extraction;
        self.conditioning += rhs.conditioning;
        self.feature_finding += rhs.feature_finding;
        self.scoring += rhs.scoring;
    }
}
