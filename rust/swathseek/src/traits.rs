//! Seams between the run analysis and its collaborators.
//!
//! The analysis pulls coordinates from a [`CoordinateProvider`], spectra from
//! a [`swathquery::SpectraProvider`] and pushes everything it produces into a
//! [`ResultSink`]. Progress and the final run status go to a [`TaskSink`].

use crate::errors::Result;
use crate::fdr::FdrReport;
use crate::pipeline::{
    IrtResult,
    PeptideResult,
    ResultRecord,
};
use crate::rt_calibration::RtCalibration;
use crate::scoring::WeightVector;
use serde::Serialize;
use swathquery::{
    BlockIndex,
    PeptideCoordinate,
    RtTolerance,
};
use tracing::{
    error,
    info,
};

/// Source of the peptides analysed in each isolation window.
pub trait CoordinateProvider: Sync {
    /// Targets with a precursor inside `window` plus their decoys, each with
    /// an RT window of `rt` around its calibrated library RT.
    fn coordinates(
        &self,
        window: (f64, f64),
        calibration: &dyn RtCalibration,
        rt: &RtTolerance,
    ) -> Vec<PeptideCoordinate>;
}

/// Receives every result a run produces.
///
/// Calls come in order: `write_calibration` once when the RT calibration is
/// fit from the run, one `write_block` per processed MS2 block, then
/// `write_weights` once, then `write_fdr` once.
pub trait ResultSink {
    fn write_calibration(&mut self, _calibration: &IrtResult) -> Result<()> {
        Ok(())
    }
    fn write_block(&mut self, block: &BlockIndex, results: &[PeptideResult]) -> Result<()>;
    fn write_weights(&mut self, weights: &WeightVector) -> Result<()>;
    fn write_fdr(&mut self, report: &FdrReport<ResultRecord>) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RunStatus {
    #[serde(rename = "completed")]
    Completed,
    /// The run stopped at its first fatal error.
    #[serde(rename = "failed")]
    Failed { cause: String },
}

pub trait TaskSink: Sync {
    fn log(&self, message: &str);

    /// `done` of `total` MS2 blocks are processed.
    fn progress(&self, _done: usize, _total: usize) {}

    fn finish(&self, status: &RunStatus);
}

/// Reports through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTaskSink;

impl TaskSink for TracingTaskSink {
    fn log(&self, message: &str) {
        info!("{}", message);
    }

    fn finish(&self, status: &RunStatus) {
        match status {
            RunStatus::Completed => info!("Run completed"),
            RunStatus::Failed { cause } => error!("Run failed: {}", cause),
        }
    }
}
