use crate::errors::DataProcessingError;
use serde::{
    Deserialize,
    Serialize,
};
use std::sync::Arc;

/// Extracted intensities of one fragment over the chromatogram's RT axis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FragmentTrace {
    pub label: String,
    pub mz: f64,
    pub library_intensity: f32,
    pub intensities: Vec<f32>,
}

/// Number of ladder ions present (`low`) and dominant (`high`) per scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IonCounts {
    pub low: Vec<u16>,
    pub high: Vec<u16>,
    /// Number of ions in the ladder the counts were taken over.
    pub ladder_size: u16,
}

/// Per-fragment XICs of one coordinate, all sharing one RT axis.
///
/// Fragment traces keep the coordinate's fragment order, minus the
/// fragments that were dropped for having no signal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chromatogram {
    rts: Arc<[f32]>,
    traces: Vec<FragmentTrace>,
    self_trace: Vec<f32>,
    ms1_trace: Option<Vec<f32>>,
    ion_counts: Option<IonCounts>,
}

impl Chromatogram {
    pub fn try_new(
        rts: Arc<[f32]>,
        traces: Vec<FragmentTrace>,
        self_trace: Vec<f32>,
    ) -> Result<Self, DataProcessingError> {
        if rts.is_empty() || traces.is_empty() {
            return Err(DataProcessingError::ExpectedNonEmptyData);
        }
        if let Some(i) = rts.windows(2).position(|w| w[0] >= w[1]) {
            return Err(DataProcessingError::ExpectedAscendingRt { index: i + 1 });
        }
        for t in traces.iter() {
            if t.intensities.len() != rts.len() {
                return Err(DataProcessingError::ExpectedVectorLength {
                    real: t.intensities.len(),
                    expected: rts.len(),
                });
            }
        }
        if self_trace.len() != rts.len() {
            return Err(DataProcessingError::ExpectedVectorLength {
                real: self_trace.len(),
                expected: rts.len(),
            });
        }
        Ok(Self {
            rts,
            traces,
            self_trace,
            ms1_trace: None,
            ion_counts: None,
        })
    }

    pub fn with_ms1_trace(mut self, trace: Vec<f32>) -> Result<Self, DataProcessingError> {
        if trace.len() != self.rts.len() {
            return Err(DataProcessingError::AxisMismatch {
                ms1: trace.len(),
                ms2: self.rts.len(),
            });
        }
        self.ms1_trace = Some(trace);
        Ok(self)
    }

    pub fn with_ion_counts(mut self, counts: IonCounts) -> Result<Self, DataProcessingError> {
        if counts.low.len() != self.rts.len() || counts.high.len() != self.rts.len() {
            return Err(DataProcessingError::ExpectedVectorLength {
                real: counts.low.len(),
                expected: self.rts.len(),
            });
        }
        self.ion_counts = Some(counts);
        Ok(self)
    }

    pub fn rts(&self) -> &[f32] {
        &self.rts
    }

    pub fn shared_rts(&self) -> Arc<[f32]> {
        self.rts.clone()
    }

    pub fn traces(&self) -> &[FragmentTrace] {
        &self.traces
    }

    pub fn num_fragments(&self) -> usize {
        self.traces.len()
    }

    pub fn len(&self) -> usize {
        self.rts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rts.is_empty()
    }

    pub fn self_trace(&self) -> &[f32] {
        &self.self_trace
    }

    pub fn ms1_trace(&self) -> Option<&[f32]> {
        self.ms1_trace.as_deref()
    }

    pub fn ion_counts(&self) -> Option<&IonCounts> {
        self.ion_counts.as_ref()
    }

    /// Summed intensity of every fragment trace over the whole axis.
    pub fn total_intensity(&self) -> f64 {
        self.traces
            .iter()
            .flat_map(|t| t.intensities.iter())
            .map(|&x| x as f64)
            .sum()
    }
}
