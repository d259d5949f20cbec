//! Smoothing and signal to noise of extracted traces.

pub mod gauss;
pub mod noise;

pub use gauss::{
    GaussFilter,
    GaussKernel,
};
pub use noise::SnrEstimator;

use serde::{
    Deserialize,
    Serialize,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SignalParams {
    pub gauss: GaussFilter,
    pub fine_snr: SnrEstimator,
    pub wide_snr: SnrEstimator,
}

impl Default for SignalParams {
    fn default() -> Self {
        Self {
            gauss: GaussFilter::default(),
            fine_snr: SnrEstimator::fine(),
            wide_snr: SnrEstimator::wide(),
        }
    }
}

/// One fragment trace after conditioning, all three on the chromatogram axis.
#[derive(Debug, Clone, Default)]
pub struct ConditionedTrace {
    pub smoothed: Vec<f32>,
    /// SNR of the smoothed trace.
    pub fine_snr: Vec<f32>,
    /// SNR of the raw trace.
    pub wide_snr: Vec<f32>,
}

/// Holds the tabulated kernel so it is built once per analysis, not per trace.
#[derive(Debug, Clone)]
pub struct SignalConditioner {
    params: SignalParams,
    kernel: GaussKernel,
}

impl SignalConditioner {
    pub fn new(params: SignalParams) -> Self {
        let kernel = params.gauss.kernel();
        Self { params, kernel }
    }

    pub fn params(&self) -> &SignalParams {
        &self.params
    }

    pub fn condition(&self, rts: &[f32], raw: &[f32], scratch: &mut Vec<f32>) -> ConditionedTrace {
        let mut out = ConditionedTrace::default();
        self.kernel.smooth_into(rts, raw, &mut out.smoothed);
        self.params
            .fine_snr
            .estimate_into(&out.smoothed, scratch, &mut out.fine_snr);
        self.params
            .wide_snr
            .estimate_into(raw, scratch, &mut out.wide_snr);
        out
    }
}

impl Default for SignalConditioner {
    fn default() -> Self {
        Self::new(SignalParams::default())
    }
}
