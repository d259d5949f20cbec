pub mod chromatogram_picker;
pub mod feature_finder;
pub mod max_peak;

pub use chromatogram_picker::{
    pick_chromatogram,
    IonPeak,
};
pub use feature_finder::{
    FeatureFinder,
    PeakGroup,
};
pub use max_peak::{
    pick_max_peak,
    MaxPeak,
};

use serde::{
    Deserialize,
    Serialize,
};

/// How candidate spans are seeded when building peak groups.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum FeatureFinderKind {
    /// Every fragment's ion peaks can seed a span.
    #[default]
    #[serde(rename = "consensus")]
    Consensus,
    /// Only the most intense library fragment's ion peaks seed spans.
    #[serde(rename = "reference_guided")]
    ReferenceGuided,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PeakParams {
    /// Fine SNR an apex needs to be the max peak, and wide SNR for ion peaks.
    pub min_snr: f32,
    /// SNR below which max peak boundaries stop.
    pub boundary_snr: f32,
    pub max_features: usize,
    pub feature_finder: FeatureFinderKind,
}

impl Default for PeakParams {
    fn default() -> Self {
        Self {
            min_snr: 1.0,
            boundary_snr: 1.0,
            max_features: 5,
            feature_finder: FeatureFinderKind::Consensus,
        }
    }
}
