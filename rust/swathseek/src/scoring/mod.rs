pub mod library;
pub mod score_types;
pub mod scorer;
pub mod spectral;
pub mod timings;
pub mod xcorr;

pub use score_types::{
    ScoreType,
    ScoreVector,
    WeightVector,
    NUM_SCORES,
};
pub use scorer::{
    normalized_trace_weights,
    FeatureScorer,
    ScoringContext,
};
pub use timings::ScoreTimings;
