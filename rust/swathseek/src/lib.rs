pub mod data_sources;
pub mod errors;
pub mod fdr;
pub mod ml;
pub mod peaks;
pub mod pipeline;
pub mod rt_calibration;
pub mod scoring;
pub mod signal;
pub mod traits;
pub mod utils;
extern crate parquet;
#[macro_use]
extern crate parquet_derive;

pub use data_sources::Speclib;
pub use fdr::{
    FdrEngine,
    FdrParams,
};
pub use ml::SemiSupervisedLearner;
pub use peaks::{
    FeatureFinder,
    PeakGroup,
};
pub use pipeline::{
    AnalysisParams,
    RunAnalyzer,
    RunReport,
};
pub use rt_calibration::{
    Calibration,
    RtCalibration,
};
pub use scoring::{
    FeatureScorer,
    ScoreType,
    ScoreVector,
    WeightVector,
};
pub use signal::SignalConditioner;
pub use traits::{
    CoordinateProvider,
    ResultSink,
    RunStatus,
    TaskSink,
    TracingTaskSink,
};
