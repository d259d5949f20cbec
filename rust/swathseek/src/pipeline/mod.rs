pub mod accumulator;
pub mod analysis;
pub mod irt;
pub mod results;

pub use accumulator::{
    BlockAccumulator,
    PeptideOutcome,
    SkipCounts,
    SkippingReason,
};
pub use analysis::{
    AnalysisParams,
    BlockOutput,
    PeptideScratch,
    RunAnalyzer,
    RunReport,
};
pub use irt::{
    IrtAnchor,
    IrtResult,
};
pub use results::{
    FeatureRecord,
    PeptideResult,
    ResultParquetWriter,
    ResultRecord,
};
