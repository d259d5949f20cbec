//! Spectra access and ion chromatogram extraction for DIA/SWATH runs.
//!
//! The crate knows how to hold RT-ordered spectra ([`SpectraMap`]), where to
//! find them ([`SpectraProvider`]) and how to turn them into per-fragment
//! chromatograms for a [`PeptideCoordinate`] ([`Extractor`]).

// Re-export main structures
pub use crate::extraction::{
    ExtractionOutcome,
    Extractor,
};
pub use crate::models::{
    Chromatogram,
    DecoyVariant,
    ExtractionParams,
    Fragment,
    FragmentTrace,
    IonCounts,
    IonLadder,
    PeptideCoordinate,
    RtTolerance,
    RtWindow,
    SpectraMap,
    Spectrum,
};
pub use crate::storage::{
    InMemoryRun,
    RunArchive,
    RunArchiveWriter,
};

// Re-export traits
pub use crate::traits::{
    BlockIndex,
    MsLevel,
    SpectraProvider,
};

// Declare modules
pub mod errors;
pub mod extraction;
pub mod models;
pub mod storage;
pub mod traits;

// Re-export errors
pub use crate::errors::{
    DataProcessingError,
    DataReadingError,
    SwathqueryError,
};
