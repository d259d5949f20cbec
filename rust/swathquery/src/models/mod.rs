pub mod chromatogram;
pub mod coordinate;
pub mod ion_ladder;
pub mod spectra;
pub mod tolerance;

pub use chromatogram::{
    Chromatogram,
    FragmentTrace,
    IonCounts,
};
pub use coordinate::{
    DecoyVariant,
    Fragment,
    PeptideCoordinate,
    RtWindow,
};
pub use ion_ladder::IonLadder;
pub use spectra::{
    SpectraMap,
    Spectrum,
};
pub use tolerance::{
    ExtractionParams,
    RtTolerance,
};
