pub mod spectra_provider;

pub use spectra_provider::{
    BlockIndex,
    MsLevel,
    SpectraProvider,
};
