use std::fmt::Display;
use std::path::PathBuf;

#[derive(Debug)]
pub enum SwathqueryError {
    DataReadingError(DataReadingError),
    DataProcessingError(DataProcessingError),
}

impl Display for SwathqueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Errors raised while locating or decoding spectra.
///
/// Both variants are fatal for the run being analyzed.
#[derive(Debug)]
pub enum DataReadingError {
    /// No block (or block index) covers the requested run/level/window.
    MissingIndex { run: String, context: String },
    /// The provider found the bytes but could not decode them.
    ParseFailure { run: String, context: String },
    Io {
        source: std::io::Error,
        path: Option<PathBuf>,
    },
}

impl Display for DataReadingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingIndex { run, context } => {
                write!(f, "No spectral index for run {}: {}", run, context)
            }
            Self::ParseFailure { run, context } => {
                write!(f, "Unable to decode spectra of run {}: {}", run, context)
            }
            Self::Io { source, path } => match path {
                Some(path) => write!(f, "IO error on {}: {}", path.display(), source),
                None => write!(f, "IO error: {}", source),
            },
        }
    }
}

impl std::error::Error for DataReadingError {}

#[derive(Debug)]
pub enum DataProcessingError {
    ExpectedVectorLength { real: usize, expected: usize },
    ExpectedNonEmptyData,
    ExpectedAscendingRt { index: usize },
    ExpectedSortedMz { index: usize },
    UnknownResidue(char),
    AxisMismatch { ms1: usize, ms2: usize },
}

impl From<DataProcessingError> for SwathqueryError {
    fn from(e: DataProcessingError) -> Self {
        SwathqueryError::DataProcessingError(e)
    }
}

impl From<DataReadingError> for SwathqueryError {
    fn from(e: DataReadingError) -> Self {
        SwathqueryError::DataReadingError(e)
    }
}

impl From<std::io::Error> for DataReadingError {
    fn from(e: std::io::Error) -> Self {
        DataReadingError::Io {
            source: e,
            path: None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SwathqueryError>;
