use crate::rt_calibration::CalibrationError;
use std::path::PathBuf;
use swathquery::{
    DataProcessingError as SQDataProcessingError,
    DataReadingError,
    SwathqueryError,
};

#[derive(Debug)]
pub enum DataProcessingError {
    ExpectedSlicesSameLength {
        expected: usize,
        other: usize,
        context: String,
    },
    SwathqueryDataProcessingError {
        error: SQDataProcessingError,
        context: String,
    },
}

impl From<SQDataProcessingError> for DataProcessingError {
    fn from(x: SQDataProcessingError) -> Self {
        Self::SwathqueryDataProcessingError {
            error: x,
            context: "".to_string(),
        }
    }
}

/// Failures of the weight learning stage.
///
/// `DegenerateTrainingSet` and `SingularFit` only discard the trial they
/// happen in, unless the whole input is degenerate.
#[derive(Debug, Clone, PartialEq)]
pub enum LearningError {
    DegenerateTrainingSet { context: String },
    SingularFit { context: String },
    AllTrialsFailed { trials: usize },
}

#[derive(Debug)]
pub enum LibraryReadingError {
    SpeclibParsingError {
        source: serde_json::Error,
        context: &'static str,
    },
    FileReadingError {
        source: std::io::Error,
        context: &'static str,
        path: PathBuf,
    },
    InvalidEntry {
        peptide_ref: String,
        context: String,
    },
}

#[derive(Debug)]
pub enum SwathSeekError {
    DataReading(DataReadingError),
    Swathquery(SwathqueryError),
    Io {
        source: std::io::Error,
        path: Option<std::path::PathBuf>,
    },
    ParseError {
        msg: String,
    },
    DataProcessingError(DataProcessingError),
    LibraryReadingError(LibraryReadingError),
    Learning(LearningError),
    Calibration(CalibrationError),
    Sink {
        msg: String,
    },
}

impl std::fmt::Display for SwathSeekError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

pub type Result<T> = std::result::Result<T, SwathSeekError>;

impl From<DataReadingError> for SwathSeekError {
    fn from(x: DataReadingError) -> Self {
        Self::DataReading(x)
    }
}

impl From<SwathqueryError> for SwathSeekError {
    fn from(x: SwathqueryError) -> Self {
        Self::Swathquery(x)
    }
}

impl From<serde_json::Error> for SwathSeekError {
    fn from(val: serde_json::Error) -> Self {
        SwathSeekError::ParseError {
            msg: val.to_string(),
        }
    }
}

impl From<DataProcessingError> for SwathSeekError {
    fn from(x: DataProcessingError) -> Self {
        Self::DataProcessingError(x)
    }
}

impl From<LibraryReadingError> for SwathSeekError {
    fn from(x: LibraryReadingError) -> Self {
        Self::LibraryReadingError(x)
    }
}

impl From<LearningError> for SwathSeekError {
    fn from(x: LearningError) -> Self {
        Self::Learning(x)
    }
}

impl From<CalibrationError> for SwathSeekError {
    fn from(x: CalibrationError) -> Self {
        Self::Calibration(x)
    }
}

impl From<SQDataProcessingError> for SwathSeekError {
    fn from(x: SQDataProcessingError) -> Self {
        Self::DataProcessingError(DataProcessingError::SwathqueryDataProcessingError {
            error: x,
            context: "".to_string(),
        })
    }
}
