#[derive(Debug)]
pub enum CliError {
    Config {
        source: String,
    },
    ParseError {
        msg: String,
    },
    Io {
        source: String,
        path: Option<String>,
    },
    DataReading {
        source: String,
    },
    Analysis {
        source: String,
    },
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Config { source } => write!(f, "Error interpreting the config: {}", source),
            CliError::ParseError { msg } => write!(f, "Error parsing config: {}", msg),
            CliError::Io { source, path } => {
                if let Some(path) = path {
                    write!(f, "Error reading file {}: {}", path, source)
                } else {
                    write!(f, "Error reading file: {}", source)
                }
            }
            CliError::DataReading { source } => write!(f, "Error reading data: {}", source),
            CliError::Analysis { source } => write!(f, "Analysis failed: {}", source),
        }
    }
}

impl std::error::Error for CliError {}

impl From<swathquery::DataReadingError> for CliError {
    fn from(e: swathquery::DataReadingError) -> Self {
        CliError::DataReading {
            source: format!("{:?}", e),
        }
    }
}

impl From<swathseek::errors::LibraryReadingError> for CliError {
    fn from(e: swathseek::errors::LibraryReadingError) -> Self {
        CliError::DataReading {
            source: format!("{:?}", e),
        }
    }
}

impl From<swathseek::errors::SwathSeekError> for CliError {
    fn from(e: swathseek::errors::SwathSeekError) -> Self {
        CliError::Analysis {
            source: e.to_string(),
        }
    }
}

impl CliError {
    pub fn io(e: std::io::Error, path: &std::path::Path) -> Self {
        CliError::Io {
            source: e.to_string(),
            path: Some(path.to_string_lossy().to_string()),
        }
    }
}
