use serde::{
    Deserialize,
    Serialize,
};
use std::path::PathBuf;
use swathseek::AnalysisParams;

use crate::cli::Cli;
use crate::errors::CliError;

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    pub input: Option<InputConfig>,
    #[serde(default)]
    pub analysis: AnalysisParams,
    pub output: Option<OutputConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct InputConfig {
    pub run_archive: PathBuf,
    pub library: PathBuf,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OutputConfig {
    pub directory: PathBuf,
}

/// A config whose input and output are known to be present.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub input: InputConfig,
    pub analysis: AnalysisParams,
    pub output: OutputConfig,
}

impl Config {
    pub fn from_json(text: &str) -> Result<Self, CliError> {
        serde_json::from_str(text).map_err(|e| CliError::ParseError { msg: e.to_string() })
    }

    /// Reads the config file named by `args` (if any) and applies the flag
    /// overrides on top of it.
    pub fn with_cli_args(args: &Cli) -> Result<Self, CliError> {
        let mut config = match &args.config {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| CliError::io(e, path))?;
                Self::from_json(&text)?
            }
            None => Config::default(),
        };
        config.apply_overrides(
            args.run_archive.clone(),
            args.library.clone(),
            args.output_dir.clone(),
        )?;
        Ok(config)
    }

    fn apply_overrides(
        &mut self,
        run_archive: Option<PathBuf>,
        library: Option<PathBuf>,
        output_dir: Option<PathBuf>,
    ) -> Result<(), CliError> {
        match (&mut self.input, run_archive, library) {
            (Some(input), archive, lib) => {
                if let Some(archive) = archive {
                    input.run_archive = archive;
                }
                if let Some(lib) = lib {
                    input.library = lib;
                }
            }
            (None, Some(run_archive), Some(library)) => {
                self.input = Some(InputConfig {
                    run_archive,
                    library,
                });
            }
            (None, Some(_), None) | (None, None, Some(_)) => {
                return Err(CliError::Config {
                    source: "both --run-archive and --library are needed when the config has no input section".to_string(),
                });
            }
            (None, None, None) => {}
        }
        if let Some(directory) = output_dir {
            self.output = Some(OutputConfig { directory });
        }
        Ok(())
    }

    pub fn resolve(self) -> Result<ResolvedConfig, CliError> {
        let input = self.input.ok_or_else(|| CliError::Config {
            source: "No input provided, please provide one in either the config file or with the --run-archive and --library flags".to_string(),
        })?;
        let output = self.output.ok_or_else(|| CliError::Config {
            source: "No output directory provided, please provide one in either the config file or with the --output-dir flag".to_string(),
        })?;
        Ok(ResolvedConfig {
            input,
            analysis: self.analysis,
            output,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_analysis_section_uses_defaults() {
        let config = Config::from_json(
            r#"{
                "input": {"run_archive": "run.swath", "library": "lib.json"},
                "analysis": {"fdr": {"fdr_cutoff": 0.05}, "learning": {"classifier": "prior"}},
                "output": {"directory": "out"}
            }"#,
        )
        .unwrap();
        assert_eq!(config.analysis.fdr.fdr_cutoff, 0.05);
        assert_eq!(config.analysis.extraction, AnalysisParams::default().extraction);
        assert_eq!(
            config.analysis.learning.classifier,
            swathseek::ml::Classifier::Prior
        );
        let resolved = config.resolve().unwrap();
        assert_eq!(resolved.input.library, PathBuf::from("lib.json"));
    }

    #[test]
    fn test_flags_override_config() {
        let mut config = Config::from_json(
            r#"{"input": {"run_archive": "a.swath", "library": "lib.json"}}"#,
        )
        .unwrap();
        config
            .apply_overrides(Some("b.swath".into()), None, Some("results".into()))
            .unwrap();
        let resolved = config.resolve().unwrap();
        assert_eq!(resolved.input.run_archive, PathBuf::from("b.swath"));
        assert_eq!(resolved.input.library, PathBuf::from("lib.json"));
        assert_eq!(resolved.output.directory, PathBuf::from("results"));
    }

    #[test]
    fn test_missing_sections_are_reported() {
        let mut config = Config::default();
        assert!(matches!(
            config.apply_overrides(Some("a.swath".into()), None, None),
            Err(CliError::Config { .. })
        ));
        assert!(matches!(
            Config::default().resolve(),
            Err(CliError::Config { .. })
        ));
        assert!(matches!(
            Config::from_json("{not json"),
            Err(CliError::ParseError { .. })
        ));
    }
}
