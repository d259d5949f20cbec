use super::config::{
    OutputConfig,
    ResolvedConfig,
};
use super::errors::CliError;
use indicatif::{
    ProgressBar,
    ProgressStyle,
};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::{
    Path,
    PathBuf,
};
use std::time::Instant;
use swathquery::{
    BlockIndex,
    RunArchive,
    SpectraProvider,
};
use swathseek::errors::{
    Result,
    SwathSeekError,
};
use swathseek::fdr::FdrReport;
use swathseek::pipeline::{
    FeatureRecord,
    IrtResult,
    PeptideResult,
    ResultParquetWriter,
    ResultRecord,
};
use swathseek::{
    ResultSink,
    RunAnalyzer,
    RunReport,
    RunStatus,
    Speclib,
    TaskSink,
    WeightVector,
};
use tracing::{
    error,
    info,
};

const ROW_GROUP_SIZE: usize = 20_000;

fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|e| SwathSeekError::Io {
        source: e,
        path: Some(path.to_path_buf()),
    })?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)?;
    info!("Wrote {}", path.display());
    Ok(())
}

/// Writes per-feature rows while blocks complete, then the FDR ranked top
/// features and the JSON side files.
pub struct ParquetResultSink {
    run_id: String,
    directory: PathBuf,
    features: ResultParquetWriter<FeatureRecord>,
    nwritten: usize,
}

impl ParquetResultSink {
    pub fn new(output: &OutputConfig, run_id: &str) -> Result<Self> {
        let features = ResultParquetWriter::new(output.directory.join("features.parquet"), ROW_GROUP_SIZE)?;
        Ok(Self {
            run_id: run_id.to_string(),
            directory: output.directory.clone(),
            features,
            nwritten: 0,
        })
    }

    pub fn close(self) -> Result<usize> {
        self.features.close()?;
        Ok(self.nwritten)
    }
}

impl ResultSink for ParquetResultSink {
    fn write_calibration(&mut self, calibration: &IrtResult) -> Result<()> {
        write_json(calibration, &self.directory.join("irt.json"))
    }

    fn write_block(&mut self, _block: &BlockIndex, results: &[PeptideResult]) -> Result<()> {
        for peptide in results {
            for record in FeatureRecord::from_peptide(&self.run_id, peptide) {
                self.features.add(record)?;
                self.nwritten += 1;
            }
        }
        Ok(())
    }

    fn write_weights(&mut self, weights: &WeightVector) -> Result<()> {
        write_json(weights, &self.directory.join("weights.json"))
    }

    fn write_fdr(&mut self, report: &FdrReport<ResultRecord>) -> Result<()> {
        let mut writer = ResultParquetWriter::new(self.directory.join("results.parquet"), ROW_GROUP_SIZE)?;
        for entry in report.entries.iter() {
            writer.add(entry.meta.clone())?;
        }
        writer.close()?;
        write_json(&report.summary, &self.directory.join("fdr_summary.json"))?;
        write_json(&report.distribution, &self.directory.join("fdr_distribution.json"))
    }
}

/// Block progress on an indicatif bar, messages through tracing.
pub struct ProgressTaskSink {
    bar: ProgressBar,
}

impl ProgressTaskSink {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} blocks ({eta})",
        ) {
            bar.set_style(style);
        }
        Self { bar }
    }
}

impl Default for ProgressTaskSink {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskSink for ProgressTaskSink {
    fn log(&self, message: &str) {
        self.bar.suspend(|| info!("{}", message));
    }

    fn progress(&self, done: usize, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(done as u64);
    }

    fn finish(&self, status: &RunStatus) {
        self.bar.finish_and_clear();
        match status {
            RunStatus::Completed => info!("Run completed"),
            RunStatus::Failed { cause } => error!("Run failed: {}", cause),
        }
    }
}

pub fn process_run(config: &ResolvedConfig) -> std::result::Result<RunReport, CliError> {
    let st = Instant::now();
    let archive = RunArchive::open(&config.input.run_archive)?;
    info!(
        "Opened run {} with {} MS2 blocks in {:?}",
        archive.run_id(),
        archive.ms2_indices().len(),
        st.elapsed()
    );

    info!("Loading library from {:?}", config.input.library);
    let st = Instant::now();
    let library = Speclib::from_file(&config.input.library)?;
    info!(
        "Loading speclib of length {} took: {:?} for {}",
        library.len(),
        st.elapsed(),
        config.input.library.display()
    );

    let analyzer = RunAnalyzer::new(config.analysis.clone());
    let mut sink = ParquetResultSink::new(&config.output, archive.run_id())?;
    let tasks = ProgressTaskSink::new();
    let st = Instant::now();
    let report = analyzer.run(&archive, &library, &mut sink, &tasks)?;
    let nwritten = sink.close()?;

    write_json(&report, &config.output.directory.join("run_report.json"))?;
    info!(
        "Processed {} peptides, wrote {} features in {:?}",
        report.peptides_scored,
        nwritten,
        st.elapsed()
    );
    Ok(report)
}
