use crate::errors::{
    Result,
    SwathSeekError,
};
use crate::fdr::{
    FdrEntry,
    IdentifyStatus,
};
use crate::ml::PeptideScores;
use crate::peaks::PeakGroup;
use crate::scoring::{
    ScoreType,
    ScoreVector,
};
use parquet::file::writer::SerializedFileWriter;
use parquet::record::RecordWriter;
use serde::Serialize;
use std::fs::File;
use std::path::Path;
use swathquery::PeptideCoordinate;
use tracing::debug;

/// Every feature found for one target or decoy peptide, best first by
/// total intensity until rescored.
#[derive(Debug, Clone, Serialize)]
pub struct PeptideResult {
    pub peptide_ref: String,
    pub sequence: String,
    pub is_decoy: bool,
    pub precursor_mz: f64,
    pub charge: u8,
    pub library_rt: f32,
    pub proteins: Vec<String>,
    pub features: Vec<PeakGroup>,
}

impl PeptideResult {
    pub fn new(coord: &PeptideCoordinate, features: Vec<PeakGroup>) -> Self {
        Self {
            peptide_ref: coord.peptide_ref.clone(),
            sequence: coord.sequence.clone(),
            is_decoy: coord.is_decoy,
            precursor_mz: coord.precursor_mz,
            charge: coord.charge,
            library_rt: coord.library_rt,
            proteins: coord.proteins.clone(),
            features,
        }
    }

    pub fn peptide_scores(&self) -> PeptideScores {
        PeptideScores {
            peptide_ref: self.peptide_ref.clone(),
            is_decoy: self.is_decoy,
            features: self.features.iter().map(|f| f.scores).collect(),
        }
    }

    /// The feature with the highest `WeightedTotalScore`, first one on ties.
    pub fn top_feature(&self) -> Option<&PeakGroup> {
        let mut best: Option<&PeakGroup> = None;
        for f in self.features.iter() {
            match best {
                Some(b)
                    if b.scores[ScoreType::WeightedTotalScore]
                        >= f.scores[ScoreType::WeightedTotalScore] => {}
                _ => best = Some(f),
            }
        }
        best
    }
}

/// One feature with every sub-score, as written per block.
#[derive(Debug, Clone, Serialize, ParquetRecordWriter)]
pub struct FeatureRecord {
    pub run_id: String,
    pub peptide_ref: String,
    pub sequence: String,
    pub is_decoy: bool,
    pub precursor_mz: f64,
    pub charge: u8,
    pub feature_rank: u32,
    pub left_rt: f32,
    pub apex_rt: f32,
    pub right_rt: f32,
    pub total_intensity: f64,
    pub supporting_fragments: u32,
    pub ions_low: u32,
    pub ions_high: u32,

    // Flattened by hand, parquet_derive has no flatten.
    pub init_score: f64,
    pub weighted_total_score: f64,
    pub xcorr_coelution: f64,
    pub xcorr_coelution_weighted: f64,
    pub xcorr_shape: f64,
    pub xcorr_shape_weighted: f64,
    pub library_corr: f64,
    pub library_rsmd: f64,
    pub library_manhattan: f64,
    pub library_dotprod: f64,
    pub library_sangle: f64,
    pub library_rootmeansquare: f64,
    pub log_sn_score: f64,
    pub norm_rt_score: f64,
    pub intensity_score: f64,
    pub isotope_correlation_score: f64,
    pub isotope_overlap_score: f64,
    pub massdev_score: f64,
    pub massdev_score_weighted: f64,
    pub bseries_score: f64,
    pub yseries_score: f64,
    pub ions_delta: f64,
}

impl FeatureRecord {
    pub fn new(run_id: &str, peptide: &PeptideResult, rank: usize, group: &PeakGroup) -> Self {
        let s: &ScoreVector = &group.scores;
        Self {
            run_id: run_id.to_string(),
            peptide_ref: peptide.peptide_ref.clone(),
            sequence: peptide.sequence.clone(),
            is_decoy: peptide.is_decoy,
            precursor_mz: peptide.precursor_mz,
            charge: peptide.charge,
            feature_rank: rank as u32,
            left_rt: group.left_rt,
            apex_rt: group.apex_rt,
            right_rt: group.right_rt,
            total_intensity: group.total_intensity,
            supporting_fragments: group.supporting_fragments as u32,
            ions_low: group.ions_low as u32,
            ions_high: group.ions_high as u32,
            init_score: s[ScoreType::InitScore],
            weighted_total_score: s[ScoreType::WeightedTotalScore],
            xcorr_coelution: s[ScoreType::XcorrCoelution],
            xcorr_coelution_weighted: s[ScoreType::XcorrCoelutionWeighted],
            xcorr_shape: s[ScoreType::XcorrShape],
            xcorr_shape_weighted: s[ScoreType::XcorrShapeWeighted],
            library_corr: s[ScoreType::LibraryCorr],
            library_rsmd: s[ScoreType::LibraryRsmd],
            library_manhattan: s[ScoreType::LibraryManhattan],
            library_dotprod: s[ScoreType::LibraryDotprod],
            library_sangle: s[ScoreType::LibrarySangle],
            library_rootmeansquare: s[ScoreType::LibraryRootmeansquare],
            log_sn_score: s[ScoreType::LogSnScore],
            norm_rt_score: s[ScoreType::NormRtScore],
            intensity_score: s[ScoreType::IntensityScore],
            isotope_correlation_score: s[ScoreType::IsotopeCorrelationScore],
            isotope_overlap_score: s[ScoreType::IsotopeOverlapScore],
            massdev_score: s[ScoreType::MassdevScore],
            massdev_score_weighted: s[ScoreType::MassdevScoreWeighted],
            bseries_score: s[ScoreType::BseriesScore],
            yseries_score: s[ScoreType::YseriesScore],
            ions_delta: s[ScoreType::IonsDelta],
        }
    }

    pub fn from_peptide(run_id: &str, peptide: &PeptideResult) -> Vec<Self> {
        peptide
            .features
            .iter()
            .enumerate()
            .map(|(rank, g)| Self::new(run_id, peptide, rank, g))
            .collect()
    }
}

/// The top feature of one peptide after FDR assignment.
#[derive(Debug, Clone, Serialize, ParquetRecordWriter)]
pub struct ResultRecord {
    pub run_id: String,
    pub peptide_ref: String,
    pub sequence: String,
    /// Accessions joined with `;`.
    pub proteins: String,
    pub is_decoy: bool,
    pub precursor_mz: f64,
    pub charge: u8,
    pub left_rt: f32,
    pub apex_rt: f32,
    pub right_rt: f32,
    pub total_intensity: f64,
    pub init_score: f64,
    pub total_score: f64,
    pub fdr: Option<f64>,
    pub q_value: Option<f64>,
    pub identified: bool,
}

impl ResultRecord {
    pub fn new(run_id: &str, peptide: &PeptideResult, top: &PeakGroup) -> Self {
        Self {
            run_id: run_id.to_string(),
            peptide_ref: peptide.peptide_ref.clone(),
            sequence: peptide.sequence.clone(),
            proteins: peptide.proteins.join(";"),
            is_decoy: peptide.is_decoy,
            precursor_mz: peptide.precursor_mz,
            charge: peptide.charge,
            left_rt: top.left_rt,
            apex_rt: top.apex_rt,
            right_rt: top.right_rt,
            total_intensity: top.total_intensity,
            init_score: top.scores[ScoreType::InitScore],
            total_score: top.scores[ScoreType::WeightedTotalScore],
            fdr: None,
            q_value: None,
            identified: false,
        }
    }

    /// Copies the engine's verdict from the entry carrying this record.
    pub fn fill_from(entry: &mut FdrEntry<ResultRecord>) {
        entry.meta.fdr = entry.fdr;
        entry.meta.q_value = entry.q_value;
        entry.meta.identified = entry.status == IdentifyStatus::Identified;
    }
}

fn parquet_error(context: &str, e: impl std::fmt::Debug) -> SwathSeekError {
    SwathSeekError::Sink {
        msg: format!("{}: {:?}", context, e),
    }
}

/// Buffered parquet writer, one row group every `row_group_size` rows.
pub struct ResultParquetWriter<R> {
    row_group_size: usize,
    writer: SerializedFileWriter<File>,
    buffer: Vec<R>,
}

impl<R> ResultParquetWriter<R>
where
    for<'a> &'a [R]: RecordWriter<R>,
{
    pub fn new(out_path: impl AsRef<Path>, row_group_size: usize) -> Result<Self> {
        let file = match File::create_new(out_path.as_ref()) {
            Ok(file) => file,
            Err(err) => {
                tracing::error!(
                    "Failed to open file {:?} with error: {}",
                    out_path.as_ref(),
                    err
                );
                return Err(SwathSeekError::Io {
                    source: err,
                    path: Some(out_path.as_ref().to_path_buf()),
                });
            }
        };
        let empty: &[R] = &[];
        let schema = empty
            .schema()
            .map_err(|e| parquet_error("Building parquet schema", e))?;
        let writer = SerializedFileWriter::new(file, schema, Default::default())
            .map_err(|e| parquet_error("Creating parquet writer", e))?;
        Ok(Self {
            buffer: Vec::with_capacity(row_group_size),
            writer,
            row_group_size: row_group_size.max(1),
        })
    }

    fn flush_to_file(&mut self) -> Result<()> {
        debug!("Flushing {} results to file", self.buffer.len());
        let mut row_group = self
            .writer
            .next_row_group()
            .map_err(|e| parquet_error("Opening row group", e))?;
        self.buffer
            .as_slice()
            .write_to_row_group(&mut row_group)
            .map_err(|e| parquet_error("Writing row group", e))?;
        row_group
            .close()
            .map_err(|e| parquet_error("Closing row group", e))?;
        self.buffer.clear();
        Ok(())
    }

    pub fn add(&mut self, result: R) -> Result<()> {
        self.buffer.push(result);
        if self.buffer.len() >= self.row_group_size {
            self.flush_to_file()?;
        }
        Ok(())
    }

    pub fn close(mut self) -> Result<()> {
        if !self.buffer.is_empty() {
            self.flush_to_file()?;
        }
        self.writer
            .close()
            .map_err(|e| parquet_error("Closing parquet file", e))?;
        Ok(())
    }
}
