//! Single file run archive.
//!
//! Layout: an 8 byte magic, the little endian `u64` offset of the index, the
//! scan records, then the JSON [`ArchiveIndex`]. Each scan is its own zstd
//! frame holding a MessagePack encoded record, so any RT sub-range of a block
//! can be read without touching the rest of it.

use crate::errors::DataReadingError;
use crate::models::{
    SpectraMap,
    Spectrum,
};
use crate::traits::{
    BlockIndex,
    MsLevel,
    SpectraProvider,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::fs::File;
use std::io::{
    BufWriter,
    Read,
    Seek,
    SeekFrom,
    Write,
};
use std::ops::Range;
use std::path::{
    Path,
    PathBuf,
};
use tracing::{
    debug,
    info,
};

const MAGIC: &[u8; 8] = b"SWARC001";
const HEADER_LEN: u64 = 16;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchiveIndex {
    pub run_id: String,
    pub ms1: Option<BlockIndex>,
    pub ms2: Vec<BlockIndex>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ScanRecord {
    rt: f32,
    mz: Vec<f64>,
    intensity: Vec<f32>,
}

pub struct RunArchiveWriter {
    path: PathBuf,
    file: BufWriter<File>,
    pos: u64,
    compression_level: i32,
    index: ArchiveIndex,
}

impl RunArchiveWriter {
    pub fn create(path: impl AsRef<Path>, run_id: &str) -> Result<Self, DataReadingError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|e| DataReadingError::Io {
            source: e,
            path: Some(path.clone()),
        })?;
        let mut file = BufWriter::new(file);
        file.write_all(MAGIC)?;
        file.write_all(&0u64.to_le_bytes())?;
        Ok(Self {
            path,
            file,
            pos: HEADER_LEN,
            compression_level: 3,
            index: ArchiveIndex {
                run_id: run_id.to_string(),
                ms1: None,
                ms2: Vec::new(),
            },
        })
    }

    /// Appends one block. An MS1 block replaces any previous one.
    pub fn write_block(
        &mut self,
        level: MsLevel,
        window: Option<(f64, f64)>,
        spectra: &SpectraMap,
    ) -> Result<(), DataReadingError> {
        let start_ptr = self.pos;
        let mut scan_ptrs = Vec::with_capacity(spectra.len());
        for (rt, spectrum) in spectra.iter() {
            scan_ptrs.push(self.pos);
            let record = ScanRecord {
                rt,
                mz: spectrum.mz().to_vec(),
                intensity: spectrum.intensity().to_vec(),
            };
            let packed = rmp_serde::to_vec(&record).map_err(|e| DataReadingError::ParseFailure {
                run: self.index.run_id.clone(),
                context: format!("encoding scan at rt {}: {}", rt, e),
            })?;
            let compressed = zstd::encode_all(packed.as_slice(), self.compression_level)?;
            self.file.write_all(&compressed)?;
            self.pos += compressed.len() as u64;
        }
        let block = BlockIndex {
            level,
            window,
            start_ptr,
            end_ptr: self.pos,
            rts: spectra.rts().to_vec(),
            scan_ptrs,
        };
        match level {
            MsLevel::Ms1 => self.index.ms1 = Some(block),
            MsLevel::Ms2 => self.index.ms2.push(block),
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<ArchiveIndex, DataReadingError> {
        self.index
            .ms2
            .sort_by(|a, b| a.window_start().total_cmp(&b.window_start()));
        let index_offset = self.pos;
        let index_bytes =
            serde_json::to_vec(&self.index).map_err(|e| DataReadingError::ParseFailure {
                run: self.index.run_id.clone(),
                context: format!("encoding archive index: {}", e),
            })?;
        self.file.write_all(&index_bytes)?;
        self.file.seek(SeekFrom::Start(MAGIC.len() as u64))?;
        self.file.write_all(&index_offset.to_le_bytes())?;
        self.file.flush()?;
        info!(
            "Wrote run archive {} with {} MS2 blocks to {}",
            self.index.run_id,
            self.index.ms2.len(),
            self.path.display()
        );
        Ok(self.index)
    }
}

/// Reader side of the archive. Holds only the index; scans are read on demand.
#[derive(Debug, Clone)]
pub struct RunArchive {
    path: PathBuf,
    index: ArchiveIndex,
    /// Offset of the JSON index, the end of the scan records.
    data_end: u64,
}

impl RunArchive {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DataReadingError> {
        let path = path.as_ref().to_path_buf();
        let missing = |context: String| DataReadingError::MissingIndex {
            run: path.display().to_string(),
            context,
        };
        let mut file = File::open(&path).map_err(|e| DataReadingError::Io {
            source: e,
            path: Some(path.clone()),
        })?;
        let mut header = [0u8; HEADER_LEN as usize];
        file.read_exact(&mut header)
            .map_err(|e| missing(format!("reading header: {}", e)))?;
        if &header[..8] != MAGIC {
            return Err(missing("not a run archive (bad magic)".into()));
        }
        let mut offset_bytes = [0u8; 8];
        offset_bytes.copy_from_slice(&header[8..]);
        let index_offset = u64::from_le_bytes(offset_bytes);
        if index_offset < HEADER_LEN {
            return Err(missing("archive was not finished".into()));
        }
        file.seek(SeekFrom::Start(index_offset))?;
        let mut index_bytes = Vec::new();
        file.read_to_end(&mut index_bytes)?;
        let index: ArchiveIndex = serde_json::from_slice(&index_bytes)
            .map_err(|e| missing(format!("decoding index: {}", e)))?;
        debug!(
            "Opened archive {} with {} MS2 blocks",
            index.run_id,
            index.ms2.len()
        );
        Ok(Self {
            path,
            index,
            data_end: index_offset,
        })
    }

    pub fn index(&self) -> &ArchiveIndex {
        &self.index
    }

    fn read_span(&self, start: u64, end: u64) -> Result<Vec<u8>, DataReadingError> {
        let mut file = File::open(&self.path).map_err(|e| DataReadingError::Io {
            source: e,
            path: Some(self.path.clone()),
        })?;
        file.seek(SeekFrom::Start(start))?;
        if start > end || end > self.data_end {
            return Err(self.parse_failure(format!(
                "bytes {}..{} outside of the scan records (ending at {})",
                start, end, self.data_end
            )));
        }
        let mut buf = vec![0u8; (end - start) as usize];
        file.read_exact(&mut buf)
            .map_err(|e| self.parse_failure(format!("reading bytes {}..{}: {}", start, end, e)))?;
        Ok(buf)
    }

    fn parse_failure(&self, context: String) -> DataReadingError {
        DataReadingError::ParseFailure {
            run: self.index.run_id.clone(),
            context,
        }
    }

    /// Pointers must be ascending and lie inside `[start_ptr, end_ptr]`,
    /// which itself must lie inside the scan records.
    fn check_block(&self, index: &BlockIndex) -> Result<(), DataReadingError> {
        if index.scan_ptrs.len() != index.rts.len() {
            return Err(self.parse_failure("block index has mismatched scan pointers".into()));
        }
        if index.start_ptr < HEADER_LEN
            || index.start_ptr > index.end_ptr
            || index.end_ptr > self.data_end
        {
            return Err(self.parse_failure(format!(
                "block span {}..{} outside of the scan records",
                index.start_ptr, index.end_ptr
            )));
        }
        let mut prev = index.start_ptr;
        for (i, &ptr) in index.scan_ptrs.iter().enumerate() {
            if ptr < prev || ptr > index.end_ptr {
                return Err(self.parse_failure(format!("scan pointer {} out of order", i)));
            }
            prev = ptr;
        }
        Ok(())
    }

    fn decode_scans(
        &self,
        index: &BlockIndex,
        range: Range<usize>,
    ) -> Result<SpectraMap, DataReadingError> {
        self.check_block(index)?;
        if range.end > index.num_scans() {
            return Err(self.parse_failure(format!(
                "scan range {:?} beyond {} scans",
                range,
                index.num_scans()
            )));
        }
        let (span_start, span_end) = index.pointer_span(&range);
        let bytes = self.read_span(span_start, span_end)?;
        let offset = |ptr: u64| {
            ptr.checked_sub(span_start)
                .map(|x| x as usize)
                .ok_or_else(|| self.parse_failure(format!("pointer {} before span", ptr)))
        };

        let mut rts = Vec::with_capacity(range.len());
        let mut spectra = Vec::with_capacity(range.len());
        for i in range {
            let start = offset(index.scan_ptrs[i])?;
            let end = offset(index.scan_ptrs.get(i + 1).copied().unwrap_or(index.end_ptr))?;
            let frame = bytes
                .get(start..end)
                .ok_or_else(|| self.parse_failure(format!("scan {} outside of block", i)))?;
            let packed = zstd::decode_all(frame)
                .map_err(|e| self.parse_failure(format!("decompressing scan {}: {}", i, e)))?;
            let record: ScanRecord = rmp_serde::from_slice(&packed)
                .map_err(|e| self.parse_failure(format!("decoding scan {}: {}", i, e)))?;
            let spectrum = Spectrum::try_new(record.mz, record.intensity)
                .map_err(|e| self.parse_failure(format!("scan {}: {:?}", i, e)))?;
            rts.push(record.rt);
            spectra.push(spectrum);
        }
        SpectraMap::try_new(rts, spectra).map_err(|e| self.parse_failure(format!("{:?}", e)))
    }
}

impl SpectraProvider for RunArchive {
    fn run_id(&self) -> &str {
        &self.index.run_id
    }

    fn ms1_index(&self) -> Result<&BlockIndex, DataReadingError> {
        self.index
            .ms1
            .as_ref()
            .ok_or_else(|| DataReadingError::MissingIndex {
                run: self.index.run_id.clone(),
                context: "archive has no MS1 block".into(),
            })
    }

    fn ms2_indices(&self) -> &[BlockIndex] {
        &self.index.ms2
    }

    fn read_block(&self, index: &BlockIndex) -> Result<SpectraMap, DataReadingError> {
        self.decode_scans(index, 0..index.num_scans())
    }

    fn read_block_rt_range(
        &self,
        index: &BlockIndex,
        rt_start: f32,
        rt_end: f32,
    ) -> Result<SpectraMap, DataReadingError> {
        self.decode_scans(index, index.scan_range(rt_start, rt_end))
    }
}
