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

/// Spectra held in memory. Pointers are scan ordinals into one flat scan list.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRun {
    run_id: String,
    scans: Vec<(f32, Spectrum)>,
    ms1: Option<BlockIndex>,
    ms2: Vec<BlockIndex>,
}

impl InMemoryRun {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            ..Default::default()
        }
    }

    fn push_block(&mut self, level: MsLevel, window: Option<(f64, f64)>, map: SpectraMap) -> BlockIndex {
        let start_ptr = self.scans.len() as u64;
        let scan_ptrs = (0..map.len() as u64).map(|i| start_ptr + i).collect();
        let rts = map.rts().to_vec();
        self.scans
            .extend(map.iter().map(|(rt, spec)| (rt, spec.clone())));
        BlockIndex {
            level,
            window,
            start_ptr,
            end_ptr: self.scans.len() as u64,
            rts,
            scan_ptrs,
        }
    }

    pub fn with_ms1(mut self, map: SpectraMap) -> Self {
        let block = self.push_block(MsLevel::Ms1, None, map);
        self.ms1 = Some(block);
        self
    }

    pub fn with_ms2_block(mut self, window: (f64, f64), map: SpectraMap) -> Self {
        let block = self.push_block(MsLevel::Ms2, Some(window), map);
        self.ms2.push(block);
        self.ms2
            .sort_by(|a, b| a.window_start().total_cmp(&b.window_start()));
        self
    }

    fn slice(&self, start: u64, end: u64) -> Result<SpectraMap, DataReadingError> {
        let scans = self
            .scans
            .get(start as usize..end as usize)
            .ok_or_else(|| DataReadingError::MissingIndex {
                run: self.run_id.clone(),
                context: format!("pointers {}..{} out of range", start, end),
            })?;
        SpectraMap::try_new(
            scans.iter().map(|s| s.0).collect(),
            scans.iter().map(|s| s.1.clone()).collect(),
        )
        .map_err(|e| DataReadingError::ParseFailure {
            run: self.run_id.clone(),
            context: format!("{:?}", e),
        })
    }
}

impl SpectraProvider for InMemoryRun {
    fn run_id(&self) -> &str {
        &self.run_id
    }

    fn ms1_index(&self) -> Result<&BlockIndex, DataReadingError> {
        self.ms1.as_ref().ok_or_else(|| DataReadingError::MissingIndex {
            run: self.run_id.clone(),
            context: "no MS1 block".into(),
        })
    }

    fn ms2_indices(&self) -> &[BlockIndex] {
        &self.ms2
    }

    fn read_block(&self, index: &BlockIndex) -> Result<SpectraMap, DataReadingError> {
        self.slice(index.start_ptr, index.end_ptr)
    }

    fn read_block_rt_range(
        &self,
        index: &BlockIndex,
        rt_start: f32,
        rt_end: f32,
    ) -> Result<SpectraMap, DataReadingError> {
        let (start, end) = index.pointer_span(&index.scan_range(rt_start, rt_end));
        self.slice(start, end)
    }
}
