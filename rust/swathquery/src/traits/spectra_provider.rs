use crate::errors::DataReadingError;
use crate::models::SpectraMap;
use serde::{
    Deserialize,
    Serialize,
};
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MsLevel {
    #[serde(rename = "ms1")]
    Ms1,
    #[serde(rename = "ms2")]
    Ms2,
}

/// Location of one block of scans (one MS level, one isolation window).
///
/// `start_ptr..end_ptr` spans the whole block in the provider's storage and
/// `scan_ptrs[i]` is where scan `i` starts; scan `i` ends where scan `i + 1`
/// starts (or at `end_ptr` for the last one).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockIndex {
    pub level: MsLevel,
    /// Isolation window (lower, upper) m/z, absent for MS1.
    pub window: Option<(f64, f64)>,
    pub start_ptr: u64,
    pub end_ptr: u64,
    pub rts: Vec<f32>,
    pub scan_ptrs: Vec<u64>,
}

impl BlockIndex {
    pub fn isolation_contains(&self, mz: f64) -> bool {
        match self.window {
            Some((lo, hi)) => mz >= lo && mz < hi,
            None => false,
        }
    }

    /// Lower isolation bound, used to order blocks.
    pub fn window_start(&self) -> f64 {
        self.window.map(|w| w.0).unwrap_or(f64::MIN)
    }

    /// Scans whose RT falls in `[rt_start, rt_end]`.
    pub fn scan_range(&self, rt_start: f32, rt_end: f32) -> Range<usize> {
        let lo = self.rts.partition_point(|&x| x < rt_start);
        let hi = self.rts.partition_point(|&x| x <= rt_end);
        lo..hi.max(lo)
    }

    /// Storage span `[start, end)` of the scans in `range`.
    pub fn pointer_span(&self, range: &Range<usize>) -> (u64, u64) {
        if range.is_empty() {
            return (self.start_ptr, self.start_ptr);
        }
        let start = self.scan_ptrs[range.start];
        let end = self
            .scan_ptrs
            .get(range.end)
            .copied()
            .unwrap_or(self.end_ptr);
        (start, end)
    }

    pub fn num_scans(&self) -> usize {
        self.rts.len()
    }
}

/// Source of RT-ordered spectra for one run.
///
/// Reads are the only I/O the analysis performs; every failure surfaces as a
/// [`DataReadingError`] and aborts the run.
pub trait SpectraProvider {
    fn run_id(&self) -> &str;

    /// The run-wide MS1 block.
    fn ms1_index(&self) -> Result<&BlockIndex, DataReadingError>;

    /// MS2 blocks, one per isolation window, sorted by lower window bound.
    fn ms2_indices(&self) -> &[BlockIndex];

    /// Reads every scan between the block's start and end pointers.
    fn read_block(&self, index: &BlockIndex) -> Result<SpectraMap, DataReadingError>;

    /// Reads only the scans of the block with RT in `[rt_start, rt_end]`.
    fn read_block_rt_range(
        &self,
        index: &BlockIndex,
        rt_start: f32,
        rt_end: f32,
    ) -> Result<SpectraMap, DataReadingError>;

    /// The MS2 block whose isolation window holds `precursor_mz`.
    fn ms2_index_for(&self, precursor_mz: f64) -> Result<&BlockIndex, DataReadingError> {
        self.ms2_indices()
            .iter()
            .find(|b| b.isolation_contains(precursor_mz))
            .ok_or_else(|| DataReadingError::MissingIndex {
                run: self.run_id().to_string(),
                context: format!("no MS2 isolation window holds m/z {}", precursor_mz),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block() -> BlockIndex {
        BlockIndex {
            level: MsLevel::Ms2,
            window: Some((400.0, 425.0)),
            start_ptr: 100,
            end_ptr: 400,
            rts: vec![1.0, 2.0, 3.0],
            scan_ptrs: vec![100, 200, 300],
        }
    }

    #[test]
    fn test_pointer_span() {
        let b = block();
        assert_eq!(b.pointer_span(&(0..3)), (100, 400));
        assert_eq!(b.pointer_span(&(1..2)), (200, 300));
        let range = b.scan_range(1.5, 10.0);
        assert_eq!(range, 1..3);
        assert_eq!(b.pointer_span(&range), (200, 400));
        assert!(b.scan_range(5.0, 6.0).is_empty());
    }

    #[test]
    fn test_isolation_bounds() {
        let b = block();
        assert!(b.isolation_contains(400.0));
        assert!(!b.isolation_contains(425.0));
    }
}
