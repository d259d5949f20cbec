use serde::{
    Deserialize,
    Serialize,
};

/// Lowest noise level a scan can have, in intensity units.
pub const NOISE_FLOOR: f32 = 1.0;

/// Median based local signal to noise.
///
/// The noise at scan `i` is the median of the trace over `window` scans
/// centred on `i`, clipped at the trace edges. Traces shorter than
/// `min_scans` use the median of the whole trace instead.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SnrEstimator {
    pub window: usize,
    pub min_scans: usize,
}

impl SnrEstimator {
    /// Profile used on the smoothed trace for the max peak boundaries.
    pub const fn fine() -> Self {
        Self {
            window: 67,
            min_scans: 30,
        }
    }

    /// Profile used on the raw trace for picking and the S/N score.
    pub const fn wide() -> Self {
        Self {
            window: 333,
            min_scans: 30,
        }
    }

    pub fn estimate(&self, intensities: &[f32]) -> Vec<f32> {
        let mut scratch = Vec::new();
        let mut out = Vec::with_capacity(intensities.len());
        self.estimate_into(intensities, &mut scratch, &mut out);
        out
    }

    /// Writes the SNR of every scan into `out`, `scratch` is reused for the
    /// median selection.
    pub fn estimate_into(&self, intensities: &[f32], scratch: &mut Vec<f32>, out: &mut Vec<f32>) {
        out.clear();
        let n = intensities.len();
        if n == 0 {
            return;
        }
        out.reserve(n);

        if n < self.min_scans || self.window <= 1 {
            let noise = median_into(intensities, scratch).max(NOISE_FLOOR);
            out.extend(intensities.iter().map(|&y| y / noise));
            return;
        }

        let half = self.window / 2;
        for (i, &y) in intensities.iter().enumerate() {
            let lo = i.saturating_sub(half);
            let hi = (i + half + 1).min(n);
            let noise = median_into(&intensities[lo..hi], scratch).max(NOISE_FLOOR);
            out.push(y / noise);
        }
    }
}

/// Median of `vals` (upper median for even lengths), 0 for empty input.
fn median_into(vals: &[f32], scratch: &mut Vec<f32>) -> f32 {
    if vals.is_empty() {
        return 0.0;
    }
    scratch.clear();
    scratch.extend_from_slice(vals);
    let mid = scratch.len() / 2;
    let (_, median, _) = scratch.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
    *median
}
