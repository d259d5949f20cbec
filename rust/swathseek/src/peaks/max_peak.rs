use super::PeakParams;

/// The dominant peak of one fragment trace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaxPeak {
    pub apex_index: usize,
    pub left_index: usize,
    pub right_index: usize,
    pub apex_rt: f32,
    pub left_rt: f32,
    pub right_rt: f32,
    /// Smoothed intensity at the apex.
    pub apex_intensity: f32,
}

/// Scans that are local maxima of `smoothed`. On plateaus the last scan of
/// the plateau is the maximum.
pub(crate) fn local_maxima(smoothed: &[f32]) -> impl Iterator<Item = usize> + '_ {
    let n = smoothed.len();
    (0..n).filter(move |&i| {
        let y = smoothed[i];
        y > 0.0 && (i == 0 || y >= smoothed[i - 1]) && (i + 1 == n || y > smoothed[i + 1])
    })
}

/// Picks the most intense local maximum with `snr >= min_snr`.
///
/// Bounds extend outwards while the smoothed trace keeps decreasing and
/// the SNR stays at or above `boundary_snr`.
pub fn pick_max_peak(
    rts: &[f32],
    smoothed: &[f32],
    snr: &[f32],
    params: &PeakParams,
) -> Option<MaxPeak> {
    debug_assert_eq!(rts.len(), smoothed.len());
    debug_assert_eq!(rts.len(), snr.len());
    let apex = local_maxima(smoothed)
        .filter(|&i| snr[i] >= params.min_snr)
        .max_by(|&a, &b| smoothed[a].total_cmp(&smoothed[b]).then(b.cmp(&a)))?;

    let mut left = apex;
    while left > 0
        && smoothed[left - 1] < smoothed[left]
        && snr[left - 1] >= params.boundary_snr
    {
        left -= 1;
    }
    let mut right = apex;
    while right + 1 < smoothed.len()
        && smoothed[right + 1] < smoothed[right]
        && snr[right + 1] >= params.boundary_snr
    {
        right += 1;
    }

    Some(MaxPeak {
        apex_index: apex,
        left_index: left,
        right_index: right,
        apex_rt: rts[apex],
        left_rt: rts[left],
        right_rt: rts[right],
        apex_intensity: smoothed[apex],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_most_intense_max_wins() {
        let rts: Vec<f32> = (0..9).map(|i| i as f32).collect();
        let smoothed = vec![0.0, 2.0, 5.0, 2.0, 0.0, 3.0, 9.0, 3.0, 0.0];
        let snr = smoothed.clone();
        let peak = pick_max_peak(&rts, &smoothed, &snr, &PeakParams::default()).unwrap();
        assert_eq!(peak.apex_index, 6);
        assert_eq!(peak.left_index, 5);
        assert_eq!(peak.right_index, 7);
        assert_eq!(peak.apex_rt, 6.0);
    }

    #[test]
    fn test_snr_floor_rejects() {
        let rts: Vec<f32> = (0..5).map(|i| i as f32).collect();
        let smoothed = vec![0.0, 2.0, 5.0, 2.0, 0.0];
        let snr = vec![0.0, 0.2, 0.5, 0.2, 0.0];
        assert!(pick_max_peak(&rts, &smoothed, &snr, &PeakParams::default()).is_none());
        assert!(pick_max_peak(&rts, &[0.0; 5], &[0.0; 5], &PeakParams::default()).is_none());
    }
}
