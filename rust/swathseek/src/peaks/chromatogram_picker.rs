use super::max_peak::{
    local_maxima,
    MaxPeak,
};

/// A candidate elution peak of a single fragment trace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IonPeak {
    pub left_index: usize,
    pub right_index: usize,
    pub apex_index: usize,
    pub left_rt: f32,
    pub right_rt: f32,
    pub apex_rt: f32,
    /// Raw intensity at the apex.
    pub apex_intensity: f32,
}

impl IonPeak {
    pub fn contains_index(&self, index: usize) -> bool {
        self.left_index <= index && index <= self.right_index
    }
}

/// Every local maximum of `smoothed` whose wide SNR reaches `min_snr`,
/// bounded by the nearest local minima on each side.
///
/// The reference peak is always represented: when no picked peak spans its
/// apex it is added with its own bounds. Output is sorted by apex index.
pub fn pick_chromatogram(
    rts: &[f32],
    raw: &[f32],
    smoothed: &[f32],
    wide_snr: &[f32],
    min_snr: f32,
    reference: Option<&MaxPeak>,
) -> Vec<IonPeak> {
    let n = smoothed.len();
    let mut peaks: Vec<IonPeak> = local_maxima(smoothed)
        .filter(|&i| wide_snr[i] >= min_snr)
        .map(|apex| {
            let mut left = apex;
            while left > 0 && smoothed[left - 1] < smoothed[left] {
                left -= 1;
            }
            let mut right = apex;
            while right + 1 < n && smoothed[right + 1] < smoothed[right] {
                right += 1;
            }
            IonPeak {
                left_index: left,
                right_index: right,
                apex_index: apex,
                left_rt: rts[left],
                right_rt: rts[right],
                apex_rt: rts[apex],
                apex_intensity: raw[apex],
            }
        })
        .collect();

    if let Some(reference) = reference {
        if !peaks.iter().any(|p| p.contains_index(reference.apex_index)) {
            peaks.push(IonPeak {
                left_index: reference.left_index,
                right_index: reference.right_index,
                apex_index: reference.apex_index,
                left_rt: reference.left_rt,
                right_rt: reference.right_rt,
                apex_rt: reference.apex_rt,
                apex_intensity: raw[reference.apex_index],
            });
            peaks.sort_by_key(|p| p.apex_index);
        }
    }
    peaks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peaks_split_at_minima() {
        let rts: Vec<f32> = (0..9).map(|i| i as f32).collect();
        let smoothed = vec![0.0, 2.0, 5.0, 2.0, 1.0, 3.0, 9.0, 3.0, 0.0];
        let raw = vec![0.0, 1.0, 6.0, 1.0, 1.0, 2.0, 10.0, 2.0, 0.0];
        let snr = vec![10.0; 9];
        let peaks = pick_chromatogram(&rts, &raw, &smoothed, &snr, 1.0, None);
        assert_eq!(peaks.len(), 2);
        assert_eq!((peaks[0].left_index, peaks[0].right_index), (0, 4));
        assert_eq!((peaks[1].left_index, peaks[1].right_index), (4, 8));
        assert_eq!(peaks[1].apex_intensity, 10.0);
    }

    #[test]
    fn test_reference_is_kept() {
        let rts: Vec<f32> = (0..5).map(|i| i as f32).collect();
        let smoothed = vec![0.0, 2.0, 5.0, 2.0, 0.0];
        let raw = smoothed.clone();
        // Wide SNR too low to pick anything on its own.
        let snr = vec![0.1; 5];
        let reference = MaxPeak {
            apex_index: 2,
            left_index: 1,
            right_index: 3,
            apex_rt: 2.0,
            left_rt: 1.0,
            right_rt: 3.0,
            apex_intensity: 5.0,
        };
        let peaks = pick_chromatogram(&rts, &raw, &smoothed, &snr, 1.0, Some(&reference));
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].apex_index, 2);
        assert_eq!(peaks[0].left_index, 1);
    }
}
