//! Merges per-fragment ion peaks into peptide level peak groups.
//!
//! Seeds are ion peaks in descending apex intensity. A seed's span is
//! supported by every fragment that has an unused ion peak with its apex
//! inside the span, and it becomes a group when strictly more than half of
//! the contributing fragments (those with any ion peak) support it.
//! Accepted groups may not overlap; on conflict the group with the larger
//! summed intensity wins.

use super::chromatogram_picker::IonPeak;
use super::{
    FeatureFinderKind,
    PeakParams,
};
use crate::scoring::ScoreVector;
use serde::Serialize;
use swathquery::Chromatogram;

/// A candidate elution event of one peptide across its fragment traces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeakGroup {
    pub left_rt: f32,
    pub right_rt: f32,
    pub apex_rt: f32,
    pub left_index: usize,
    pub right_index: usize,
    pub apex_index: usize,
    /// Summed raw intensity of each fragment trace inside the group bounds,
    /// in chromatogram trace order.
    pub fragment_intensities: Vec<f32>,
    pub total_intensity: f64,
    pub supporting_fragments: usize,
    pub ions_low: u16,
    pub ions_high: u16,
    pub scores: ScoreVector,
}

impl PeakGroup {
    pub fn overlaps(&self, other: &PeakGroup) -> bool {
        self.left_index <= other.right_index && other.left_index <= self.right_index
    }
}

#[derive(Debug, Clone)]
pub struct FeatureFinder {
    kind: FeatureFinderKind,
    max_features: usize,
}

impl FeatureFinder {
    pub fn new(params: &PeakParams) -> Self {
        Self {
            kind: params.feature_finder,
            max_features: params.max_features,
        }
    }

    /// Groups of one chromatogram, highest total intensity first.
    ///
    /// `ion_peaks[i]` holds the peaks of the chromatogram's trace `i`. An
    /// empty result means no span had majority support.
    pub fn find(&self, chromatogram: &Chromatogram, ion_peaks: &[Vec<IonPeak>]) -> Vec<PeakGroup> {
        let contributing = ion_peaks.iter().filter(|p| !p.is_empty()).count();
        if contributing == 0 || self.max_features == 0 {
            return Vec::new();
        }

        let reference = reference_trace(chromatogram);
        let mut seeds: Vec<(usize, usize)> = ion_peaks
            .iter()
            .enumerate()
            .filter(|(frag, _)| match self.kind {
                FeatureFinderKind::Consensus => true,
                FeatureFinderKind::ReferenceGuided => Some(*frag) == reference,
            })
            .flat_map(|(frag, peaks)| (0..peaks.len()).map(move |p| (frag, p)))
            .collect();
        seeds.sort_by(|a, b| {
            let pa = &ion_peaks[a.0][a.1];
            let pb = &ion_peaks[b.0][b.1];
            pb.apex_intensity
                .total_cmp(&pa.apex_intensity)
                .then(a.0.cmp(&b.0))
                .then(pa.apex_index.cmp(&pb.apex_index))
        });

        let mut used: Vec<Vec<bool>> = ion_peaks.iter().map(|p| vec![false; p.len()]).collect();
        let mut candidates = Vec::new();
        for (frag, idx) in seeds {
            if used[frag][idx] {
                continue;
            }
            let seed = ion_peaks[frag][idx];
            used[frag][idx] = true;

            let mut support = vec![(frag, idx)];
            for (other, peaks) in ion_peaks.iter().enumerate() {
                if other == frag {
                    continue;
                }
                let best = peaks
                    .iter()
                    .enumerate()
                    .filter(|(j, p)| !used[other][*j] && seed.contains_index(p.apex_index))
                    .max_by(|a, b| a.1.apex_intensity.total_cmp(&b.1.apex_intensity));
                if let Some((j, _)) = best {
                    support.push((other, j));
                }
            }

            if support.len() * 2 > contributing {
                for &(f, j) in support.iter() {
                    used[f][j] = true;
                }
                candidates.push(self.build_group(chromatogram, &seed, support.len()));
            }
        }

        candidates.sort_by(|a, b| b.total_intensity.total_cmp(&a.total_intensity));
        let mut accepted: Vec<PeakGroup> = Vec::new();
        for cand in candidates {
            if accepted.len() >= self.max_features {
                break;
            }
            if accepted.iter().all(|g| !g.overlaps(&cand)) {
                accepted.push(cand);
            }
        }
        accepted
    }

    fn build_group(&self, chromatogram: &Chromatogram, seed: &IonPeak, supporting: usize) -> PeakGroup {
        let (left, right) = (seed.left_index, seed.right_index);
        let fragment_intensities: Vec<f32> = chromatogram
            .traces()
            .iter()
            .map(|t| t.intensities[left..=right].iter().map(|&x| x as f64).sum::<f64>() as f32)
            .collect();
        let total_intensity = fragment_intensities.iter().map(|&x| x as f64).sum();

        // Apex of the summed trace inside the bounds.
        let mut apex = left;
        let mut apex_sum = f64::MIN;
        for k in left..=right {
            let s: f64 = chromatogram
                .traces()
                .iter()
                .map(|t| t.intensities[k] as f64)
                .sum();
            if s > apex_sum {
                apex_sum = s;
                apex = k;
            }
        }

        let (ions_low, ions_high) = match chromatogram.ion_counts() {
            Some(counts) => (counts.low[apex], counts.high[apex]),
            None => (0, 0),
        };

        let rts = chromatogram.rts();
        PeakGroup {
            left_rt: rts[left],
            right_rt: rts[right],
            apex_rt: rts[apex],
            left_index: left,
            right_index: right,
            apex_index: apex,
            fragment_intensities,
            total_intensity,
            supporting_fragments: supporting,
            ions_low,
            ions_high,
            scores: ScoreVector::default(),
        }
    }
}

/// Trace with the largest library intensity, the first one on ties.
fn reference_trace(chromatogram: &Chromatogram) -> Option<usize> {
    chromatogram
        .traces()
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, t)| match best {
            Some((_, top)) if top >= t.library_intensity => best,
            _ => Some((i, t.library_intensity)),
        })
        .map(|(i, _)| i)
}
