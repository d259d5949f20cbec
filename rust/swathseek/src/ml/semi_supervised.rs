//! Semi-supervised learning of the score weights.
//!
//! Each trial trains on a random half of the targets and decoys. The first
//! fit separates the decoys' best features from a synthetic ideal target,
//! later fits separate confidently identified targets from the decoys, with
//! the ranking recomputed from the weights of the previous iteration. The
//! surviving trials are averaged.

use super::lda::fit_weights;
use crate::errors::LearningError;
use crate::fdr::{
    assign_fdr,
    FdrEntry,
};
use crate::scoring::{
    ScoreType,
    ScoreVector,
    WeightVector,
};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{
    Deserialize,
    Serialize,
};
use tracing::{
    debug,
    info,
    warn,
};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum Classifier {
    #[default]
    #[serde(rename = "lda")]
    Lda,
    /// No learning, the prior weights are used as the dataset weights.
    #[serde(rename = "prior")]
    Prior,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LearningParams {
    pub classifier: Classifier,
    pub train_times: usize,
    pub xeval_num_iter: usize,
    pub ss_iteration_fdr: f64,
    pub progressive_rate: f64,
    pub train_fraction: f64,
    pub seed: u64,
    /// FDR at which each trial's identifications are reported.
    pub fdr: f64,
    /// Below this many peptides the small dataset settings apply.
    pub small_dataset_peptides: usize,
}

impl Default for LearningParams {
    fn default() -> Self {
        Self {
            classifier: Classifier::Lda,
            train_times: 10,
            xeval_num_iter: 5,
            ss_iteration_fdr: 0.05,
            progressive_rate: 0.9,
            train_fraction: 0.5,
            seed: 42,
            fdr: 0.01,
            small_dataset_peptides: 500,
        }
    }
}

impl LearningParams {
    /// Settings actually used for a dataset of `num_peptides` peptides.
    pub fn for_dataset(&self, num_peptides: usize) -> LearningParams {
        if num_peptides >= self.small_dataset_peptides {
            return *self;
        }
        LearningParams {
            xeval_num_iter: 10,
            ss_iteration_fdr: 0.02,
            progressive_rate: 0.8,
            ..*self
        }
    }
}

/// Score vectors of every feature of one peptide (target or decoy).
#[derive(Debug, Clone, PartialEq)]
pub struct PeptideScores {
    pub peptide_ref: String,
    pub is_decoy: bool,
    pub features: Vec<ScoreVector>,
}

impl PeptideScores {
    /// Index and score of the best feature under `score`, first one on ties.
    pub fn top_by(&self, score: impl Fn(&ScoreVector) -> f64) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (i, f) in self.features.iter().enumerate() {
            let s = score(f);
            match best {
                Some((_, b)) if b >= s => {}
                _ => best = Some((i, s)),
            }
        }
        best
    }

    pub fn top_combined(&self, weights: &WeightVector) -> Option<(usize, f64)> {
        self.top_by(|v| v.combine(weights))
    }
}

fn split_count(len: usize, fraction: f64) -> usize {
    if len == 0 {
        return 0;
    }
    ((len as f64 * fraction).round() as usize).clamp(1, len)
}

/// Targets whose top feature passes `fdr` (by q-value) and every decoy's
/// top feature, under `weights`.
fn select_training(
    peptides: &[&PeptideScores],
    weights: &WeightVector,
    fdr: f64,
) -> Result<(Vec<ScoreVector>, Vec<ScoreVector>), LearningError> {
    let mut entries: Vec<FdrEntry<ScoreVector>> = peptides
        .iter()
        .filter_map(|p| {
            p.top_combined(weights)
                .map(|(i, s)| FdrEntry::new(s, p.is_decoy, p.features[i]))
        })
        .collect();
    assign_fdr(&mut entries);

    let mut positives = Vec::new();
    let mut negatives = Vec::new();
    for e in entries {
        if e.is_decoy {
            negatives.push(e.meta);
        } else if matches!(e.q_value, Some(q) if q <= fdr) {
            positives.push(e.meta);
        }
    }
    if positives.is_empty() {
        return Err(LearningError::DegenerateTrainingSet {
            context: format!("no target passes {} FDR", fdr),
        });
    }
    Ok((positives, negatives))
}

/// Targets at or below `fdr` when every peptide is ranked by `weights`.
pub fn count_identified(data: &[PeptideScores], weights: &WeightVector, fdr: f64) -> usize {
    let mut entries: Vec<FdrEntry<()>> = data
        .iter()
        .filter_map(|p| p.top_combined(weights).map(|(_, s)| FdrEntry::new(s, p.is_decoy, ())))
        .collect();
    assign_fdr(&mut entries);
    entries
        .iter()
        .filter(|e| !e.is_decoy && matches!(e.fdr, Some(f) if f <= fdr))
        .count()
}

#[derive(Debug, Clone, Default)]
pub struct SemiSupervisedLearner {
    params: LearningParams,
}

impl SemiSupervisedLearner {
    pub fn new(params: LearningParams) -> Self {
        Self { params }
    }

    /// Learns the dataset weights.
    ///
    /// Fails up front when the data has no targets or no decoys with
    /// features, and with [`LearningError::AllTrialsFailed`] when no trial
    /// survives.
    pub fn learn(&self, data: &[PeptideScores]) -> Result<WeightVector, LearningError> {
        let num_targets = data.iter().filter(|p| !p.is_decoy && !p.features.is_empty()).count();
        let num_decoys = data.iter().filter(|p| p.is_decoy && !p.features.is_empty()).count();
        if num_targets == 0 || num_decoys == 0 {
            return Err(LearningError::DegenerateTrainingSet {
                context: format!(
                    "input has {} targets and {} decoys with features",
                    num_targets, num_decoys
                ),
            });
        }

        if self.params.classifier == Classifier::Prior {
            info!("Using prior weights, no learning");
            return Ok(WeightVector::prior());
        }

        let params = self.params.for_dataset(data.len());
        if params.xeval_num_iter != self.params.xeval_num_iter {
            info!(
                "Small dataset ({} peptides), using {} iterations at {} FDR",
                data.len(),
                params.xeval_num_iter,
                params.ss_iteration_fdr
            );
        }

        let survivors: Vec<WeightVector> = (0..params.train_times)
            .into_par_iter()
            .filter_map(|trial| match run_trial(&params, data, trial) {
                Ok(weights) => {
                    let n = count_identified(data, &weights, params.fdr);
                    info!("Trial {}: {} targets at {} FDR", trial, n, params.fdr);
                    Some(weights)
                }
                Err(e) => {
                    warn!("Trial {} dropped: {:?}", trial, e);
                    None
                }
            })
            .collect();

        info!(
            "{} of {} learning trials survived",
            survivors.len(),
            params.train_times
        );
        WeightVector::mean(&survivors).ok_or(LearningError::AllTrialsFailed {
            trials: params.train_times,
        })
    }
}

fn run_trial(
    params: &LearningParams,
    data: &[PeptideScores],
    trial: usize,
) -> Result<WeightVector, LearningError> {
    let mut rng = ChaCha8Rng::seed_from_u64(params.seed.wrapping_add(trial as u64));
    let (mut targets, mut decoys): (Vec<&PeptideScores>, Vec<&PeptideScores>) = data
        .iter()
        .filter(|p| !p.features.is_empty())
        .partition(|p| !p.is_decoy);
    targets.shuffle(&mut rng);
    decoys.shuffle(&mut rng);
    targets.truncate(split_count(targets.len(), params.train_fraction));
    decoys.truncate(split_count(decoys.len(), params.train_fraction));
    if targets.is_empty() || decoys.is_empty() {
        return Err(LearningError::DegenerateTrainingSet {
            context: "training split lacks targets or decoys".into(),
        });
    }

    let seed_negatives: Vec<ScoreVector> = decoys
        .iter()
        .filter_map(|p| {
            p.top_by(|v| v[ScoreType::InitScore])
                .map(|(i, _)| p.features[i])
        })
        .collect();
    let mut weights = fit_weights(
        &[ScoreVector::ideal_target()],
        &seed_negatives,
        ScoreType::InitScore,
    )?;

    let train: Vec<&PeptideScores> = targets.into_iter().chain(decoys).collect();
    for iteration in 0..params.xeval_num_iter {
        let (positives, negatives) = select_training(&train, &weights, params.ss_iteration_fdr)?;
        debug!(
            "Trial {} iteration {}: {} positives, {} negatives",
            trial,
            iteration,
            positives.len(),
            negatives.len()
        );
        let fitted = fit_weights(&positives, &negatives, ScoreType::WeightedTotalScore)?;
        weights = if iteration == 0 {
            fitted
        } else {
            fitted.blend(&weights, params.progressive_rate)
        };
    }
    Ok(weights)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_dataset_settings() {
        let params = LearningParams::default();
        let small = params.for_dataset(100);
        assert_eq!(small.xeval_num_iter, 10);
        assert_eq!(small.ss_iteration_fdr, 0.02);
        assert_eq!(small.progressive_rate, 0.8);
        assert_eq!(params.for_dataset(500), params);
    }

    #[test]
    fn test_split_count() {
        assert_eq!(split_count(0, 0.5), 0);
        assert_eq!(split_count(1, 0.5), 1);
        assert_eq!(split_count(10, 0.5), 5);
        assert_eq!(split_count(3, 0.01), 1);
    }

    #[test]
    fn test_all_target_input_is_rejected() {
        let data = vec![PeptideScores {
            peptide_ref: "A".into(),
            is_decoy: false,
            features: vec![ScoreVector::ideal_target()],
        }];
        let res = SemiSupervisedLearner::default().learn(&data);
        assert!(matches!(res, Err(LearningError::DegenerateTrainingSet { .. })));
    }

    #[test]
    fn test_top_by_keeps_first_on_ties() {
        let p = PeptideScores {
            peptide_ref: "A".into(),
            is_decoy: false,
            features: vec![ScoreVector::default(); 3],
        };
        assert_eq!(p.top_by(|_| 1.0), Some((0, 1.0)));
    }
}
