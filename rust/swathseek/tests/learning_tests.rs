use rand::{
    Rng,
    SeedableRng,
};
use rand_chacha::ChaCha8Rng;
use swathseek::errors::LearningError;
use swathseek::ml::{
    count_identified,
    Classifier,
    LearningParams,
    PeptideScores,
    SemiSupervisedLearner,
};
use swathseek::scoring::{
    ScoreType,
    ScoreVector,
    WeightVector,
};

const USED: [ScoreType; 4] = [
    ScoreType::XcorrShape,
    ScoreType::LibraryCorr,
    ScoreType::LogSnScore,
    ScoreType::YseriesScore,
];

fn decoy_vector(rng: &mut ChaCha8Rng) -> ScoreVector {
    let mut v = ScoreVector::default();
    v[ScoreType::XcorrShape] = 0.3 + rng.gen_range(-0.05..0.05);
    v[ScoreType::LibraryCorr] = 0.1 + rng.gen_range(-0.05..0.05);
    v[ScoreType::LogSnScore] = 1.0 + rng.gen_range(-0.2..0.2);
    v[ScoreType::YseriesScore] = 1.0 + rng.gen_range(-0.5..0.5);
    v
}

fn target_vector(rng: &mut ChaCha8Rng) -> ScoreVector {
    let ideal = ScoreVector::ideal_target();
    let base = decoy_vector(rng);
    let mut v = ScoreVector::default();
    for t in USED {
        v[t] = 0.8 * ideal[t] + 0.2 * base[t];
    }
    v
}

fn dataset(n: usize, seed: u64) -> Vec<PeptideScores> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut out = Vec::new();
    for i in 0..n {
        out.push(PeptideScores {
            peptide_ref: format!("P{}", i),
            is_decoy: false,
            features: vec![target_vector(&mut rng), decoy_vector(&mut rng)],
        });
        out.push(PeptideScores {
            peptide_ref: format!("P{}", i),
            is_decoy: true,
            features: vec![decoy_vector(&mut rng), decoy_vector(&mut rng)],
        });
    }
    out
}

#[test]
fn test_learning_separates_targets() {
    let data = dataset(40, 3);
    let learner = SemiSupervisedLearner::new(LearningParams::default());
    let weights = learner.learn(&data).unwrap();
    assert!(weights.is_finite());
    assert_eq!(weights[ScoreType::InitScore], 0.0);
    assert_eq!(weights[ScoreType::WeightedTotalScore], 0.0);
    assert!(count_identified(&data, &weights, 0.01) >= 30);
}

#[test]
fn test_learning_is_reproducible() {
    let data = dataset(30, 11);
    let learner = SemiSupervisedLearner::new(LearningParams::default());
    let a = learner.learn(&data).unwrap();
    let b = learner.learn(&data).unwrap();
    for t in ScoreType::ALL {
        assert!((a[t] - b[t]).abs() < 1e-9, "{:?} differs", t);
    }
}

#[test]
fn test_every_trial_failing_is_reported() {
    // Identical features: every target ties with the decoys ranked above it.
    let data: Vec<PeptideScores> = (0..10)
        .map(|i| PeptideScores {
            peptide_ref: format!("P{}", i),
            is_decoy: i % 2 == 0,
            features: vec![ScoreVector::default()],
        })
        .collect();
    let learner = SemiSupervisedLearner::new(LearningParams::default());
    assert_eq!(
        learner.learn(&data),
        Err(LearningError::AllTrialsFailed { trials: 10 })
    );
}

#[test]
fn test_all_decoy_input_fails_before_trials() {
    let mut data = dataset(5, 1);
    data.retain(|p| p.is_decoy);
    let learner = SemiSupervisedLearner::new(LearningParams::default());
    assert!(matches!(
        learner.learn(&data),
        Err(LearningError::DegenerateTrainingSet { .. })
    ));
}

#[test]
fn test_prior_classifier_skips_learning() {
    let data = dataset(5, 1);
    let learner = SemiSupervisedLearner::new(LearningParams {
        classifier: Classifier::Prior,
        ..LearningParams::default()
    });
    assert_eq!(learner.learn(&data).unwrap(), WeightVector::prior());
}
