//! Least squares linear discriminant over score vectors.

use crate::errors::LearningError;
use crate::scoring::{
    ScoreType,
    ScoreVector,
    WeightVector,
};
use nalgebra::{
    DMatrix,
    DVector,
};

/// Relative threshold under which singular values are treated as zero.
const SINGULAR_VALUE_RTOL: f64 = 1e-12;

/// Score types that are fit, every measured score except `exclude`.
///
/// The combined scores are never fit since they are linear in the others.
pub fn fit_columns(exclude: ScoreType) -> Vec<ScoreType> {
    ScoreType::ALL
        .into_iter()
        .filter(|t| !t.is_combined() && *t != exclude)
        .collect()
}

/// Solves `X w = y` with `y = 1` for positives and `0` for negatives, using
/// the SVD pseudo-inverse.
///
/// `exclude` and the combined scores get weight 0.
pub fn fit_weights(
    positives: &[ScoreVector],
    negatives: &[ScoreVector],
    exclude: ScoreType,
) -> Result<WeightVector, LearningError> {
    if positives.is_empty() || negatives.is_empty() {
        return Err(LearningError::DegenerateTrainingSet {
            context: format!(
                "fit needs both classes, got {} positives and {} negatives",
                positives.len(),
                negatives.len()
            ),
        });
    }
    let columns = fit_columns(exclude);
    let nrows = positives.len() + negatives.len();
    let x = DMatrix::from_fn(nrows, columns.len(), |r, c| {
        let row = if r < positives.len() {
            &positives[r]
        } else {
            &negatives[r - positives.len()]
        };
        row[columns[c]]
    });
    let y = DVector::from_fn(nrows, |r, _| if r < positives.len() { 1.0 } else { 0.0 });

    let svd = x.svd(true, true);
    let eps = svd.singular_values.max() * SINGULAR_VALUE_RTOL;
    let solution = svd
        .solve(&y, eps)
        .map_err(|e| LearningError::SingularFit {
            context: e.to_string(),
        })?;

    let mut weights = WeightVector::default();
    for (c, t) in columns.iter().enumerate() {
        weights[*t] = solution[c];
    }
    if !weights.is_finite() {
        return Err(LearningError::SingularFit {
            context: "non finite weight in the solution".into(),
        });
    }
    Ok(weights)
}
