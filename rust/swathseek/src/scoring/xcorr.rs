//! Cross-correlation based shape and co-elution scores over a feature span.

use crate::errors::Result;
use crate::utils::correlation::{
    mean_std,
    xcorr_max,
};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct XcorrScores {
    pub coelution: f64,
    pub coelution_weighted: f64,
    pub shape: f64,
    pub shape_weighted: f64,
}

/// `traces[i]` is fragment `i` restricted to the feature span and
/// `weights[i]` its normalized library intensity.
///
/// Flat traces have no defined correlation; they add nothing to the shape
/// scores and are left out of the lag statistics.
pub fn xcorr_scores(traces: &[Vec<f64>], weights: &[f64]) -> Result<XcorrScores> {
    let mut out = XcorrScores::default();
    if traces.is_empty() {
        return Ok(out);
    }

    let len = traces[0].len();
    let mut consensus = vec![0.0; len];
    for t in traces {
        for (c, v) in consensus.iter_mut().zip(t.iter()) {
            *c += v;
        }
    }

    let mut shape_sum = 0.0;
    for (t, w) in traces.iter().zip(weights.iter()) {
        if let Some((val, _)) = xcorr_max(t, &consensus)? {
            shape_sum += val;
            out.shape_weighted += val * w;
        }
    }
    out.shape = shape_sum / traces.len() as f64;

    let mut lags = Vec::with_capacity(traces.len() * (traces.len() + 1) / 2);
    for i in 0..traces.len() {
        for j in i..traces.len() {
            if let Some((_, lag)) = xcorr_max(&traces[i], &traces[j])? {
                let lag = lag.unsigned_abs() as f64;
                lags.push(lag);
                let pair_weight = weights[i] * weights[j];
                out.coelution_weighted += if i == j {
                    lag * pair_weight
                } else {
                    2.0 * lag * pair_weight
                };
            }
        }
    }
    let (mean, std) = mean_std(&lags);
    out.coelution = mean + std;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gaussian(n: usize, center: f64, scale: f64) -> Vec<f64> {
        (0..n)
            .map(|i| scale * (-((i as f64 - center).powi(2)) / 8.0).exp())
            .collect()
    }

    #[test]
    fn test_perfect_coelution() {
        let traces = vec![
            gaussian(21, 10.0, 100.0),
            gaussian(21, 10.0, 50.0),
            gaussian(21, 10.0, 10.0),
        ];
        let weights = vec![0.6, 0.3, 0.1];
        let s = xcorr_scores(&traces, &weights).unwrap();
        assert!((s.shape - 1.0).abs() < 1e-9);
        assert!((s.shape_weighted - 1.0).abs() < 1e-9);
        assert_eq!(s.coelution, 0.0);
        assert_eq!(s.coelution_weighted, 0.0);
    }

    #[test]
    fn test_shifted_trace_is_penalized() {
        let traces = vec![gaussian(21, 8.0, 100.0), gaussian(21, 12.0, 100.0)];
        let weights = vec![0.5, 0.5];
        let s = xcorr_scores(&traces, &weights).unwrap();
        assert!(s.coelution > 0.0);
        // Single off-diagonal pair with lag 4, counted twice.
        assert!((s.coelution_weighted - 2.0 * 4.0 * 0.25).abs() < 1e-9);
        assert!(s.shape < 1.0);
    }
}
