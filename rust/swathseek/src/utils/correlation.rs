use crate::errors::{
    DataProcessingError,
    Result,
};

fn check_same_len(a: usize, b: usize, context: &str) -> Result<()> {
    if a != b || a == 0 {
        return Err(DataProcessingError::ExpectedSlicesSameLength {
            expected: a,
            other: b,
            context: context.to_string(),
        }
        .into());
    }
    Ok(())
}

/// Mean and population standard deviation.
pub fn mean_std(vals: &[f64]) -> (f64, f64) {
    if vals.is_empty() {
        return (0.0, 0.0);
    }
    let n = vals.len() as f64;
    let mean = vals.iter().sum::<f64>() / n;
    let var = vals.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// Pearson correlation of two slices of the same size.
///
/// Returns NaN when either side has no variance.
///
/// # Example
///
/// ```
/// use swathseek::utils::correlation::pearson;
///
/// let a = vec![1.0, 2.0, 3.0];
/// let b = vec![2.0, 4.0, 6.5];
/// let r = pearson(&a, &b).unwrap();
/// assert!(r > 0.99);
/// ```
pub fn pearson(a: &[f64], b: &[f64]) -> Result<f64> {
    check_same_len(a.len(), b.len(), "pearson")?;
    let (mean_a, _) = mean_std(a);
    let (mean_b, _) = mean_std(b);
    let mut num = 0.0;
    let mut den_a = 0.0;
    let mut den_b = 0.0;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        num += dx * dy;
        den_a += dx * dx;
        den_b += dy * dy;
    }
    if den_a == 0.0 || den_b == 0.0 {
        return Ok(f64::NAN);
    }
    Ok(num / (den_a.sqrt() * den_b.sqrt()))
}

/// Z-scores of `vals` (population std). `None` for flat input.
pub fn standardize(vals: &[f64]) -> Option<Vec<f64>> {
    let (mean, std) = mean_std(vals);
    if std == 0.0 || !std.is_finite() {
        return None;
    }
    Some(vals.iter().map(|x| (x - mean) / std).collect())
}

/// Normalized cross-correlation of two equally sized series over every lag.
///
/// Both series are standardized, and the correlation at lag `k` is
/// `sum(a[i] * b[i + k]) / n`, so two identical series peak at 1.0 with
/// lag 0. Returns `(max correlation, lag of the max)`; among equal maxima
/// the lag closest to zero wins. `None` when either series is flat.
pub fn xcorr_max(a: &[f64], b: &[f64]) -> Result<Option<(f64, i32)>> {
    check_same_len(a.len(), b.len(), "xcorr_max")?;
    let (Some(za), Some(zb)) = (standardize(a), standardize(b)) else {
        return Ok(None);
    };
    let n = za.len() as i64;
    let at_lag = |lag: i64| -> f64 {
        let mut acc = 0.0;
        for i in 0..n {
            let j = i + lag;
            if j >= 0 && j < n {
                acc += za[i as usize] * zb[j as usize];
            }
        }
        acc / n as f64
    };

    let mut best = (at_lag(0), 0i32);
    for step in 1..n {
        for lag in [-step, step] {
            let v = at_lag(lag);
            if v > best.0 {
                best = (v, lag as i32);
            }
        }
    }
    Ok(Some(best))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pearson_flat_is_nan() {
        let a = vec![1.0, 1.0, 1.0];
        let b = vec![1.0, 2.0, 3.0];
        assert!(pearson(&a, &b).unwrap().is_nan());
        assert!(pearson(&a, &b[..2]).is_err());
    }

    #[test]
    fn test_xcorr_of_shifted_series() {
        let a = vec![0.0, 1.0, 5.0, 1.0, 0.0, 0.0, 0.0];
        let b = vec![0.0, 0.0, 0.0, 1.0, 5.0, 1.0, 0.0];
        let (val, lag) = xcorr_max(&a, &b).unwrap().unwrap();
        assert_eq!(lag, 2);
        assert!(val > 0.5);

        let (val, lag) = xcorr_max(&a, &a).unwrap().unwrap();
        assert_eq!(lag, 0);
        assert!((val - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_xcorr_flat_is_none() {
        let a = vec![2.0; 4];
        let b = vec![0.0, 1.0, 0.0, 0.0];
        assert!(xcorr_max(&a, &b).unwrap().is_none());
    }
}
