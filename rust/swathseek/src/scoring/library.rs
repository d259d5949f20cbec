//! Agreement between observed fragment intensities and the library.

use crate::errors::Result;
use crate::utils::correlation::pearson;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LibraryScores {
    pub corr: f64,
    pub rsmd: f64,
    pub manhattan: f64,
    pub dotprod: f64,
    pub sangle: f64,
    pub rootmeansquare: f64,
}

fn sum_normalized(vals: &[f64]) -> Vec<f64> {
    let total: f64 = vals.iter().sum();
    if total <= 0.0 {
        return vec![0.0; vals.len()];
    }
    vals.iter().map(|x| x / total).collect()
}

fn unit_normalized(vals: &[f64]) -> Vec<f64> {
    let norm = vals.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm <= 0.0 {
        return vec![0.0; vals.len()];
    }
    vals.iter().map(|x| x / norm).collect()
}

fn sqrt_all(vals: &[f64]) -> Vec<f64> {
    vals.iter().map(|x| x.max(0.0).sqrt()).collect()
}

/// Scores observed per-fragment feature intensities against the library
/// intensities of the same fragments.
///
/// A correlation that is undefined (fewer than two fragments, or no
/// variance) scores 0.
pub fn library_scores(observed: &[f64], library: &[f64]) -> Result<LibraryScores> {
    let corr = pearson(observed, library)?;
    let n = observed.len() as f64;

    let obs_sum = sum_normalized(observed);
    let lib_sum = sum_normalized(library);
    let rsmd = (obs_sum
        .iter()
        .zip(lib_sum.iter())
        .map(|(a, b)| (a - b).powi(2))
        .sum::<f64>()
        / n)
        .sqrt();

    let obs_sqrt_sum = sum_normalized(&sqrt_all(observed));
    let lib_sqrt_sum = sum_normalized(&sqrt_all(library));
    let manhattan = obs_sqrt_sum
        .iter()
        .zip(lib_sqrt_sum.iter())
        .map(|(a, b)| (a - b).abs())
        .sum();

    let obs_sqrt_unit = unit_normalized(&sqrt_all(observed));
    let lib_sqrt_unit = unit_normalized(&sqrt_all(library));
    let dotprod = obs_sqrt_unit
        .iter()
        .zip(lib_sqrt_unit.iter())
        .map(|(a, b)| a * b)
        .sum();

    let obs_unit = unit_normalized(observed);
    let lib_unit = unit_normalized(library);
    let cos: f64 = obs_unit.iter().zip(lib_unit.iter()).map(|(a, b)| a * b).sum();
    let sangle = cos.clamp(-1.0, 1.0).acos();
    let rootmeansquare = (obs_unit
        .iter()
        .zip(lib_unit.iter())
        .map(|(a, b)| (a - b).powi(2))
        .sum::<f64>()
        / n)
        .sqrt();

    Ok(LibraryScores {
        corr: if corr.is_finite() { corr } else { 0.0 },
        rsmd,
        manhattan,
        dotprod,
        sangle,
        rootmeansquare,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaled_library_is_perfect() {
        let lib = vec![100.0, 50.0, 20.0, 5.0];
        let obs: Vec<f64> = lib.iter().map(|x| x * 37.0).collect();
        let s = library_scores(&obs, &lib).unwrap();
        assert!((s.corr - 1.0).abs() < 1e-9);
        assert!(s.rsmd < 1e-12);
        assert!(s.manhattan < 1e-12);
        assert!((s.dotprod - 1.0).abs() < 1e-9);
        assert!(s.sangle < 1e-6);
        assert!(s.rootmeansquare < 1e-12);
    }

    #[test]
    fn test_mismatch_scores_worse() {
        let lib = vec![100.0, 50.0, 20.0, 5.0];
        let obs = vec![5.0, 20.0, 50.0, 100.0];
        let s = library_scores(&obs, &lib).unwrap();
        assert!(s.corr < 0.0);
        assert!(s.rsmd > 0.1);
        assert!(s.dotprod < 1.0);
        assert!(s.sangle > 0.5);
    }

    #[test]
    fn test_single_fragment_corr_is_zero() {
        let s = library_scores(&[10.0], &[3.0]).unwrap();
        assert_eq!(s.corr, 0.0);
        assert!(s.rsmd < 1e-12);
    }
}
