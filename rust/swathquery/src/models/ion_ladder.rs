//! Peptide fragment chemistry: b/y ion ladders and averagine isotope envelopes.

use crate::errors::DataProcessingError;

pub const MASS_PROTON: f64 = 1.007276466621;
pub const MASS_WATER: f64 = 18.0105646837;
/// Spacing between consecutive isotopic peaks (13C - 12C).
pub const ISOTOPE_SPACING: f64 = 1.0033548378;

fn residue_mass(residue: char) -> Option<f64> {
    let mass = match residue {
        'A' => 71.037114,
        'R' => 156.101111,
        'N' => 114.042927,
        'D' => 115.026943,
        'C' => 103.009185,
        'E' => 129.042593,
        'Q' => 128.058578,
        'G' => 57.021464,
        'H' => 137.058912,
        'I' | 'L' => 113.084064,
        'K' => 128.094963,
        'M' => 131.040485,
        'F' => 147.068414,
        'P' => 97.052764,
        'S' => 87.032028,
        'T' => 101.047679,
        'W' => 186.079313,
        'Y' => 163.063329,
        'V' => 99.068414,
        'U' => 168.053,
        _ => return None,
    };
    Some(mass)
}

/// Theoretical b and y ion m/z values of a peptide.
///
/// `b[k]` holds the b ions of length `k + 1` for every considered charge,
/// charge-major (all charge 1 ions first).
#[derive(Debug, Clone, PartialEq)]
pub struct IonLadder {
    pub b: Vec<f64>,
    pub y: Vec<f64>,
    pub max_charge: u8,
}

impl IonLadder {
    /// Builds the ladder of an unmodified or modified sequence.
    ///
    /// `mod_deltas` are `(zero based residue position, mass delta)` pairs.
    ///
    /// ```
    /// use swathquery::models::ion_ladder::IonLadder;
    ///
    /// let ladder = IonLadder::try_new("PEPTIDE", &[], 1).unwrap();
    /// assert_eq!(ladder.b.len(), 6);
    /// assert!((ladder.y[0] - 148.06043).abs() < 1e-4); // y1 of E
    /// ```
    pub fn try_new(
        sequence: &str,
        mod_deltas: &[(usize, f64)],
        max_charge: u8,
    ) -> Result<Self, DataProcessingError> {
        let mut masses = sequence
            .chars()
            .map(|c| residue_mass(c.to_ascii_uppercase()).ok_or(DataProcessingError::UnknownResidue(c)))
            .collect::<Result<Vec<f64>, _>>()?;
        for &(pos, delta) in mod_deltas {
            if let Some(m) = masses.get_mut(pos) {
                *m += delta;
            }
        }

        let max_charge = max_charge.max(1);
        let n = masses.len();
        let mut b = Vec::with_capacity(n.saturating_sub(1) * max_charge as usize);
        let mut y = Vec::with_capacity(n.saturating_sub(1) * max_charge as usize);
        for z in 1..=max_charge {
            let z = z as f64;
            let mut prefix = 0.0;
            for m in masses.iter().take(n.saturating_sub(1)) {
                prefix += m;
                b.push((prefix + z * MASS_PROTON) / z);
            }
            let mut suffix = MASS_WATER;
            for m in masses.iter().rev().take(n.saturating_sub(1)) {
                suffix += m;
                y.push((suffix + z * MASS_PROTON) / z);
            }
        }
        Ok(Self { b, y, max_charge })
    }

    /// Singly charged b ions.
    pub fn b_singly(&self) -> &[f64] {
        &self.b[..self.b.len() / self.max_charge.max(1) as usize]
    }

    /// Singly charged y ions.
    pub fn y_singly(&self) -> &[f64] {
        &self.y[..self.y.len() / self.max_charge.max(1) as usize]
    }

    pub fn len(&self) -> usize {
        self.b.len() + self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.b.is_empty() && self.y.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.b.iter().chain(self.y.iter()).copied()
    }
}

/// Relative abundances of the first `num_peaks` isotopes of a species of
/// neutral mass `mass`, from the averagine Poisson approximation.
/// Normalized to sum to 1.
pub fn averagine_isotopes(mass: f64, num_peaks: usize) -> Vec<f64> {
    let lambda = (0.000594 * mass - 0.03091).max(1e-6);
    let mut out = Vec::with_capacity(num_peaks);
    let mut term = (-lambda).exp();
    for k in 0..num_peaks {
        if k > 0 {
            term *= lambda / k as f64;
        }
        out.push(term);
    }
    let total: f64 = out.iter().sum();
    if total > 0.0 {
        out.iter_mut().for_each(|x| *x /= total);
    }
    out
}
