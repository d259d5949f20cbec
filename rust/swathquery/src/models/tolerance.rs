use serde::{
    Deserialize,
    Serialize,
};

/// How far around the calibrated library RT a peptide is extracted.
///
/// Convention: the width is a half-width in seconds, so `Seconds(300.0)`
/// around a predicted RT of 1000.0 means the window (700, 1300).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum RtTolerance {
    #[serde(rename = "seconds")]
    Seconds(f32),
    #[serde(rename = "unrestricted")]
    Unrestricted,
}

impl Default for RtTolerance {
    fn default() -> Self {
        RtTolerance::Seconds(300.0)
    }
}

/// Extraction settings for one analysis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExtractionParams {
    /// m/z half-window, in parts per million of the extracted m/z.
    pub ppm: f64,
    pub rt: RtTolerance,
    /// Lower fraction of the top fragment intensity an ion must exceed to count as present.
    pub ions_low: f32,
    /// Upper fraction of the top fragment intensity, ions above it count as dominant.
    pub ions_high: f32,
    pub with_ion_counts: bool,
    pub with_ms1: bool,
}

impl Default for ExtractionParams {
    fn default() -> Self {
        Self {
            ppm: 20.0,
            rt: RtTolerance::default(),
            ions_low: 0.0,
            ions_high: 1.0,
            with_ion_counts: true,
            with_ms1: true,
        }
    }
}

impl ExtractionParams {
    /// Inclusive m/z bounds for an extraction.
    ///
    /// ```
    /// use swathquery::ExtractionParams;
    ///
    /// let params = ExtractionParams::default(); // 20 ppm
    /// let (lo, hi) = params.mz_range(500.0);
    /// assert!((lo - 499.99).abs() < 1e-9);
    /// assert!((hi - 500.01).abs() < 1e-9);
    /// ```
    pub fn mz_range(&self, mz: f64) -> (f64, f64) {
        let window = mz * self.ppm * 1e-6;
        (mz - window, mz + window)
    }
}
