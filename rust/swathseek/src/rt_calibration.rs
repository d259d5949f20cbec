//! Library RT to run RT mapping.
//!
//! Calibrations are built once per run and are read-only afterwards, so the
//! scorer and the coordinate provider can share them across threads.

use serde::{
    Deserialize,
    Serialize,
};

/// Minimum denominator for slope calculations to avoid division by zero.
const MIN_SLOPE_DENOMINATOR: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// Calibration attempted with no input points.
    NoPoints,
    /// Not enough points to fit or interpolate.
    InsufficientPoints,
    /// All points share the same library RT.
    ZeroRange,
}

/// A (library RT, observed RT) anchor.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

pub trait RtCalibration: Send + Sync {
    /// Run RT expected for a library RT.
    fn predict(&self, library_rt: f32) -> f32;

    /// Run RT seconds per library RT unit around `library_rt`.
    fn local_slope(&self, library_rt: f32) -> f32;
}

/// `observed = slope * library + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlopeIntercept {
    pub slope: f64,
    pub intercept: f64,
}

impl SlopeIntercept {
    /// Ordinary least squares over the anchors.
    ///
    /// ```
    /// use swathseek::rt_calibration::{Point, RtCalibration, SlopeIntercept};
    ///
    /// let pts = [Point { x: 0.0, y: 10.0 }, Point { x: 10.0, y: 30.0 }];
    /// let cal = SlopeIntercept::fit(&pts).unwrap();
    /// assert!((cal.predict(5.0) - 20.0).abs() < 1e-4);
    /// ```
    pub fn fit(points: &[Point]) -> Result<Self, CalibrationError> {
        if points.is_empty() {
            return Err(CalibrationError::NoPoints);
        }
        if points.len() < 2 {
            return Err(CalibrationError::InsufficientPoints);
        }
        let n = points.len() as f64;
        let mean_x = points.iter().map(|p| p.x).sum::<f64>() / n;
        let mean_y = points.iter().map(|p| p.y).sum::<f64>() / n;
        let sxx: f64 = points.iter().map(|p| (p.x - mean_x).powi(2)).sum();
        if sxx < MIN_SLOPE_DENOMINATOR {
            return Err(CalibrationError::ZeroRange);
        }
        let sxy: f64 = points.iter().map(|p| (p.x - mean_x) * (p.y - mean_y)).sum();
        let slope = sxy / sxx;
        Ok(Self {
            slope,
            intercept: mean_y - slope * mean_x,
        })
    }
}

impl RtCalibration for SlopeIntercept {
    fn predict(&self, library_rt: f32) -> f32 {
        (self.slope * library_rt as f64 + self.intercept) as f32
    }

    fn local_slope(&self, _library_rt: f32) -> f32 {
        self.slope as f32
    }
}

/// Linear interpolation between sorted anchors, extrapolating the edge
/// segments outside of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Point>", into = "Vec<Point>")]
pub struct PiecewiseLinear {
    points: Vec<Point>,
    slopes: Vec<f64>,
}

impl PiecewiseLinear {
    pub fn try_new(mut points: Vec<Point>) -> Result<Self, CalibrationError> {
        if points.is_empty() {
            return Err(CalibrationError::NoPoints);
        }
        if points.len() < 2 {
            return Err(CalibrationError::InsufficientPoints);
        }
        points.sort_by(|a, b| a.x.total_cmp(&b.x));
        if points[points.len() - 1].x - points[0].x < MIN_SLOPE_DENOMINATOR {
            return Err(CalibrationError::ZeroRange);
        }
        let slopes = points
            .windows(2)
            .map(|p| (p[1].y - p[0].y) / (p[1].x - p[0].x).max(MIN_SLOPE_DENOMINATOR))
            .collect();
        Ok(Self { points, slopes })
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Segment used for `x`: `i` such that the slope between points
    /// `i` and `i + 1` applies.
    fn segment(&self, x: f64) -> usize {
        let i = self.points.partition_point(|p| p.x < x);
        i.clamp(1, self.slopes.len()) - 1
    }
}

impl TryFrom<Vec<Point>> for PiecewiseLinear {
    type Error = String;

    fn try_from(points: Vec<Point>) -> Result<Self, Self::Error> {
        Self::try_new(points).map_err(|e| format!("invalid calibration points: {:?}", e))
    }
}

impl From<PiecewiseLinear> for Vec<Point> {
    fn from(val: PiecewiseLinear) -> Self {
        val.points
    }
}

impl RtCalibration for PiecewiseLinear {
    fn predict(&self, library_rt: f32) -> f32 {
        let x = library_rt as f64;
        let i = self.segment(x);
        let p = self.points[i];
        (p.y + (x - p.x) * self.slopes[i]) as f32
    }

    fn local_slope(&self, library_rt: f32) -> f32 {
        self.slopes[self.segment(library_rt as f64)] as f32
    }
}

/// How a slope and intercept are fit from iRT anchor peptides found in the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IrtParams {
    /// Peptide refs used as anchors. Empty means every library target.
    pub peptides: Vec<String>,
    /// Peak groups narrower than this many seconds are not anchor candidates.
    pub min_group_width: f32,
    /// Anchors further than this many seconds from the fit are rejected,
    /// worst first, refitting after each rejection.
    pub max_residual: f64,
    pub min_anchors: usize,
}

impl Default for IrtParams {
    fn default() -> Self {
        Self {
            peptides: Vec::new(),
            min_group_width: 15.0,
            max_residual: 60.0,
            min_anchors: 3,
        }
    }
}

/// Calibration as it appears in the configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Calibration {
    /// Library RTs are already run RTs.
    #[default]
    #[serde(rename = "identity")]
    Identity,
    #[serde(rename = "slope_intercept")]
    SlopeIntercept(SlopeIntercept),
    #[serde(rename = "piecewise")]
    Piecewise { points: PiecewiseLinear },
    /// Fit from iRT anchors before the run is analysed. Until then it maps
    /// like `Identity`.
    #[serde(rename = "from_run")]
    FromRun(IrtParams),
}

impl RtCalibration for Calibration {
    fn predict(&self, library_rt: f32) -> f32 {
        match self {
            Calibration::Identity | Calibration::FromRun(_) => library_rt,
            Calibration::SlopeIntercept(c) => c.predict(library_rt),
            Calibration::Piecewise { points } => points.predict(library_rt),
        }
    }

    fn local_slope(&self, library_rt: f32) -> f32 {
        match self {
            Calibration::Identity | Calibration::FromRun(_) => 1.0,
            Calibration::SlopeIntercept(c) => c.local_slope(library_rt),
            Calibration::Piecewise { points } => points.local_slope(library_rt),
        }
    }
}
