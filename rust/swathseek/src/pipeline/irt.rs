//! Run specific RT calibration from iRT anchor peptides.
//!
//! Anchors are extracted over the whole gradient and go through the same
//! conditioning, feature finding and scoring as any peptide. Each anchor
//! then contributes its best peak group, ranked by [`irt_prescore`], and a
//! slope and intercept is fit through the (library RT, apex RT) points
//! after rejecting outliers.

use super::accumulator::PeptideOutcome;
use super::analysis::{
    PeptideScratch,
    RunAnalyzer,
};
use super::results::PeptideResult;
use crate::errors::Result;
use crate::rt_calibration::{
    Calibration,
    CalibrationError,
    IrtParams,
    Point,
    SlopeIntercept,
};
use crate::scoring::{
    ScoreType,
    ScoreVector,
};
use crate::traits::CoordinateProvider;
#[cfg(not(feature = "serial_scoring"))]
use rayon::prelude::*;
use serde::Serialize;
use swathquery::{
    PeptideCoordinate,
    RtTolerance,
    SpectraProvider,
};
use tracing::{
    debug,
    info,
    warn,
};

/// Best peak group of one anchor peptide.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IrtAnchor {
    pub peptide_ref: String,
    pub library_rt: f32,
    pub run_rt: f32,
    pub prescore: f64,
}

impl IrtAnchor {
    fn point(&self) -> Point {
        Point {
            x: self.library_rt as f64,
            y: self.run_rt as f64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IrtResult {
    pub slope_intercept: SlopeIntercept,
    /// Anchors the final fit is made of.
    pub selected: Vec<IrtAnchor>,
    /// Anchors rejected as outliers, in rejection order.
    pub unselected: Vec<IrtAnchor>,
}

/// `XcorrShape + 2 * LibraryDotprod - IonsDelta`.
pub fn irt_prescore(scores: &ScoreVector) -> f64 {
    scores[ScoreType::XcorrShape] + 2.0 * scores[ScoreType::LibraryDotprod]
        - scores[ScoreType::IonsDelta]
}

/// Highest prescored group of a peptide spanning at least `min_width` seconds.
pub fn best_anchor(result: &PeptideResult, min_width: f32) -> Option<IrtAnchor> {
    result
        .features
        .iter()
        .filter(|g| g.right_rt - g.left_rt >= min_width)
        .map(|g| (g, irt_prescore(&g.scores)))
        .filter(|(_, s)| s.is_finite())
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(g, prescore)| IrtAnchor {
            peptide_ref: result.peptide_ref.clone(),
            library_rt: result.library_rt,
            run_rt: g.apex_rt,
            prescore,
        })
}

/// Least squares fit through the anchors, dropping the worst one while its
/// residual exceeds `max_residual` and more than `min_anchors` remain.
pub fn fit_anchors(
    mut anchors: Vec<IrtAnchor>,
    params: &IrtParams,
) -> std::result::Result<IrtResult, CalibrationError> {
    let min_anchors = params.min_anchors.max(2);
    if anchors.is_empty() {
        return Err(CalibrationError::NoPoints);
    }
    if anchors.len() < min_anchors {
        return Err(CalibrationError::InsufficientPoints);
    }
    anchors.sort_by(|a, b| a.library_rt.total_cmp(&b.library_rt));

    let mut unselected = Vec::new();
    loop {
        let points: Vec<Point> = anchors.iter().map(IrtAnchor::point).collect();
        let fit = SlopeIntercept::fit(&points)?;
        let worst = points
            .iter()
            .map(|p| (p.y - (fit.slope * p.x + fit.intercept)).abs())
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(&b.1));
        match worst {
            Some((i, residual)) if residual > params.max_residual => {
                if anchors.len() <= min_anchors {
                    warn!(
                        "Keeping {} iRT anchors with a residual of {:.1} s",
                        anchors.len(),
                        residual
                    );
                    return Ok(IrtResult {
                        slope_intercept: fit,
                        selected: anchors,
                        unselected,
                    });
                }
                let rejected = anchors.remove(i);
                debug!(
                    "Rejecting iRT anchor {} at {:.1} s (residual {:.1} s)",
                    rejected.peptide_ref, rejected.run_rt, residual
                );
                unselected.push(rejected);
            }
            _ => {
                return Ok(IrtResult {
                    slope_intercept: fit,
                    selected: anchors,
                    unselected,
                })
            }
        }
    }
}

impl RunAnalyzer {
    /// Finds the anchor peptides of `library` in the run and fits the library
    /// to run RT mapping. MS1 is not used.
    pub fn calibrate<P, C>(&self, provider: &P, library: &C, params: &IrtParams) -> Result<IrtResult>
    where
        P: SpectraProvider + ?Sized,
        C: CoordinateProvider + ?Sized,
    {
        let mut anchors = Vec::new();
        let mut searched = 0;
        for block in provider.ms2_indices() {
            let Some(window) = block.window else {
                continue;
            };
            let coords: Vec<PeptideCoordinate> = library
                .coordinates(window, &Calibration::Identity, &RtTolerance::Unrestricted)
                .into_iter()
                .filter(|c| {
                    !c.is_decoy
                        && (params.peptides.is_empty() || params.peptides.contains(&c.peptide_ref))
                })
                .collect();
            if coords.is_empty() {
                continue;
            }
            searched += coords.len();
            let ms2 = provider.read_block(block)?;

            let anchor_of = |scratch: &mut PeptideScratch, coord: &PeptideCoordinate| {
                match self.process_peptide(coord, &ms2, None, scratch).0 {
                    PeptideOutcome::Scored(r) => Ok(best_anchor(&r, params.min_group_width)),
                    PeptideOutcome::Skipped(_) => Ok(None),
                    PeptideOutcome::Failed(e) => Err(e),
                }
            };

            #[cfg(not(feature = "serial_scoring"))]
            let found = coords
                .par_iter()
                .map_init(PeptideScratch::default, anchor_of)
                .collect::<Result<Vec<Option<IrtAnchor>>>>()?;

            #[cfg(feature = "serial_scoring")]
            let found = {
                let mut scratch = PeptideScratch::default();
                coords
                    .iter()
                    .map(|coord| anchor_of(&mut scratch, coord))
                    .collect::<Result<Vec<Option<IrtAnchor>>>>()?
            };

            anchors.extend(found.into_iter().flatten());
        }

        info!("Found {} of {} iRT anchors", anchors.len(), searched);
        let result = fit_anchors(anchors, params)?;
        info!(
            "RT calibration: slope {:.4}, intercept {:.2} from {} anchors ({} rejected)",
            result.slope_intercept.slope,
            result.slope_intercept.intercept,
            result.selected.len(),
            result.unselected.len()
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peaks::PeakGroup;

    fn anchor(name: &str, library_rt: f32, run_rt: f32) -> IrtAnchor {
        IrtAnchor {
            peptide_ref: name.into(),
            library_rt,
            run_rt,
            prescore: 1.0,
        }
    }

    fn group(left: f32, apex: f32, right: f32, shape: f64, dotprod: f64) -> PeakGroup {
        let mut scores = ScoreVector::default();
        scores[ScoreType::XcorrShape] = shape;
        scores[ScoreType::LibraryDotprod] = dotprod;
        PeakGroup {
            left_rt: left,
            right_rt: right,
            apex_rt: apex,
            left_index: 0,
            right_index: 0,
            apex_index: 0,
            fragment_intensities: Vec::new(),
            total_intensity: 0.0,
            supporting_fragments: 0,
            ions_low: 0,
            ions_high: 0,
            scores,
        }
    }

    #[test]
    fn test_best_anchor_skips_narrow_groups() {
        let mut result = PeptideResult::new(&PeptideCoordinate::sample(), Vec::new());
        result.features = vec![
            // Best prescore but only 10 s wide.
            group(95.0, 100.0, 105.0, 1.0, 1.0),
            group(40.0, 50.0, 60.0, 0.9, 0.5),
            group(140.0, 150.0, 170.0, 0.2, 0.1),
        ];
        let best = best_anchor(&result, 15.0).unwrap();
        assert_eq!(best.run_rt, 50.0);
        assert!((best.prescore - 1.9).abs() < 1e-9);
        assert_eq!(best.library_rt, 100.0);

        result.features.truncate(1);
        assert!(best_anchor(&result, 15.0).is_none());
    }

    #[test]
    fn test_outliers_are_rejected_worst_first() {
        let mut anchors: Vec<IrtAnchor> = (0..8)
            .map(|i| {
                let x = i as f32 * 10.0;
                anchor(&format!("IRT_{}", i), x, 1.5 * x + 20.0)
            })
            .collect();
        anchors.push(anchor("FAR", 35.0, 400.0));
        anchors.push(anchor("NEAR", 45.0, 1.5 * 45.0 + 20.0 + 150.0));

        let res = fit_anchors(anchors, &IrtParams::default()).unwrap();
        assert!((res.slope_intercept.slope - 1.5).abs() < 1e-6);
        assert!((res.slope_intercept.intercept - 20.0).abs() < 1e-4);
        assert_eq!(res.selected.len(), 8);
        let rejected: Vec<&str> = res.unselected.iter().map(|a| a.peptide_ref.as_str()).collect();
        assert_eq!(rejected, vec!["FAR", "NEAR"]);
    }

    #[test]
    fn test_too_few_anchors() {
        assert_eq!(
            fit_anchors(Vec::new(), &IrtParams::default()),
            Err(CalibrationError::NoPoints)
        );
        let two = vec![anchor("A", 0.0, 10.0), anchor("B", 10.0, 20.0)];
        assert_eq!(
            fit_anchors(two, &IrtParams::default()),
            Err(CalibrationError::InsufficientPoints)
        );
    }
}
