//! Target-decoy FDR over the top feature of every peptide.

pub mod distribution;
pub mod qvalues;

pub use distribution::{
    FdrBand,
    FdrDistribution,
};
pub use qvalues::{
    assign_fdr,
    LabelledScore,
    TargetDecoy,
};

use serde::{
    Deserialize,
    Serialize,
};
use tracing::info;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FdrParams {
    /// Targets at or below this FDR are identified.
    pub fdr_cutoff: f64,
    /// When set, entries with no FDR or an FDR above it are dropped.
    pub retain_cutoff: Option<f64>,
}

impl Default for FdrParams {
    fn default() -> Self {
        Self {
            fdr_cutoff: 0.01,
            retain_cutoff: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentifyStatus {
    #[serde(rename = "identified")]
    Identified,
    #[serde(rename = "not_identified")]
    NotIdentified,
}

/// One peptide's top feature going through the FDR engine. `meta` is
/// carried along untouched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FdrEntry<M> {
    pub score: f64,
    pub is_decoy: bool,
    pub fdr: Option<f64>,
    pub q_value: Option<f64>,
    pub status: IdentifyStatus,
    pub meta: M,
}

impl<M> FdrEntry<M> {
    pub fn new(score: f64, is_decoy: bool, meta: M) -> Self {
        Self {
            score,
            is_decoy,
            fdr: None,
            q_value: None,
            status: IdentifyStatus::NotIdentified,
            meta,
        }
    }
}

impl<M> LabelledScore for FdrEntry<M> {
    fn get_score(&self) -> f64 {
        self.score
    }

    fn get_label(&self) -> TargetDecoy {
        TargetDecoy::from_is_decoy(self.is_decoy)
    }

    fn assign_fdr(&mut self, fdr: Option<f64>, q_value: Option<f64>) {
        self.fdr = fdr;
        self.q_value = q_value;
    }

    fn get_fdr(&self) -> Option<f64> {
        self.fdr
    }

    fn get_qval(&self) -> Option<f64> {
        self.q_value
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FdrSummary {
    pub fdr_cutoff: f64,
    pub total_targets: usize,
    pub total_decoys: usize,
    pub identified_targets: usize,
    pub identified_decoys: usize,
    /// Lowest combined score among identified decoys.
    pub min_total_score: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FdrReport<M> {
    /// Best first.
    pub entries: Vec<FdrEntry<M>>,
    pub summary: FdrSummary,
    pub distribution: FdrDistribution,
}

#[derive(Debug, Clone, Default)]
pub struct FdrEngine {
    params: FdrParams,
}

impl FdrEngine {
    pub fn new(params: FdrParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &FdrParams {
        &self.params
    }

    pub fn evaluate<M>(&self, mut entries: Vec<FdrEntry<M>>) -> FdrReport<M> {
        assign_fdr(&mut entries);

        let cutoff = self.params.fdr_cutoff;
        let mut summary = FdrSummary {
            fdr_cutoff: cutoff,
            ..FdrSummary::default()
        };
        let mut distribution = FdrDistribution::default();
        for e in entries.iter_mut() {
            if e.is_decoy {
                summary.total_decoys += 1;
            } else {
                summary.total_targets += 1;
            }
            let Some(fdr) = e.fdr else {
                continue;
            };
            distribution.add(fdr, e.is_decoy);
            if fdr <= cutoff {
                e.status = IdentifyStatus::Identified;
                if e.is_decoy {
                    summary.identified_decoys += 1;
                    summary.min_total_score = Some(match summary.min_total_score {
                        Some(m) => m.min(e.score),
                        None => e.score,
                    });
                } else {
                    summary.identified_targets += 1;
                }
            }
        }

        if let Some(retain) = self.params.retain_cutoff {
            entries.retain(|e| matches!(e.fdr, Some(f) if f <= retain));
        }

        info!(
            "{} of {} targets identified at {} FDR ({} decoys)",
            summary.identified_targets, summary.total_targets, cutoff, summary.identified_decoys
        );
        FdrReport {
            entries,
            summary,
            distribution,
        }
    }
}
