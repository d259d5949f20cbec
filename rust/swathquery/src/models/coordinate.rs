use super::ion_ladder::IonLadder;
use super::tolerance::RtTolerance;
use crate::errors::DataProcessingError;
use serde::{
    Deserialize,
    Serialize,
};

/// Retention time range a peptide is extracted over, in seconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub enum RtWindow {
    Bounded {
        start: f32,
        end: f32,
    },
    #[default]
    Unbounded,
}

impl RtWindow {
    pub fn around(center: f32, tolerance: &RtTolerance) -> Self {
        match tolerance {
            RtTolerance::Seconds(half) => RtWindow::Bounded {
                start: center - half,
                end: center + half,
            },
            RtTolerance::Unrestricted => RtWindow::Unbounded,
        }
    }

    /// True once `rt` is past the end of the window.
    #[inline]
    pub fn is_exhausted_by(&self, rt: f32) -> bool {
        match self {
            RtWindow::Bounded { end, .. } => rt > *end,
            RtWindow::Unbounded => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Fragment {
    pub mz: f64,
    pub intensity: f32,
    pub label: String,
}

/// Decoy counterpart of a library entry: shuffled sequence plus its own fragments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecoyVariant {
    pub sequence: String,
    #[serde(default)]
    pub mod_deltas: Vec<(usize, f64)>,
    pub fragments: Vec<Fragment>,
}

/// Everything needed to extract and score one peptide precursor in one run.
///
/// Fragments are kept sorted by library intensity, most intense first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PeptideCoordinate {
    pub peptide_ref: String,
    pub sequence: String,
    pub mod_deltas: Vec<(usize, f64)>,
    pub precursor_mz: f64,
    pub charge: u8,
    pub library_rt: f32,
    pub rt_window: RtWindow,
    pub is_decoy: bool,
    pub proteins: Vec<String>,
    fragments: Vec<Fragment>,
    decoy: Option<DecoyVariant>,
}

impl PeptideCoordinate {
    #[allow(clippy::too_many_arguments)]
    pub fn try_new(
        peptide_ref: String,
        sequence: String,
        mod_deltas: Vec<(usize, f64)>,
        precursor_mz: f64,
        charge: u8,
        library_rt: f32,
        rt_window: RtWindow,
        fragments: Vec<Fragment>,
        decoy: Option<DecoyVariant>,
    ) -> Result<Self, DataProcessingError> {
        if fragments.is_empty() {
            return Err(DataProcessingError::ExpectedNonEmptyData);
        }
        Ok(Self {
            peptide_ref,
            sequence,
            mod_deltas,
            precursor_mz,
            charge,
            library_rt,
            rt_window,
            is_decoy: false,
            proteins: Vec::new(),
            fragments: sort_fragments(fragments),
            decoy,
        })
    }

    pub fn with_proteins(mut self, proteins: Vec<String>) -> Self {
        self.proteins = proteins;
        self
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn decoy(&self) -> Option<&DecoyVariant> {
        self.decoy.as_ref()
    }

    /// The decoy counterpart as a coordinate of its own, sharing precursor and RT window.
    pub fn as_decoy(&self) -> Option<PeptideCoordinate> {
        let decoy = self.decoy.as_ref()?;
        if decoy.fragments.is_empty() {
            return None;
        }
        Some(PeptideCoordinate {
            peptide_ref: self.peptide_ref.clone(),
            sequence: decoy.sequence.clone(),
            mod_deltas: decoy.mod_deltas.clone(),
            precursor_mz: self.precursor_mz,
            charge: self.charge,
            library_rt: self.library_rt,
            rt_window: self.rt_window,
            is_decoy: true,
            proteins: self.proteins.clone(),
            fragments: sort_fragments(decoy.fragments.clone()),
            decoy: None,
        })
    }

    /// b/y ladder with fragment charges up to `charge - 1` (at least 1).
    pub fn ion_ladder(&self) -> Result<IonLadder, DataProcessingError> {
        IonLadder::try_new(
            &self.sequence,
            &self.mod_deltas,
            self.charge.saturating_sub(1).max(1),
        )
    }

    /// A small well formed coordinate, handy in tests and docs.
    pub fn sample() -> Self {
        let fragments = vec![
            Fragment {
                mz: 702.3468,
                intensity: 100.0,
                label: "y6".into(),
            },
            Fragment {
                mz: 605.2940,
                intensity: 60.0,
                label: "y5".into(),
            },
            Fragment {
                mz: 504.2463,
                intensity: 30.0,
                label: "y4".into(),
            },
        ];
        let decoy = DecoyVariant {
            sequence: "PDITPEE".into(),
            mod_deltas: Vec::new(),
            fragments: vec![
                Fragment {
                    mz: 687.3000,
                    intensity: 100.0,
                    label: "y6".into(),
                },
                Fragment {
                    mz: 590.2500,
                    intensity: 60.0,
                    label: "y5".into(),
                },
                Fragment {
                    mz: 489.2000,
                    intensity: 30.0,
                    label: "y4".into(),
                },
            ],
        };
        Self {
            peptide_ref: "PEPTIDE_2".into(),
            sequence: "PEPTIDE".into(),
            mod_deltas: Vec::new(),
            precursor_mz: 400.6872,
            charge: 2,
            library_rt: 100.0,
            rt_window: RtWindow::Unbounded,
            is_decoy: false,
            proteins: vec!["PROT1".into()],
            fragments,
            decoy: Some(decoy),
        }
    }
}

fn sort_fragments(mut fragments: Vec<Fragment>) -> Vec<Fragment> {
    fragments.sort_by(|a, b| b.intensity.total_cmp(&a.intensity));
    fragments
}
