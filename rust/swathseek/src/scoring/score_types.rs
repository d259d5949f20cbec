//! The closed set of sub-scores and the flat vectors keyed by it.

use serde::de::Deserializer;
use serde::ser::{
    SerializeMap,
    Serializer,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::collections::BTreeMap;
use std::ops::{
    Index,
    IndexMut,
};

pub const NUM_SCORES: usize = 22;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreType {
    InitScore,
    WeightedTotalScore,
    XcorrCoelution,
    XcorrCoelutionWeighted,
    XcorrShape,
    XcorrShapeWeighted,
    LibraryCorr,
    LibraryRsmd,
    LibraryManhattan,
    LibraryDotprod,
    LibrarySangle,
    LibraryRootmeansquare,
    LogSnScore,
    NormRtScore,
    IntensityScore,
    IsotopeCorrelationScore,
    IsotopeOverlapScore,
    MassdevScore,
    MassdevScoreWeighted,
    BseriesScore,
    YseriesScore,
    IonsDelta,
}

impl ScoreType {
    pub const ALL: [ScoreType; NUM_SCORES] = [
        ScoreType::InitScore,
        ScoreType::WeightedTotalScore,
        ScoreType::XcorrCoelution,
        ScoreType::XcorrCoelutionWeighted,
        ScoreType::XcorrShape,
        ScoreType::XcorrShapeWeighted,
        ScoreType::LibraryCorr,
        ScoreType::LibraryRsmd,
        ScoreType::LibraryManhattan,
        ScoreType::LibraryDotprod,
        ScoreType::LibrarySangle,
        ScoreType::LibraryRootmeansquare,
        ScoreType::LogSnScore,
        ScoreType::NormRtScore,
        ScoreType::IntensityScore,
        ScoreType::IsotopeCorrelationScore,
        ScoreType::IsotopeOverlapScore,
        ScoreType::MassdevScore,
        ScoreType::MassdevScoreWeighted,
        ScoreType::BseriesScore,
        ScoreType::YseriesScore,
        ScoreType::IonsDelta,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Combined scores, computed from the other members rather than measured.
    pub const fn is_combined(self) -> bool {
        matches!(self, ScoreType::InitScore | ScoreType::WeightedTotalScore)
    }
}

/// One value per [`ScoreType`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreVector([f64; NUM_SCORES]);

impl Default for ScoreVector {
    fn default() -> Self {
        Self([0.0; NUM_SCORES])
    }
}

impl Index<ScoreType> for ScoreVector {
    type Output = f64;

    fn index(&self, index: ScoreType) -> &f64 {
        &self.0[index.index()]
    }
}

impl IndexMut<ScoreType> for ScoreVector {
    fn index_mut(&mut self, index: ScoreType) -> &mut f64 {
        &mut self.0[index.index()]
    }
}

impl ScoreVector {
    pub fn as_array(&self) -> &[f64; NUM_SCORES] {
        &self.0
    }

    /// Weighted linear sum, the combined score.
    pub fn combine(&self, weights: &WeightVector) -> f64 {
        self.0.iter().zip(weights.0.iter()).map(|(s, w)| s * w).sum()
    }

    /// Replaces non finite values with 0 so they cannot poison a fit.
    pub fn sanitized(mut self) -> Self {
        self.0.iter_mut().for_each(|x| {
            if !x.is_finite() {
                *x = 0.0
            }
        });
        self
    }

    /// The synthetic best case used as the only positive in the first fit.
    pub fn ideal_target() -> Self {
        let mut v = Self::default();
        v[ScoreType::XcorrShape] = 1.0;
        v[ScoreType::XcorrShapeWeighted] = 1.0;
        v[ScoreType::XcorrCoelution] = 0.0;
        v[ScoreType::XcorrCoelutionWeighted] = 0.0;
        v[ScoreType::LibraryCorr] = 1.0;
        v[ScoreType::LibraryRsmd] = 0.0;
        v[ScoreType::LibraryManhattan] = 0.0;
        v[ScoreType::LibraryDotprod] = 1.0;
        v[ScoreType::LibrarySangle] = 0.0;
        v[ScoreType::LibraryRootmeansquare] = 0.0;
        v[ScoreType::LogSnScore] = 5.0;
        v[ScoreType::NormRtScore] = 0.0;
        v[ScoreType::IntensityScore] = 1.0;
        v[ScoreType::IsotopeCorrelationScore] = 1.0;
        v[ScoreType::IsotopeOverlapScore] = 0.0;
        v[ScoreType::MassdevScore] = 0.0;
        v[ScoreType::MassdevScoreWeighted] = 0.0;
        v[ScoreType::BseriesScore] = 4.0;
        v[ScoreType::YseriesScore] = 10.0;
        v
    }
}

impl Serialize for ScoreVector {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(NUM_SCORES))?;
        for t in ScoreType::ALL {
            map.serialize_entry(&t, &self[t])?;
        }
        map.end()
    }
}

/// Linear weights over the score vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightVector([f64; NUM_SCORES]);

impl Default for WeightVector {
    fn default() -> Self {
        Self([0.0; NUM_SCORES])
    }
}

impl Index<ScoreType> for WeightVector {
    type Output = f64;

    fn index(&self, index: ScoreType) -> &f64 {
        &self.0[index.index()]
    }
}

impl IndexMut<ScoreType> for WeightVector {
    fn index_mut(&mut self, index: ScoreType) -> &mut f64 {
        &mut self.0[index.index()]
    }
}

impl WeightVector {
    /// Hand tuned weights used before anything is learned.
    pub fn prior() -> Self {
        let mut w = Self::default();
        w[ScoreType::LibraryCorr] = 0.19011762;
        w[ScoreType::LibraryRsmd] = -2.47298914;
        w[ScoreType::NormRtScore] = -5.63906731;
        w[ScoreType::IsotopeCorrelationScore] = 0.62640133;
        w[ScoreType::IsotopeOverlapScore] = -0.36006925;
        w[ScoreType::MassdevScore] = -0.08814003;
        w[ScoreType::XcorrCoelution] = -0.13978311;
        w[ScoreType::XcorrShape] = 1.16475032;
        w[ScoreType::YseriesScore] = 0.19267813;
        w[ScoreType::LogSnScore] = 0.61712054;
        w
    }

    pub fn as_array(&self) -> &[f64; NUM_SCORES] {
        &self.0
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|x| x.is_finite())
    }

    /// `rate * self + (1 - rate) * previous`.
    pub fn blend(&self, previous: &WeightVector, rate: f64) -> WeightVector {
        let mut out = WeightVector::default();
        for i in 0..NUM_SCORES {
            out.0[i] = rate * self.0[i] + (1.0 - rate) * previous.0[i];
        }
        out
    }

    /// Element wise mean, `None` for an empty slice.
    pub fn mean(weights: &[WeightVector]) -> Option<WeightVector> {
        if weights.is_empty() {
            return None;
        }
        let mut out = WeightVector::default();
        for w in weights {
            for i in 0..NUM_SCORES {
                out.0[i] += w.0[i];
            }
        }
        let n = weights.len() as f64;
        out.0.iter_mut().for_each(|x| *x /= n);
        Some(out)
    }
}

impl Serialize for WeightVector {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(NUM_SCORES))?;
        for t in ScoreType::ALL {
            map.serialize_entry(&t, &self[t])?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for WeightVector {
    /// Missing score types read as weight 0.
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let map = BTreeMap::<ScoreType, f64>::deserialize(deserializer)?;
        let mut out = WeightVector::default();
        for (t, w) in map {
            out[t] = w;
        }
        Ok(out)
    }
}
