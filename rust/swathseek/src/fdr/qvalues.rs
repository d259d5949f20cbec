use serde::{
    Deserialize,
    Serialize,
};
use std::cmp::Ordering;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetDecoy {
    Target,
    Decoy,
}

impl TargetDecoy {
    pub fn from_is_decoy(is_decoy: bool) -> Self {
        if is_decoy {
            TargetDecoy::Decoy
        } else {
            TargetDecoy::Target
        }
    }
}

pub trait LabelledScore {
    fn get_score(&self) -> f64;
    fn get_label(&self) -> TargetDecoy;
    fn assign_fdr(&mut self, fdr: Option<f64>, q_value: Option<f64>);
    fn get_fdr(&self) -> Option<f64>;
    fn get_qval(&self) -> Option<f64>;
}

impl LabelledScore for (f64, TargetDecoy, Option<f64>, Option<f64>) {
    fn get_score(&self) -> f64 {
        self.0
    }

    fn get_label(&self) -> TargetDecoy {
        self.1
    }

    fn assign_fdr(&mut self, fdr: Option<f64>, q_value: Option<f64>) {
        self.2 = fdr;
        self.3 = q_value;
    }

    fn get_fdr(&self) -> Option<f64> {
        self.2
    }

    fn get_qval(&self) -> Option<f64> {
        self.3
    }
}

/// Best first order; on equal scores decoys come first so ties count
/// against the targets.
pub fn rank_order<T: LabelledScore>(a: &T, b: &T) -> Ordering {
    b.get_score()
        .total_cmp(&a.get_score())
        .then_with(|| match (a.get_label(), b.get_label()) {
            (TargetDecoy::Decoy, TargetDecoy::Target) => Ordering::Less,
            (TargetDecoy::Target, TargetDecoy::Decoy) => Ordering::Greater,
            _ => Ordering::Equal,
        })
}

/// Sorts `scores` best first and assigns FDR and q-values in place.
///
/// Targets get `decoys above / targets above` (both counts inclusive) and
/// the q-value is its cumulative minimum from the bottom of the ranking.
/// Decoys copy both values from the flanking target closest in score: an
/// exact tie goes to the higher scored target, a decoy with no target below
/// it gets `None`, and one with no target above it takes the one below.
pub fn assign_fdr<T: LabelledScore>(scores: &mut [T]) {
    scores.sort_by(rank_order);

    let mut decoys = 0usize;
    let mut targets = 0usize;
    for s in scores.iter_mut() {
        match s.get_label() {
            TargetDecoy::Decoy => {
                decoys += 1;
                s.assign_fdr(None, None);
            }
            TargetDecoy::Target => {
                targets += 1;
                let fdr = decoys as f64 / targets as f64;
                s.assign_fdr(Some(fdr), Some(fdr));
            }
        }
    }

    // Reverse slice, and calculate the cumulative minimum
    let mut q_min = f64::INFINITY;
    for s in scores.iter_mut().rev() {
        if s.get_label() == TargetDecoy::Target {
            q_min = q_min.min(s.get_qval().unwrap_or(f64::INFINITY));
            let fdr = s.get_fdr();
            s.assign_fdr(fdr, Some(q_min));
        }
    }

    let n = scores.len();
    let mut above: Vec<Option<usize>> = vec![None; n];
    let mut last = None;
    for (i, s) in scores.iter().enumerate() {
        above[i] = last;
        if s.get_label() == TargetDecoy::Target {
            last = Some(i);
        }
    }
    let mut below: Vec<Option<usize>> = vec![None; n];
    let mut last = None;
    for i in (0..n).rev() {
        below[i] = last;
        if scores[i].get_label() == TargetDecoy::Target {
            last = Some(i);
        }
    }

    for i in 0..n {
        if scores[i].get_label() != TargetDecoy::Decoy {
            continue;
        }
        let source = match (above[i], below[i]) {
            (_, None) => None,
            (None, Some(lo)) => Some(lo),
            (Some(up), Some(lo)) => {
                let score = scores[i].get_score();
                let d_up = scores[up].get_score() - score;
                let d_lo = score - scores[lo].get_score();
                if d_up <= d_lo {
                    Some(up)
                } else {
                    Some(lo)
                }
            }
        };
        let (fdr, q) = match source {
            Some(j) => (scores[j].get_fdr(), scores[j].get_qval()),
            None => (None, None),
        };
        scores[i].assign_fdr(fdr, q);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(score: f64, decoy: bool) -> (f64, TargetDecoy, Option<f64>, Option<f64>) {
        (score, TargetDecoy::from_is_decoy(decoy), None, None)
    }

    #[test]
    fn test_ties_rank_decoys_first() {
        let mut v = vec![entry(1.0, false), entry(1.0, true)];
        assign_fdr(&mut v);
        assert_eq!(v[0].1, TargetDecoy::Decoy);
        assert_eq!(v[1].2, Some(1.0));
    }

    #[test]
    fn test_exact_flank_tie_goes_up() {
        // Decoy exactly half way between two targets.
        let mut v = vec![
            entry(4.0, false),
            entry(3.0, true),
            entry(2.0, false),
            entry(1.0, true),
            entry(0.0, false),
        ];
        assign_fdr(&mut v);
        // Upper flank of the 3.0 decoy is the 4.0 target, fdr 0.
        assert_eq!(v[1].2, Some(0.0));
        // Upper flank of the 1.0 decoy is the 2.0 target, fdr 1/2.
        assert_eq!(v[3].2, Some(0.5));
    }

    #[test]
    fn test_decoy_above_all_targets_takes_lower() {
        let mut v = vec![entry(10.0, true), entry(5.0, false), entry(4.0, false)];
        assign_fdr(&mut v);
        assert_eq!(v[0].2, Some(1.0));
        assert_eq!(v[0].3, v[1].3);
    }
}
