//! Ranking & Confidence
//!
//! Softmax over the model logits, arg-max and top-k selection. Ordering is
//! fully determined: descending probability, then ascending class index, so
//! equal probabilities always resolve to the lowest index.

use std::cmp::Ordering;

use crate::utils::error::{DiagnosisError, Result};

/// Number of alternatives reported with every prediction
pub const TOP_K: usize = 3;

/// Probability distribution over the label registry
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityVector(Vec<f64>);

impl ProbabilityVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.0.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One ranked class, by registry index
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedIndex {
    pub index: usize,
    /// Probability in `[0, 1]`
    pub probability: f64,
}

impl RankedIndex {
    /// Probability as a percentage rounded to two decimals
    pub fn confidence_pct(&self) -> f64 {
        confidence_pct(self.probability)
    }
}

/// Outcome of ranking one logits vector, built only by [`rank`]
#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    probabilities: ProbabilityVector,
    /// Top `k` entries, best first
    ranked: Vec<RankedIndex>,
}

impl Ranking {
    /// The winning entry
    pub fn top(&self) -> Option<RankedIndex> {
        self.ranked.first().copied()
    }

    /// Top `k` entries, best first
    pub fn ranked(&self) -> &[RankedIndex] {
        &self.ranked
    }

    pub fn probabilities(&self) -> &ProbabilityVector {
        &self.probabilities
    }

    /// Gap between the best and second-best probability
    pub fn margin(&self) -> f64 {
        match self.ranked.as_slice() {
            [first, second, ..] => first.probability - second.probability,
            [first] => first.probability,
            [] => 0.0,
        }
    }
}

/// Numerically stable softmax
pub fn softmax(logits: &[f32]) -> Result<ProbabilityVector> {
    if logits.is_empty() {
        return Err(DiagnosisError::Inference(
            "Cannot rank an empty logits vector".to_string(),
        ));
    }
    if let Some(idx) = logits.iter().position(|v| !v.is_finite()) {
        return Err(DiagnosisError::Inference(format!(
            "Non-finite logit {} at index {}",
            logits[idx], idx
        )));
    }

    let max = logits
        .iter()
        .fold(f64::NEG_INFINITY, |acc, &v| acc.max(v as f64));
    let exps: Vec<f64> = logits.iter().map(|&v| (v as f64 - max).exp()).collect();
    let sum: f64 = exps.iter().sum();

    Ok(ProbabilityVector(exps.into_iter().map(|e| e / sum).collect()))
}

fn rank_order(a: &RankedIndex, b: &RankedIndex) -> Ordering {
    b.probability
        .total_cmp(&a.probability)
        .then_with(|| a.index.cmp(&b.index))
}

/// The `k` most probable classes, best first, ties to the lowest index
pub fn top_k(probabilities: &ProbabilityVector, k: usize) -> Vec<RankedIndex> {
    let mut indexed: Vec<RankedIndex> = probabilities
        .as_slice()
        .iter()
        .enumerate()
        .map(|(index, &probability)| RankedIndex { index, probability })
        .collect();
    indexed.sort_by(rank_order);
    indexed.truncate(k);
    indexed
}

/// Softmax then top-k over raw logits
pub fn rank(logits: &[f32], k: usize) -> Result<Ranking> {
    if k == 0 {
        return Err(DiagnosisError::Config("top-k must be at least 1".to_string()));
    }
    let probabilities = softmax(logits)?;
    let ranked = top_k(&probabilities, k);
    Ok(Ranking {
        probabilities,
        ranked,
    })
}

/// Probability as a percentage rounded to two decimals
pub fn confidence_pct(probability: f64) -> f64 {
    (probability * 100.0 * 100.0).round() / 100.0
}

/// Probability as a display string, e.g. `"97.31%"`
pub fn format_pct(probability: f64) -> String {
    format!("{:.2}%", probability * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0, 3.0, -4.0]).unwrap();
        let sum: f64 = probs.as_slice().iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert!(probs.as_slice().iter().all(|&p| p >= 0.0));
    }

    #[test]
    fn test_softmax_large_logits_stable() {
        let probs = softmax(&[1000.0, 1000.0]).unwrap();
        assert_eq!(probs.as_slice(), &[0.5, 0.5]);
    }

    #[test]
    fn test_softmax_rejects_bad_input() {
        assert!(matches!(softmax(&[]), Err(DiagnosisError::Inference(_))));
        assert!(matches!(
            softmax(&[0.0, f32::NAN]),
            Err(DiagnosisError::Inference(_))
        ));
        assert!(softmax(&[f32::INFINITY]).is_err());
    }

    #[test]
    fn test_tie_break_lowest_index() {
        let mut logits = vec![0.0f32; 38];
        logits[5] = 4.0;
        logits[12] = 4.0;
        let ranking = rank(&logits, TOP_K).unwrap();
        assert_eq!(ranking.top().unwrap().index, 5);
        assert_eq!(ranking.ranked[1].index, 12);
        // third place is a 36-way tie at zero, lowest index wins again
        assert_eq!(ranking.ranked[2].index, 0);
    }

    #[test]
    fn test_uniform_logits_pick_first() {
        let ranking = rank(&[0.0; 38], TOP_K).unwrap();
        let indices: Vec<usize> = ranking.ranked.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_ranked_non_increasing() {
        let logits = [0.3, -1.2, 2.5, 2.4, 0.0, 7.1, -3.3];
        let ranking = rank(&logits, TOP_K).unwrap();
        assert_eq!(ranking.ranked.len(), 3);
        assert_eq!(ranking.top().unwrap().index, 5);
        for pair in ranking.ranked.windows(2) {
            assert!(pair[0].probability >= pair[1].probability);
        }
    }

    #[test]
    fn test_k_larger_than_classes() {
        let ranking = rank(&[1.0, 2.0], 3).unwrap();
        assert_eq!(ranking.ranked.len(), 2);
        assert!(rank(&[1.0], 0).is_err());
    }

    #[test]
    fn test_dominant_logit_confidence() {
        let mut logits = vec![0.0f32; 38];
        logits[30] = 10.0;
        let ranking = rank(&logits, TOP_K).unwrap();
        assert_eq!(ranking.top().unwrap().index, 30);
        assert!(ranking.top().unwrap().confidence_pct() > 99.0);
        assert!(ranking.margin() > 0.99);
    }

    #[test]
    fn test_percent_formatting() {
        assert_eq!(confidence_pct(0.973_14), 97.31);
        assert_eq!(confidence_pct(1.0), 100.0);
        assert_eq!(format_pct(0.973_14), "97.31%");
        assert_eq!(format_pct(0.0), "0.00%");
    }

    #[test]
    fn test_single_class_ranking() {
        let ranking = rank(&[-3.0], TOP_K).unwrap();
        assert_eq!(ranking.ranked().len(), 1);
        assert_eq!(ranking.top(), ranking.ranked().first().copied());
        assert_eq!(ranking.top().unwrap().probability, 1.0);
        assert_eq!(ranking.margin(), 1.0);
        assert_eq!(ranking.probabilities().get(0), Some(1.0));
    }
}
