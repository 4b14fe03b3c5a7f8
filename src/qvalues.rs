//! Q-value estimation by target-decoy competition.
//!
//! Each observation is assigned the smallest false discovery rate threshold at
//! which it would be accepted. FDRs are estimated from the cumulative decoy
//! and target counts at and above each score, tied scores share one estimate,
//! and a cumulative minimum from the least-confident end makes the sequence
//! monotone non-decreasing as acceptance relaxes.

// internal imports
use crate::errors::QvalueError;

/// Estimate q-values for linear PSMs using target-decoy competition.
///
/// The FDR at each score threshold is `(decoys + 1) / targets`, counting
/// observations at and above the threshold in the chosen direction. With no
/// decoys present the pseudocount defines the result, so a
/// competition-filtered all-target set gets `1 / n` uniformly.
///
/// # Arguments
/// * `scores` - Score of each observation
/// * `targets` - `true` for targets, `false` for decoys, aligned with `scores`
/// * `desc` - `true` if higher scores are better
///
pub fn tdc(scores: &[f64], targets: &[bool], desc: bool) -> Result<Vec<f64>, QvalueError> {
    let order = rank_order(scores, targets.len(), desc)?;

    let mut fdr = vec![1.0; scores.len()];
    let mut n_targets = 0usize;
    let mut n_decoys = 0usize;
    for (rank, &row) in order.iter().enumerate() {
        if targets[row] {
            n_targets += 1;
        } else {
            n_decoys += 1;
        }
        fdr[rank] = (n_decoys + 1) as f64 / n_targets.max(1) as f64;
    }

    Ok(unsort(&order, &fdr_to_qvalues(scores, &order, &fdr)))
}

/// Estimate q-values for cross-linked PSMs using target-decoy competition.
///
/// Labels are 2 for target-target, 1 for target-decoy and 0 for decoy-decoy
/// matches. Rows with a non-zero label are the accepted observations being
/// ranked; decoy-decoy matches are the null. The FDR at each threshold is
/// `(TD + 2 * DD + 1) / (TT + TD)`: every decoy leg contributes one unit of
/// estimated false matches, so a decoy-decoy match carries twice the null
/// weight of a single-decoy match.
///
/// # Arguments
/// * `scores` - Score of each observation
/// * `labels` - Number of target legs (0, 1 or 2), aligned with `scores`
/// * `desc` - `true` if higher scores are better
///
pub fn crosslink_tdc(scores: &[f64], labels: &[u32], desc: bool) -> Result<Vec<f64>, QvalueError> {
    if let Some(&label) = labels.iter().find(|&&label| label > 2) {
        return Err(QvalueError::InvalidLabel(label));
    }
    let order = rank_order(scores, labels.len(), desc)?;

    let mut fdr = vec![1.0; scores.len()];
    let mut n_tt = 0usize;
    let mut n_td = 0usize;
    let mut n_dd = 0usize;
    for (rank, &row) in order.iter().enumerate() {
        match labels[row] {
            2 => n_tt += 1,
            1 => n_td += 1,
            _ => n_dd += 1,
        }
        let accepted = (n_tt + n_td).max(1) as f64;
        fdr[rank] = ((n_td + 2 * n_dd + 1) as f64 / accepted).min(1.0);
    }

    Ok(unsort(&order, &fdr_to_qvalues(scores, &order, &fdr)))
}

/// Validates the input and returns the row order from most to least confident.
fn rank_order(scores: &[f64], n_labels: usize, desc: bool) -> Result<Vec<usize>, QvalueError> {
    if scores.len() != n_labels {
        return Err(QvalueError::LengthMismatch(scores.len(), n_labels));
    }
    if scores.is_empty() {
        return Err(QvalueError::Empty);
    }
    let nan_count = scores.iter().filter(|score| score.is_nan()).count();
    if nan_count > 0 {
        return Err(QvalueError::NanScores(nan_count));
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    if desc {
        order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
    } else {
        order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));
    }
    Ok(order)
}

/// Turns per-rank FDRs into q-values: rows with tied scores share the FDR at
/// the end of their tie group, then a cumulative minimum from the worst end
/// enforces monotonicity. Starting the minimum at 1.0 also caps the result.
fn fdr_to_qvalues(scores: &[f64], order: &[usize], fdr: &[f64]) -> Vec<f64> {
    let n = fdr.len();
    let mut qvalues = vec![1.0; n];

    let mut start = 0;
    while start < n {
        let mut end = start;
        while end + 1 < n && scores[order[end + 1]] == scores[order[start]] {
            end += 1;
        }
        for qvalue in qvalues.iter_mut().take(end + 1).skip(start) {
            *qvalue = fdr[end];
        }
        start = end + 1;
    }

    let mut q_min = 1.0f64;
    for qvalue in qvalues.iter_mut().rev() {
        q_min = q_min.min(*qvalue);
        *qvalue = q_min;
    }
    qvalues
}

/// Scatters rank-ordered values back to the original row order.
fn unsort(order: &[usize], sorted_values: &[f64]) -> Vec<f64> {
    let mut values = vec![0.0; sorted_values.len()];
    for (rank, &row) in order.iter().enumerate() {
        values[row] = sorted_values[rank];
    }
    values
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_monotonicity_descending() {
        let scores = [3.2, 1.5, 4.0, 2.1, 5.5, 0.3];
        let targets = [true, false, true, false, true, true];

        let qvalues = tdc(&scores, &targets, true).unwrap();

        let mut order: Vec<usize> = (0..scores.len()).collect();
        order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
        for rank in 1..order.len() {
            assert!(qvalues[order[rank - 1]] <= qvalues[order[rank]]);
        }
    }

    #[test]
    fn test_monotonicity_ascending() {
        let scores = [3.2, 1.5, 4.0, 2.1, 5.5, 0.3];
        let targets = [true, false, true, false, true, true];

        let qvalues = tdc(&scores, &targets, false).unwrap();

        let mut order: Vec<usize> = (0..scores.len()).collect();
        order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));
        for rank in 1..order.len() {
            assert!(qvalues[order[rank - 1]] <= qvalues[order[rank]]);
        }
    }

    #[test]
    fn test_best_observation_has_minimal_qvalue() {
        let scores = [3.2, 1.5, 4.0, 2.1, 5.5];
        let targets = [true, false, true, false, true];

        let qvalues = tdc(&scores, &targets, true).unwrap();

        // 5.5 at index 4 is the most confident observation
        assert!(qvalues.iter().all(|&q| qvalues[4] <= q));
    }

    #[test]
    fn test_qvalues_within_unit_interval() {
        let scores = [1.0, 2.0, 3.0, 4.0];
        let targets = [false, false, false, true];

        let qvalues = tdc(&scores, &targets, true).unwrap();
        assert!(qvalues.iter().all(|&q| (0.0..=1.0).contains(&q)));
    }

    #[test]
    fn test_tied_scores_share_one_qvalue() {
        let scores = [2.0, 2.0, 2.0, 1.0];
        let targets = [true, false, true, true];

        let qvalues = tdc(&scores, &targets, true).unwrap();
        assert_eq!(qvalues[0], qvalues[1]);
        assert_eq!(qvalues[1], qvalues[2]);
    }

    #[test]
    fn test_all_targets_after_competition() {
        // four spectra, the target won each pair, no surviving decoys:
        // the pseudocount defines the estimate, q = 1/4 everywhere
        let scores = [4.0, 3.0, 2.0, 1.0];
        let targets = [true, true, true, true];

        let qvalues = tdc(&scores, &targets, true).unwrap();
        assert!(qvalues.iter().all(|&q| q == 0.25));
    }

    #[test]
    fn test_length_mismatch() {
        let result = tdc(&[1.0, 2.0], &[true], true);
        assert!(matches!(result, Err(QvalueError::LengthMismatch(2, 1))));
    }

    #[test]
    fn test_nan_scores() {
        let result = tdc(&[1.0, f64::NAN], &[true, false], true);
        assert!(matches!(result, Err(QvalueError::NanScores(1))));
    }

    #[test]
    fn test_empty_input() {
        let result = tdc(&[], &[], true);
        assert!(matches!(result, Err(QvalueError::Empty)));
    }

    #[test]
    fn test_crosslink_separated_populations() {
        // five of each label, target-target scores strictly above decoy-decoy
        let scores = [
            14.0, 13.0, 12.0, 11.0, 10.0, // label 2
            9.0, 8.0, 7.0, 6.0, 5.0, // label 1
            4.0, 3.0, 2.0, 1.0, 0.5, // label 0
        ];
        let labels = [2u32, 2, 2, 2, 2, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0];

        let qvalues = crosslink_tdc(&scores, &labels, true).unwrap();

        let max_tt = (0..5).map(|i| qvalues[i]).fold(0.0f64, f64::max);
        let min_dd = (10..15).map(|i| qvalues[i]).fold(1.0f64, f64::min);
        assert!(max_tt < min_dd);
        assert!(qvalues.iter().all(|&q| (0.0..=1.0).contains(&q)));
    }

    #[test]
    fn test_crosslink_invalid_label() {
        let result = crosslink_tdc(&[1.0, 2.0], &[2, 3], true);
        assert!(matches!(result, Err(QvalueError::InvalidLabel(3))));
    }

    #[test]
    fn test_crosslink_monotone() {
        let scores = [5.0, 4.0, 3.0, 2.0, 1.0, 0.5];
        let labels = [2u32, 1, 2, 0, 1, 0];

        let qvalues = crosslink_tdc(&scores, &labels, true).unwrap();
        for rank in 1..scores.len() {
            assert!(qvalues[rank - 1] <= qvalues[rank]);
        }
    }
}
