//! Posterior error probabilities from the separation between the target and
//! decoy score distributions.
//!
//! A non-parametric model is fit to both distributions with Gaussian kernel
//! density estimation. The PEP is evaluated on an evenly spaced score grid
//! and linear interpolation between grid points keeps lookups cheap.
//!
//! Käll, 2008 [https://pubmed.ncbi.nlm.nih.gov/18052118/]
//! Ma, 2012 [https://pubmed.ncbi.nlm.nih.gov/23176103/]

// 3rd party imports
use rayon::prelude::*;

// internal imports
use crate::constants::PEP_BINS;
use crate::errors::PepError;

/// Gaussian kernel density estimate over a score sample.
struct Kde<'a> {
    sample: &'a [f64],
    bandwidth: f64,
    constant: f64,
}

impl<'a> Kde<'a> {
    /// Bandwidth by Silverman's rule of thumb. Fails if the sample has no
    /// spread, since the kernel degenerates.
    fn new(sample: &'a [f64]) -> Result<Self, PepError> {
        let factor = 4. / 3.;
        let exponent = 1. / 5.;
        let sigma = std(sample);
        let bandwidth = sigma * (factor / sample.len() as f64).powf(exponent);
        if !bandwidth.is_finite() || bandwidth <= 0.0 {
            return Err(PepError::ZeroBandwidth);
        }
        let constant = (2.0 * std::f64::consts::PI).sqrt() * bandwidth * sample.len() as f64;
        Ok(Self {
            sample,
            bandwidth,
            constant,
        })
    }

    fn pdf(&self, x: f64) -> f64 {
        let h = self.bandwidth;
        let sum = self
            .sample
            .par_iter()
            .fold(|| 0.0, |acc, xi| acc + (-0.5 * ((x - xi) / h).powi(2)).exp())
            .sum::<f64>();
        sum / self.constant
    }
}

fn std(sample: &[f64]) -> f64 {
    let n = sample.len() as f64;
    let mean = sample.iter().sum::<f64>() / n;
    let variance = sample.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

/// Binned posterior error probability estimate, pre-fit from target and decoy
/// score samples.
pub struct PepEstimator {
    bins: Vec<f64>,
    min_score: f64,
    score_step: f64,
}

impl PepEstimator {
    /// Fits the estimator to the two score samples.
    ///
    /// The PEP at a score `s` is `pi * f_decoy(s) / (pi * f_decoy(s) + (1 - pi) * f_target(s))`
    /// with `pi` the decoy prior. The binned estimate is forced to be monotone
    /// non-increasing towards better scores.
    ///
    /// # Arguments
    /// * `target_scores` - Scores of the target observations
    /// * `decoy_scores` - Scores of the decoy observations
    /// * `desc` - `true` if higher scores are better
    ///
    pub fn fit(
        target_scores: &[f64],
        decoy_scores: &[f64],
        desc: bool,
    ) -> Result<Self, PepError> {
        if target_scores.is_empty() {
            return Err(PepError::NoTargets);
        }
        if decoy_scores.is_empty() {
            return Err(PepError::NoDecoys);
        }
        if target_scores
            .iter()
            .chain(decoy_scores)
            .any(|score| score.is_nan())
        {
            return Err(PepError::NanScores);
        }

        let n_targets = target_scores.len() as f64;
        let n_decoys = decoy_scores.len() as f64;
        let pi = n_decoys / (n_targets + n_decoys);

        let target = Kde::new(target_scores)?;
        let decoy = Kde::new(decoy_scores)?;

        let mut min_score = f64::MAX;
        let mut max_score = f64::MIN;
        for &score in target_scores.iter().chain(decoy_scores) {
            min_score = min_score.min(score);
            max_score = max_score.max(score);
        }
        let score_step = (max_score - min_score) / (PEP_BINS - 1) as f64;

        let mut bins = (0..PEP_BINS)
            .map(|bin| {
                let score = (bin as f64 * score_step) + min_score;
                let decoy_density = decoy.pdf(score) * pi;
                let target_density = target.pdf(score) * (1.0 - pi);
                let pep = decoy_density / (target_density + decoy_density);
                if pep.is_finite() {
                    pep.clamp(0.0, 1.0)
                } else {
                    1.0
                }
            })
            .collect::<Vec<_>>();

        // Make the PEP monotone towards worse scores. Bins are in ascending
        // score order, so the running maximum walks away from the better end.
        if desc {
            let init = *bins.last().unwrap_or(&1.0);
            bins.iter_mut().rev().fold(init, |acc, pep| {
                *pep = acc.max(*pep);
                *pep
            });
        } else {
            let init = *bins.first().unwrap_or(&1.0);
            bins.iter_mut().fold(init, |acc, pep| {
                *pep = acc.max(*pep);
                *pep
            });
        }

        Ok(Self {
            bins,
            min_score,
            score_step,
        })
    }

    /// Calculates the posterior error probability for a given score under the
    /// pre-fit model, interpolating linearly between grid points.
    ///
    /// # Arguments
    /// * `score` - Score to evaluate
    ///
    pub fn posterior_error(&self, score: f64) -> f64 {
        let bin_lo = self
            .bins
            .len()
            .saturating_sub(1)
            .min(((score - self.min_score) / self.score_step).max(0.0).floor() as usize);
        let bin_hi = self.bins.len().saturating_sub(1).min(bin_lo + 1);

        let lower = self.bins[bin_lo];
        let upper = self.bins[bin_hi];

        let bin_lo_score = bin_lo as f64 * self.score_step + self.min_score;
        let linear = ((score - bin_lo_score) / self.score_step).clamp(0.0, 1.0);

        (lower + (upper - lower) * linear).clamp(0.0, 1.0)
    }
}

/// Fits the estimator and returns one PEP per target score, aligned with
/// `target_scores`.
///
/// # Arguments
/// * `target_scores` - Scores of the target observations
/// * `decoy_scores` - Scores of the decoy observations
/// * `desc` - `true` if higher scores are better
///
pub fn estimate(
    target_scores: &[f64],
    decoy_scores: &[f64],
    desc: bool,
) -> Result<Vec<f64>, PepError> {
    let estimator = PepEstimator::fit(target_scores, decoy_scores, desc)?;
    Ok(target_scores
        .iter()
        .map(|&score| estimator.posterior_error(score))
        .collect())
}
