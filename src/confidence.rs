// std imports
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;

// 3rd party imports
use anyhow::{Context, Result};
use polars::io::SerWriter;
use polars::prelude::*;
use serde::Serialize;
use tracing::info;

// internal imports
use crate::constants::{
    EXPORT_FILE_BASE, INTERNAL_SCORE_COLUMN, INTERNAL_TARGET_COLUMN, PEP_COLUMN, QVALUE_COLUMN,
    SCORE_COLUMN,
};
use crate::dataset::{CrossLinkedCandidates, LinearCandidates};
use crate::errors::ConfidenceError;
use crate::pep::{self, PepEstimator};
use crate::qvalues;
use crate::tdc;

/// The levels at which confidence estimates can be reported. Linear pipelines
/// populate `Psms` and `Peptides`, cross-linked pipelines `Csms` and
/// `PeptidePairs`. One source of truth for level naming across pipelines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Level {
    Psms,
    Peptides,
    Csms,
    PeptidePairs,
}

impl Level {
    /// Machine readable name, used in file names and level lookups.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Psms => "psms",
            Self::Peptides => "peptides",
            Self::Csms => "csms",
            Self::PeptidePairs => "peptide_pairs",
        }
    }

    /// Human readable label, e.g. for axis captions.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Psms => "PSMs",
            Self::Peptides => "Peptides",
            Self::Csms => "Cross-Linked PSMs",
            Self::PeptidePairs => "Peptide Pairs",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Level {
    type Err = ConfidenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "psms" => Ok(Self::Psms),
            "peptides" => Ok(Self::Peptides),
            "csms" => Ok(Self::Csms),
            "peptide_pairs" => Ok(Self::PeptidePairs),
            _ => Err(ConfidenceError::UnknownLevel(s.to_string())),
        }
    }
}

/// One point of the cumulative acceptance curve: the number of accepted
/// observations at a q-value threshold.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CurvePoint {
    pub qvalue: f64,
    pub accepted: u32,
}

/// Per-level store of confidence estimates, shared by both pipelines.
/// Built once at pipeline construction and immutable afterwards.
pub struct Confidence {
    estimates: BTreeMap<Level, DataFrame>,
}

impl Confidence {
    fn new() -> Self {
        Self {
            estimates: BTreeMap::new(),
        }
    }

    fn insert(&mut self, level: Level, table: DataFrame) {
        self.estimates.insert(level, table);
    }

    /// The levels populated by the pipeline that built this store.
    pub fn levels(&self) -> Vec<Level> {
        self.estimates.keys().copied().collect()
    }

    /// Resolves a level to its result table.
    ///
    /// # Arguments
    /// * `level` - Level to look up
    ///
    pub fn estimates(&self, level: Level) -> Result<&DataFrame, ConfidenceError> {
        self.estimates
            .get(&level)
            .ok_or_else(|| ConfidenceError::UnknownLevel(level.to_string()))
    }

    /// Saves the confidence estimates as delimited text files, one per level,
    /// named `[{root}.]confit.{level}.txt`. Returns the written paths.
    ///
    /// # Arguments
    /// * `dest_dir` - Directory to write to, current working directory if `None`
    /// * `file_root` - Optional prefix for the file names
    /// * `separator` - Field separator, e.g. `b'\t'`
    ///
    pub fn to_txt(
        &self,
        dest_dir: Option<&Path>,
        file_root: Option<&str>,
        separator: u8,
    ) -> Result<Vec<PathBuf>, ConfidenceError> {
        let dir = dest_dir.unwrap_or_else(|| Path::new("."));
        if !dir.is_dir() {
            return Err(ConfidenceError::DestinationNotFound(dir.to_path_buf()));
        }
        let file_base = match file_root {
            Some(root) => format!("{}.{}", root, EXPORT_FILE_BASE),
            None => EXPORT_FILE_BASE.to_string(),
        };

        let mut out_files = Vec::with_capacity(self.estimates.len());
        for (level, table) in &self.estimates {
            let path = dir.join(format!("{}.{}.txt", file_base, level));
            let mut file = File::create(&path)?;
            let mut table = table.clone();
            CsvWriter::new(&mut file)
                .with_separator(separator)
                .include_header(true)
                .finish(&mut table)?;
            out_files.push(path);
        }
        Ok(out_files)
    }

    /// Step-curve data of the cumulative number of accepted observations over
    /// a range of q-values, clipped to `[0, threshold]`. The first point
    /// repeats the smallest q-value with a count of zero so the curve starts
    /// on the axis.
    ///
    /// # Arguments
    /// * `level` - Level to report
    /// * `threshold` - Maximum q-value to include, in `(0, 1]`
    ///
    pub fn qvalue_curve(
        &self,
        level: Level,
        threshold: f64,
    ) -> Result<Vec<CurvePoint>, ConfidenceError> {
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(ConfidenceError::InvalidThreshold(threshold));
        }
        let table = self.estimates(level)?;

        // every stored row is an accepted observation, so the row rank at
        // ascending q-value is the cumulative count
        let curve = table
            .select([QVALUE_COLUMN])?
            .lazy()
            .sort([QVALUE_COLUMN], Default::default())
            .with_row_index("accepted", Some(1))
            .group_by([col(QVALUE_COLUMN)])
            .agg([col("accepted").max()])
            .sort([QVALUE_COLUMN], Default::default())
            .filter(col(QVALUE_COLUMN).lt_eq(lit(threshold)))
            .collect()?;

        let qvalues: Vec<f64> = curve
            .column(QVALUE_COLUMN)?
            .f64()?
            .into_no_null_iter()
            .collect();
        let accepted: Vec<u32> = curve
            .column("accepted")?
            .u32()?
            .into_no_null_iter()
            .collect();

        let mut points = Vec::with_capacity(qvalues.len() + 1);
        if let Some(&first) = qvalues.first() {
            points.push(CurvePoint {
                qvalue: first,
                accepted: 0,
            });
        }
        points.extend(
            qvalues
                .into_iter()
                .zip(accepted)
                .map(|(qvalue, accepted)| CurvePoint { qvalue, accepted }),
        );
        Ok(points)
    }
}

/// Builds the working table: metadata columns plus the appended score and
/// target label columns. The result is owned by the pipeline and never shared.
fn build_working_table(
    metadata: &DataFrame,
    scores: &[f64],
    targets: Column,
) -> Result<DataFrame, ConfidenceError> {
    if scores.len() != metadata.height() {
        return Err(ConfidenceError::LengthMismatch {
            rows: metadata.height(),
            got: scores.len(),
        });
    }
    let mut working = metadata.clone();
    working.with_column(Column::new(INTERNAL_SCORE_COLUMN.into(), scores))?;
    working.with_column(targets)?;
    Ok(working)
}

/// Merges q-values and PEPs into one result table: keeps the retained rows,
/// drops the label column, renames the score column and sorts by score.
fn finalize_level(
    mut table: DataFrame,
    qvalues: &[f64],
    peps: Vec<f64>,
    retained: &[bool],
    desc: bool,
) -> Result<DataFrame, ConfidenceError> {
    table.with_column(Column::new(QVALUE_COLUMN.into(), qvalues))?;

    let mask = BooleanChunked::from_slice("retained".into(), retained);
    let mut table = table.filter(&mask)?;
    table.with_column(Column::new(PEP_COLUMN.into(), peps))?;

    let mut table = table.drop(INTERNAL_TARGET_COLUMN)?;
    table.rename(INTERNAL_SCORE_COLUMN, SCORE_COLUMN.into())?;

    Ok(table.sort(
        [SCORE_COLUMN],
        SortMultipleOptions::default()
            .with_order_descending(desc)
            .with_maintain_order(true),
    )?)
}

/// Confidence estimates for linear PSMs: q-values and PEPs at the PSM and
/// peptide level, ranked by the provided score.
pub struct LinearConfidence {
    confidence: Confidence,
}

impl LinearConfidence {
    /// Runs the linear pipeline: competition per spectrum, collapse to
    /// peptides, then q-value and PEP assignment per level.
    ///
    /// # Arguments
    /// * `candidates` - Candidate PSMs
    /// * `scores` - Score of each candidate, aligned with the table rows
    /// * `desc` - `true` if higher scores are better
    ///
    pub fn new(candidates: &LinearCandidates, scores: &[f64], desc: bool) -> Result<Self> {
        info!("=== Assigning Confidence ===");
        let labels = Column::new(INTERNAL_TARGET_COLUMN.into(), candidates.targets());
        let working = build_working_table(candidates.metadata(), scores, labels)
            .context("Error building the working table")?;

        info!("Performing target-decoy competition...");
        info!(
            "Keeping the best match per {} columns...",
            candidates.spectrum_columns().join("+")
        );
        let psms = tdc::compete(&working, candidates.spectrum_columns(), INTERNAL_SCORE_COLUMN)
            .context("Error competing per spectrum")?;
        info!("  - Found {} PSMs from unique spectra.", psms.height());

        let peptides = tdc::compete(&psms, candidates.peptide_columns(), INTERNAL_SCORE_COLUMN)
            .context("Error competing per peptide")?;
        info!("  - Found {} unique peptides.", peptides.height());

        let mut confidence = Confidence::new();
        for (level, table) in [(Level::Psms, psms), (Level::Peptides, peptides)] {
            let scores: Vec<f64> = table
                .column(INTERNAL_SCORE_COLUMN)?
                .f64()?
                .into_no_null_iter()
                .collect();
            let targets: Vec<bool> = table
                .column(INTERNAL_TARGET_COLUMN)?
                .bool()?
                .into_no_null_iter()
                .collect();

            info!("Assigning q-values to {}.", level.label());
            let qvalues = qvalues::tdc(&scores, &targets, desc)
                .with_context(|| format!("Error assigning q-values to {}", level.label()))?;

            let target_scores: Vec<f64> = scores
                .iter()
                .zip(&targets)
                .filter(|(_, &target)| target)
                .map(|(&score, _)| score)
                .collect();
            let decoy_scores: Vec<f64> = scores
                .iter()
                .zip(&targets)
                .filter(|(_, &target)| !target)
                .map(|(&score, _)| score)
                .collect();

            info!("Assigning PEPs to {}.", level.label());
            let peps = pep::estimate(&target_scores, &decoy_scores, desc)
                .with_context(|| format!("Error assigning PEPs to {}", level.label()))?;

            let result = finalize_level(table, &qvalues, peps, &targets, desc)?;
            confidence.insert(level, result);
        }

        Ok(Self { confidence })
    }

    /// The levels populated by this pipeline.
    pub fn levels(&self) -> Vec<Level> {
        self.confidence.levels()
    }

    /// Resolves a level to its result table.
    pub fn estimates(&self, level: Level) -> Result<&DataFrame, ConfidenceError> {
        self.confidence.estimates(level)
    }

    /// See [`Confidence::to_txt`].
    pub fn to_txt(
        &self,
        dest_dir: Option<&Path>,
        file_root: Option<&str>,
        separator: u8,
    ) -> Result<Vec<PathBuf>, ConfidenceError> {
        self.confidence.to_txt(dest_dir, file_root, separator)
    }

    /// See [`Confidence::qvalue_curve`].
    pub fn qvalue_curve(
        &self,
        level: Level,
        threshold: f64,
    ) -> Result<Vec<CurvePoint>, ConfidenceError> {
        self.confidence.qvalue_curve(level, threshold)
    }
}

/// Confidence estimates for cross-linked PSMs: q-values and PEPs at the CSM
/// and peptide pair level, ranked by the provided score.
pub struct CrossLinkedConfidence {
    confidence: Confidence,
}

impl CrossLinkedConfidence {
    /// Runs the cross-linked pipeline. Competition always ranks on the score;
    /// the ternary label is carried through as a plain value. PEPs are fit on
    /// the fully-target (label 2) scores against the fully-decoy (label 0)
    /// scores and evaluated at every retained row, so mixed (label 1) rows
    /// get defined values as well.
    ///
    /// # Arguments
    /// * `candidates` - Candidate CSMs
    /// * `scores` - Score of each candidate, aligned with the table rows
    /// * `desc` - `true` if higher scores are better
    ///
    pub fn new(candidates: &CrossLinkedCandidates, scores: &[f64], desc: bool) -> Result<Self> {
        info!("=== Assigning Confidence ===");
        let labels = Column::new(INTERNAL_TARGET_COLUMN.into(), candidates.targets());
        let working = build_working_table(candidates.metadata(), scores, labels)
            .context("Error building the working table")?;

        info!("Performing target-decoy competition...");
        let csms = tdc::compete(&working, candidates.spectrum_columns(), INTERNAL_SCORE_COLUMN)
            .context("Error competing per spectrum")?;
        info!("  - Found {} CSMs from unique spectra.", csms.height());

        let pairs = tdc::compete(&csms, candidates.peptide_columns(), INTERNAL_SCORE_COLUMN)
            .context("Error competing per peptide pair")?;
        info!("  - Found {} unique peptide pairs.", pairs.height());

        let mut confidence = Confidence::new();
        for (level, table) in [(Level::Csms, csms), (Level::PeptidePairs, pairs)] {
            let scores: Vec<f64> = table
                .column(INTERNAL_SCORE_COLUMN)?
                .f64()?
                .into_no_null_iter()
                .collect();
            let labels: Vec<u32> = table
                .column(INTERNAL_TARGET_COLUMN)?
                .u32()?
                .into_no_null_iter()
                .collect();

            info!("Assigning q-values to {}.", level.label());
            let qvalues = qvalues::crosslink_tdc(&scores, &labels, desc)
                .with_context(|| format!("Error assigning q-values to {}", level.label()))?;

            let target_scores: Vec<f64> = scores
                .iter()
                .zip(&labels)
                .filter(|(_, &label)| label == 2)
                .map(|(&score, _)| score)
                .collect();
            let decoy_scores: Vec<f64> = scores
                .iter()
                .zip(&labels)
                .filter(|(_, &label)| label == 0)
                .map(|(&score, _)| score)
                .collect();

            info!("Assigning PEPs to {}.", level.label());
            let estimator = PepEstimator::fit(&target_scores, &decoy_scores, desc)
                .with_context(|| format!("Error assigning PEPs to {}", level.label()))?;

            let retained: Vec<bool> = labels.iter().map(|&label| label != 0).collect();
            let peps: Vec<f64> = scores
                .iter()
                .zip(&labels)
                .filter(|(_, &label)| label != 0)
                .map(|(&score, _)| estimator.posterior_error(score))
                .collect();

            let result = finalize_level(table, &qvalues, peps, &retained, desc)?;
            confidence.insert(level, result);
        }

        Ok(Self { confidence })
    }

    /// The levels populated by this pipeline.
    pub fn levels(&self) -> Vec<Level> {
        self.confidence.levels()
    }

    /// Resolves a level to its result table.
    pub fn estimates(&self, level: Level) -> Result<&DataFrame, ConfidenceError> {
        self.confidence.estimates(level)
    }

    /// See [`Confidence::to_txt`].
    pub fn to_txt(
        &self,
        dest_dir: Option<&Path>,
        file_root: Option<&str>,
        separator: u8,
    ) -> Result<Vec<PathBuf>, ConfidenceError> {
        self.confidence.to_txt(dest_dir, file_root, separator)
    }

    /// See [`Confidence::qvalue_curve`].
    pub fn qvalue_curve(
        &self,
        level: Level,
        threshold: f64,
    ) -> Result<Vec<CurvePoint>, ConfidenceError> {
        self.confidence.qvalue_curve(level, threshold)
    }
}
