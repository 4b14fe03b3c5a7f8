// 3rd party imports
use polars::prelude::*;

// internal imports
use crate::constants::{INTERNAL_SCORE_COLUMN, INTERNAL_TARGET_COLUMN};
use crate::errors::ConfidenceError;

/// A collection of candidate PSMs with boolean target/decoy labels.
///
/// The metadata table holds one row per observed match. Row identity is not
/// unique before competition: the same spectrum or peptide may appear several
/// times, matched to different candidates.
pub struct LinearCandidates {
    metadata: DataFrame,
    targets: Vec<bool>,
    spectrum_columns: Vec<String>,
    peptide_columns: Vec<String>,
}

impl LinearCandidates {
    /// Creates a new candidate collection.
    ///
    /// # Arguments
    /// * `metadata` - Candidate table, one row per observed match
    /// * `targets` - `true` for targets, `false` for decoys, one per row
    /// * `spectrum_columns` - Columns identifying a spectrum
    /// * `peptide_columns` - Columns identifying a peptide
    ///
    pub fn new(
        metadata: DataFrame,
        targets: Vec<bool>,
        spectrum_columns: Vec<String>,
        peptide_columns: Vec<String>,
    ) -> Result<Self, ConfidenceError> {
        validate_metadata(&metadata, &spectrum_columns, &peptide_columns)?;
        if targets.len() != metadata.height() {
            return Err(ConfidenceError::LengthMismatch {
                rows: metadata.height(),
                got: targets.len(),
            });
        }
        Ok(Self {
            metadata,
            targets,
            spectrum_columns,
            peptide_columns,
        })
    }

    pub fn metadata(&self) -> &DataFrame {
        &self.metadata
    }

    pub fn targets(&self) -> &[bool] {
        &self.targets
    }

    pub fn spectrum_columns(&self) -> &[String] {
        &self.spectrum_columns
    }

    pub fn peptide_columns(&self) -> &[String] {
        &self.peptide_columns
    }
}

/// A collection of candidate cross-linked PSMs (CSMs) with ternary labels:
/// 2 for target-target, 1 for target-decoy and 0 for decoy-decoy matches.
pub struct CrossLinkedCandidates {
    metadata: DataFrame,
    targets: Vec<u32>,
    spectrum_columns: Vec<String>,
    peptide_columns: Vec<String>,
}

impl CrossLinkedCandidates {
    /// Creates a new cross-linked candidate collection.
    ///
    /// # Arguments
    /// * `metadata` - Candidate table, one row per observed match
    /// * `targets` - Number of target legs per row (0, 1 or 2)
    /// * `spectrum_columns` - Columns identifying a spectrum
    /// * `peptide_columns` - Columns identifying the peptide pair
    ///
    pub fn new(
        metadata: DataFrame,
        targets: Vec<u32>,
        spectrum_columns: Vec<String>,
        peptide_columns: Vec<String>,
    ) -> Result<Self, ConfidenceError> {
        validate_metadata(&metadata, &spectrum_columns, &peptide_columns)?;
        if targets.len() != metadata.height() {
            return Err(ConfidenceError::LengthMismatch {
                rows: metadata.height(),
                got: targets.len(),
            });
        }
        if let Some(&label) = targets.iter().find(|&&label| label > 2) {
            return Err(ConfidenceError::InvalidLabel(label));
        }
        Ok(Self {
            metadata,
            targets,
            spectrum_columns,
            peptide_columns,
        })
    }

    pub fn metadata(&self) -> &DataFrame {
        &self.metadata
    }

    pub fn targets(&self) -> &[u32] {
        &self.targets
    }

    pub fn spectrum_columns(&self) -> &[String] {
        &self.spectrum_columns
    }

    pub fn peptide_columns(&self) -> &[String] {
        &self.peptide_columns
    }
}

/// Checks that all key columns exist and that the names reserved for the
/// working score and target columns are free.
fn validate_metadata(
    metadata: &DataFrame,
    spectrum_columns: &[String],
    peptide_columns: &[String],
) -> Result<(), ConfidenceError> {
    for name in spectrum_columns.iter().chain(peptide_columns) {
        if metadata.column(name).is_err() {
            return Err(ConfidenceError::MissingColumn(name.to_string()));
        }
    }
    for reserved in [INTERNAL_SCORE_COLUMN, INTERNAL_TARGET_COLUMN] {
        if metadata.column(reserved).is_ok() {
            return Err(ConfidenceError::ColumnCollision(reserved.to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn metadata() -> DataFrame {
        df!(
            "scan" => [1i64, 2, 3],
            "peptide" => ["AAK", "CCK", "DDK"],
        )
        .unwrap()
    }

    #[test]
    fn test_valid_candidates() {
        let candidates = LinearCandidates::new(
            metadata(),
            vec![true, false, true],
            vec!["scan".to_string()],
            vec!["peptide".to_string()],
        )
        .unwrap();
        assert_eq!(candidates.metadata().height(), 3);
    }

    #[test]
    fn test_missing_key_column() {
        let result = LinearCandidates::new(
            metadata(),
            vec![true, false, true],
            vec!["spectrum".to_string()],
            vec!["peptide".to_string()],
        );
        assert!(matches!(result, Err(ConfidenceError::MissingColumn(_))));
    }

    #[test]
    fn test_label_length_mismatch() {
        let result = LinearCandidates::new(
            metadata(),
            vec![true, false],
            vec!["scan".to_string()],
            vec!["peptide".to_string()],
        );
        assert!(matches!(
            result,
            Err(ConfidenceError::LengthMismatch { rows: 3, got: 2 })
        ));
    }

    #[test]
    fn test_reserved_column_collision() {
        let metadata = df!(
            "scan" => [1i64],
            "confit_score" => [0.5],
        )
        .unwrap();
        let result = LinearCandidates::new(
            metadata,
            vec![true],
            vec!["scan".to_string()],
            vec!["scan".to_string()],
        );
        assert!(matches!(result, Err(ConfidenceError::ColumnCollision(_))));
    }

    #[test]
    fn test_crosslink_invalid_label() {
        let result = CrossLinkedCandidates::new(
            metadata(),
            vec![2, 3, 0],
            vec!["scan".to_string()],
            vec!["peptide".to_string()],
        );
        assert!(matches!(result, Err(ConfidenceError::InvalidLabel(3))));
    }
}
