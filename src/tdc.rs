// std imports
use std::collections::hash_map::Entry;
use std::collections::HashMap;

// 3rd party imports
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::thread_rng;

// internal imports
use crate::errors::ConfidenceError;

/// Returns the index of exactly one row per distinct combination of the given
/// key columns: the row with the maximum score within its group. Ties are
/// broken uniformly at random by visiting the rows in shuffled order, so no
/// row is systematically favored when scores are equal. An empty table yields
/// an empty result.
///
/// The score column must be of dtype `Float64`. Rows with a null score never
/// win a group.
///
/// # Arguments
/// * `df` - Candidate table
/// * `by_columns` - Columns defining the groups that compete against each other
/// * `score_column` - Column to maximize within each group
///
pub fn groupby_max(
    df: &DataFrame,
    by_columns: &[String],
    score_column: &str,
) -> Result<Vec<IdxSize>, ConfidenceError> {
    if df.height() == 0 {
        return Ok(Vec::new());
    }

    let scores = df
        .column(score_column)
        .map_err(|_| ConfidenceError::MissingColumn(score_column.to_string()))?
        .f64()?;

    let keys = by_columns
        .iter()
        .map(|name| {
            df.column(name)
                .map_err(|_| ConfidenceError::MissingColumn(name.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut order: Vec<usize> = (0..df.height()).collect();
    order.shuffle(&mut thread_rng());

    let mut best: HashMap<String, (f64, IdxSize)> = HashMap::with_capacity(df.height());
    for row in order {
        let score = match scores.get(row) {
            Some(score) => score,
            None => continue,
        };
        // Key parts are length-prefixed so part boundaries can never merge,
        // whatever characters a value contains. Nulls get their own tag to
        // stay distinct from a literal "null" string.
        let mut key = String::new();
        for column in &keys {
            let value = column.get(row)?;
            if matches!(value, AnyValue::Null) {
                key.push_str("n|");
            } else {
                let part = value.to_string();
                key.push_str(&part.len().to_string());
                key.push('|');
                key.push_str(&part);
            }
        }
        match best.entry(key) {
            Entry::Occupied(mut entry) => {
                // strictly greater, so the first tied row in shuffled order wins
                if score > entry.get().0 {
                    entry.insert((score, row as IdxSize));
                }
            }
            Entry::Vacant(entry) => {
                entry.insert((score, row as IdxSize));
            }
        }
    }

    let mut indices: Vec<IdxSize> = best.into_values().map(|(_, row)| row).collect();
    indices.sort_unstable();
    Ok(indices)
}

/// Performs target-decoy competition: collapses the table to the
/// best-scoring row per distinct combination of the given key columns.
///
/// # Arguments
/// * `df` - Candidate table
/// * `by_columns` - Columns defining the groups that compete against each other
/// * `score_column` - Column to maximize within each group
///
pub fn compete(
    df: &DataFrame,
    by_columns: &[String],
    score_column: &str,
) -> Result<DataFrame, ConfidenceError> {
    let indices = groupby_max(df, by_columns, score_column)?;
    Ok(df.take(&IdxCa::from_vec("idx".into(), indices))?)
}

#[cfg(test)]
mod test {
    use super::*;

    fn candidates() -> DataFrame {
        df!(
            "scan" => [1i64, 1, 2, 2, 3],
            "peptide" => ["AAK", "CCK", "AAK", "DDK", "EEK"],
            "score" => [0.7, 0.3, 0.1, 0.9, 0.5],
        )
        .unwrap()
    }

    #[test]
    fn test_groupby_max_keeps_one_row_per_key() {
        let df = candidates();
        let collapsed = compete(&df, &["scan".to_string()], "score").unwrap();

        assert_eq!(collapsed.height(), 3);
        let scores: Vec<f64> = collapsed
            .column("score")
            .unwrap()
            .f64()
            .unwrap()
            .into_no_null_iter()
            .collect();
        // group maxima per scan
        assert_eq!(scores, vec![0.7, 0.9, 0.5]);
    }

    #[test]
    fn test_groupby_max_composite_key() {
        let df = candidates();
        let indices =
            groupby_max(&df, &["scan".to_string(), "peptide".to_string()], "score").unwrap();
        // every row is its own group
        assert_eq!(indices.len(), 5);
    }

    #[test]
    fn test_idempotence() {
        let df = candidates();
        let once = compete(&df, &["scan".to_string()], "score").unwrap();
        let twice = compete(&once, &["scan".to_string()], "score").unwrap();
        assert_eq!(once.height(), twice.height());
        assert!(once.equals(&twice));
    }

    #[test]
    fn test_empty_input() {
        let df = df!(
            "scan" => Vec::<i64>::new(),
            "score" => Vec::<f64>::new(),
        )
        .unwrap();
        let indices = groupby_max(&df, &["scan".to_string()], "score").unwrap();
        assert!(indices.is_empty());
    }

    #[test]
    fn test_missing_column() {
        let df = candidates();
        let result = groupby_max(&df, &["spectrum".to_string()], "score");
        assert!(matches!(
            result,
            Err(ConfidenceError::MissingColumn(name)) if name == "spectrum"
        ));
    }

    #[test]
    fn test_key_parts_never_merge_across_columns() {
        // without part boundaries, ("a\u{1e}", "b") and ("a", "\u{1e}b")
        // would collapse into one group
        let df = df!(
            "left" => ["a\u{1e}", "a"],
            "right" => ["b", "\u{1e}b"],
            "score" => [1.0, 2.0],
        )
        .unwrap();
        let indices =
            groupby_max(&df, &["left".to_string(), "right".to_string()], "score").unwrap();
        assert_eq!(indices.len(), 2);
    }

    #[test]
    fn test_null_key_distinct_from_null_string() {
        let df = df!(
            "peptide" => [Some("null"), None::<&str>],
            "score" => [1.0, 2.0],
        )
        .unwrap();
        let indices = groupby_max(&df, &["peptide".to_string()], "score").unwrap();
        assert_eq!(indices.len(), 2);
    }

    #[test]
    fn test_ties_are_not_systematically_broken() {
        let df = df!(
            "scan" => [1i64, 1],
            "score" => [0.5, 0.5],
        )
        .unwrap();

        let mut seen = [false, false];
        for _ in 0..200 {
            let indices = groupby_max(&df, &["scan".to_string()], "score").unwrap();
            assert_eq!(indices.len(), 1);
            seen[indices[0] as usize] = true;
        }
        // both tied rows must be picked at least once across 200 draws
        assert!(seen[0] && seen[1]);
    }
}
