// Include readme in doc
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/Readme.md"))]

/// Confidence pipelines for linear and cross-linked PSMs and the per-level result store.
pub mod confidence;
/// Column names and other constants shared across the crate.
pub mod constants;
/// Candidate tables consumed by the confidence pipelines.
pub mod dataset;
/// Error types.
pub mod errors;
/// Posterior error probability estimation from target and decoy score distributions.
pub mod pep;
/// Q-value estimation by target-decoy competition.
pub mod qvalues;
/// Best-match-per-group competition over candidate tables.
pub mod tdc;
