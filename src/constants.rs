/// Name of the score column appended to the working table during competition
///
pub const INTERNAL_SCORE_COLUMN: &str = "confit_score";

/// Name of the target label column appended to the working table during competition
///
pub const INTERNAL_TARGET_COLUMN: &str = "confit_target";

/// Name of the score column in result tables.
/// Kept compatible with mokapot's text output so downstream tools work unchanged.
///
pub const SCORE_COLUMN: &str = "mokapot score";

/// Name of the q-value column in result tables
///
pub const QVALUE_COLUMN: &str = "mokapot q-value";

/// Name of the posterior error probability column in result tables
///
pub const PEP_COLUMN: &str = "mokapot PEP";

/// Base name for exported text files, `[{root}.]{base}.{level}.txt`
///
pub const EXPORT_FILE_BASE: &str = "confit";

/// Number of grid points used when binning the PEP estimate
///
pub const PEP_BINS: usize = 1000;
