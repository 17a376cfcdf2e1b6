// =============================================================================
// error.rs — EVERYTHING THAT CAN GO WRONG (WHICH IS NOT MUCH)
// =============================================================================
//
// Substring matching cannot fail. Documents and tables can. The two
// user-facing refusals (blank text, no `text` column) live here alongside
// the plumbing errors from csv, lopdf and the filesystem.
// =============================================================================

use thiserror::Error;

use crate::models::RiskTier;

/// Warning shown when the single-text flow receives nothing to analyze.
pub const EMPTY_INPUT_WARNING: &str = "문구를 입력해 주세요.";

/// Error shown when a batch table lacks the mandatory `text` column.
pub const MISSING_COLUMN_ERROR: &str = "⚠️ 'text' 열이 포함된 CSV 파일을 업로드해 주세요.";

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Blank or whitespace-only single-text input.
    #[error("{}", EMPTY_INPUT_WARNING)]
    EmptyInput,

    /// Batch table without a `text` header.
    #[error("{}", MISSING_COLUMN_ERROR)]
    MissingTextColumn,

    /// An empty needle matches everywhere, so keyword lists may not carry one.
    #[error("empty keyword in the {} list", tier.as_str())]
    InvalidKeyword { tier: RiskTier },

    /// A batch row carrying more fields than the header declares.
    #[error("row {line} has {found} fields but the header declares {expected}")]
    MalformedRow {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("failed to build keyword automaton: {0}")]
    Automaton(#[from] aho_corasick::BuildError),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("pdf error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnalysisError {
    /// True for the two refusals a user can fix by changing their input.
    pub fn is_rejected_input(&self) -> bool {
        matches!(self, AnalysisError::EmptyInput | AnalysisError::MissingTextColumn)
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
