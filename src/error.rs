use thiserror::Error;

/// Fatal pipeline errors.  These indicate a structurally broken
/// configuration or dataset and abort the whole run; per-pair conditions
/// (too few observations, degenerate fit) are reported through
/// [`crate::fit::FitStatus`] instead and never abort.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("column '{column}' not found in the table after cleaning/transformation")]
    ConfigReference { column: String },

    #[error("cleaning removed every row; check year window and thresholds")]
    EmptyDataset,

    #[error("invalid analysis parameters: {0}")]
    InvalidParams(String),
}
