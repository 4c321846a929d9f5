use thiserror::Error;

/// Failures that make an entire forecast run meaningless.
///
/// Statistic-level degeneracies (zero denominators, empty groups) never
/// surface here — those resolve to documented sentinel values and a note
/// on the [`Diagnostics`](crate::core::diag::Diagnostics) channel.
#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("Insufficient history: need at least {needed} months of observations, got {got}")]
    InsufficientHistory { needed: usize, got: usize },

    #[error("Model fit failed: {0}")]
    ModelFit(String),

    #[error("Forecast run cancelled")]
    Cancelled,

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
