use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimplexError {
    //malformed input, never reaches the tableau
    #[error("invalid problem: {0}")]
    Validation(String),

    //phase one could not drive the artificial sum to zero
    #[error("problem is infeasible (artificial sum {residual})")]
    Infeasible { residual: f64 },

    //no row limits the entering column
    #[error("problem is unbounded (column {column} can grow without limit)")]
    Unbounded { column: usize },

    #[error("iteration limit exceeded after {iterations} pivots")]
    IterationLimitExceeded { iterations: usize },
}

pub type SimplexResult<T> = Result<T, SimplexError>;
