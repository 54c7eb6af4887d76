use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolveError {
    #[error("invalid input: {field} {reason}")]
    InvalidInput {
        field: &'static str,
        reason: &'static str,
    },
    #[error("no solution in range: {0}")]
    Unreachable(String),
}

impl SolveError {
    pub(crate) fn invalid(field: &'static str, reason: &'static str) -> Self {
        SolveError::InvalidInput { field, reason }
    }
}
