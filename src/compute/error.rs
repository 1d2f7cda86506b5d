use thiserror::Error;

/// Failures raised while a deferred job runs.
///
/// Results are memoized and shared between every consumer of a deferred
/// value, so the error has to be `Clone`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComputationError {
    #[error("Shape error: {0}")]
    Shape(String),
    #[error("Expected {expected} data, got {actual}")]
    DType { expected: &'static str, actual: &'static str },
    #[error("Operation needs input {0} but it was not provided")]
    MissingInput(usize),
    #[error("Operation needs a random state but the input carries none")]
    MissingRandomState,
    #[error("Operation needs observed data but the input carries none")]
    MissingObserved,
    #[error("Operation failed: {0}")]
    Failed(String),
    #[error("Deferred job for {0} was abandoned before producing a value")]
    Abandoned(String),
}

impl From<ndarray::ShapeError> for ComputationError {
    fn from(e: ndarray::ShapeError) -> Self {
        ComputationError::Shape(e.to_string())
    }
}
