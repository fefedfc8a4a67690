//! Error types for the billy core library.

#[cfg(feature = "python")]
use pyo3::exceptions::{PyKeyError, PyValueError};
#[cfg(feature = "python")]
use pyo3::PyErr;

/// Top-level error enum for the billy core library.
#[derive(Debug, thiserror::Error)]
pub enum BillyError {
    /// Malformed or out-of-domain input data.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A required parameter key is absent from the source.
    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    /// A parameter is present but outside its valid domain.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(feature = "python")]
impl From<BillyError> for PyErr {
    fn from(err: BillyError) -> PyErr {
        match &err {
            BillyError::MissingParameter(_) => PyKeyError::new_err(err.to_string()),
            BillyError::InvalidInput(_)
            | BillyError::InvalidParameter(_)
            | BillyError::Json(_) => PyValueError::new_err(err.to_string()),
        }
    }
}

pub type BillyResult<T> = Result<T, BillyError>;
