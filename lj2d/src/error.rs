use thiserror::Error;

/// Errors raised by the particle engine and its file collaborators
#[derive(Debug, Error)]
pub enum MdError {
    /// Invalid construction parameters or state replacement
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A pair separation collapsed to zero (or NaN) during a pairwise pass
    #[error("numerical instability: particles {i} and {j} are separated by r = {r}")]
    NumericalInstability { i: usize, j: usize, r: f64 },

    /// `pair_potential_force` was called with a non-positive distance
    #[error("Lennard-Jones pair term is undefined at r = {0}")]
    ZeroSeparation(f64),

    /// Malformed equilibrium record
    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yml::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl MdError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        MdError::Configuration(message.into())
    }
}
